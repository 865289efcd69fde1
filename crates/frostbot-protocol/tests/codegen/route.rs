// @generated by frostbot-protocol. Do not edit.

#[allow(unused_imports)]
use frostbot_protocol::codec;
#[allow(unused_imports)]
use frostbot_protocol::{CodecError, DecodeError, PacketReader, PacketWrite};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn read(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            x: reader.read_f32()?,
            y: reader.read_f32()?,
        })
    }

    pub fn write(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        out.write_f32(self.x);
        out.write_f32(self.y);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Route {
    pub id: u32,
    pub name: String,
    pub tag: String,
    pub motd: String,
    pub points: Vec<Point>,
    pub flags: Vec<u8>,
}

impl Route {
    pub const OPCODE: u32 = 0x0100;

    pub fn read(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            id: reader.read_u32()?,
            name: reader.read_cstring()?,
            tag: reader.read_fixed_string(4)?,
            motd: { let len = reader.read_u16()? as usize; String::from_utf8_lossy(reader.read_bytes(len)?).into_owned() },
            points: {
                let mut items = Vec::with_capacity(0);
                for _ in 0..reader.read_u8()? {
                    items.push(Point::read(reader)?);
                }
                items
            },
            flags: {
                let mut items = Vec::with_capacity(3);
                for _ in 0..3 {
                    items.push(reader.read_u8()?);
                }
                items
            },
        })
    }

    pub fn write(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        out.write_u32(self.id);
        out.write_cstring(&self.name);
        codec::fit_fixed("tag", self.tag.len(), 4)?; out.write_fixed_string(&self.tag, 4);
        out.write_u16(codec::size_prefix("motd", self.motd.len())?).write_bytes(self.motd.as_bytes());
        out.write_u8(codec::size_prefix("points", self.points.len())?);
        for item in &self.points { item.write(out)?; }
        codec::expect_len("flags", 3, self.flags.len())?;
        for item in &self.flags { out.write_u8(*item); }
        Ok(())
    }
}

