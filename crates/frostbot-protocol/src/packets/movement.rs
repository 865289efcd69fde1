use bitflags::bitflags;

use super::WorldPacket;
use crate::buffer::{PacketReader, PacketWrite};
use crate::error::DecodeError;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MovementFlags: u32 {
        const FORWARD = 0x0000_0001;
        const BACKWARD = 0x0000_0002;
        const STRAFE_LEFT = 0x0000_0004;
        const STRAFE_RIGHT = 0x0000_0008;
        const LEFT = 0x0000_0010;
        const RIGHT = 0x0000_0020;
        const PITCH_UP = 0x0000_0040;
        const PITCH_DOWN = 0x0000_0080;
        const WALKING = 0x0000_0100;
        const ON_TRANSPORT = 0x0000_0200;
        const DISABLE_GRAVITY = 0x0000_0400;
        const ROOT = 0x0000_0800;
        const FALLING = 0x0000_1000;
        const FALLING_FAR = 0x0000_2000;
        const PENDING_STOP = 0x0000_4000;
        const PENDING_STRAFE_STOP = 0x0000_8000;
        const PENDING_FORWARD = 0x0001_0000;
        const PENDING_BACKWARD = 0x0002_0000;
        const PENDING_STRAFE_LEFT = 0x0004_0000;
        const PENDING_STRAFE_RIGHT = 0x0008_0000;
        const PENDING_ROOT = 0x0010_0000;
        const SWIMMING = 0x0020_0000;
        const ASCENDING = 0x0040_0000;
        const DESCENDING = 0x0080_0000;
        const CAN_FLY = 0x0100_0000;
        const FLYING = 0x0200_0000;
        const SPLINE_ELEVATION = 0x0400_0000;
        const SPLINE_ENABLED = 0x0800_0000;
        const WATERWALKING = 0x1000_0000;
        const FALLING_SLOW = 0x2000_0000;
        const HOVER = 0x4000_0000;

        const MASK_MOVING = Self::FORWARD.bits()
            | Self::BACKWARD.bits()
            | Self::STRAFE_LEFT.bits()
            | Self::STRAFE_RIGHT.bits()
            | Self::FALLING.bits()
            | Self::FALLING_FAR.bits()
            | Self::ASCENDING.bits()
            | Self::DESCENDING.bits()
            | Self::SPLINE_ELEVATION.bits();
        const MASK_TURNING = Self::LEFT.bits()
            | Self::RIGHT.bits()
            | Self::PITCH_UP.bits()
            | Self::PITCH_DOWN.bits();
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MovementFlags2: u16 {
        const NO_STRAFE = 0x0001;
        const NO_JUMPING = 0x0002;
        const UNK3 = 0x0004;
        const FULL_SPEED_TURNING = 0x0008;
        const FULL_SPEED_PITCHING = 0x0010;
        const ALWAYS_ALLOW_PITCHING = 0x0020;
        const UNK7 = 0x0040;
        const UNK8 = 0x0080;
        const UNK9 = 0x0100;
        const UNK10 = 0x0200;
        const INTERPOLATED_MOVEMENT = 0x0400;
        const INTERPOLATED_TURNING = 0x0800;
        const INTERPOLATED_PITCHING = 0x1000;
        const UNK14 = 0x2000;
        const CAN_TRANSITION_BETWEEN_SWIM_AND_FLY = 0x4000;
        const UNK16 = 0x8000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub orientation: f32,
}

impl Position {
    fn read(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            x: reader.read_f32()?,
            y: reader.read_f32()?,
            z: reader.read_f32()?,
            orientation: reader.read_f32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.write_f32(self.x)
            .write_f32(self.y)
            .write_f32(self.z)
            .write_f32(self.orientation);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransportInfo {
    pub guid: u64,
    pub offset: Position,
    pub time: u32,
    pub seat: i8,
    /// Present when [`MovementFlags2::INTERPOLATED_MOVEMENT`] is set.
    pub time2: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JumpInfo {
    pub z_speed: f32,
    pub sin_angle: f32,
    pub cos_angle: f32,
    pub xy_speed: f32,
}

/// The movement block shared by every `MSG_MOVE_*` packet and by living
/// objects in update packets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MovementInfo {
    pub flags: MovementFlags,
    pub flags2: MovementFlags2,
    pub time: u32,
    pub position: Position,
    pub transport: Option<TransportInfo>,
    pub pitch: Option<f32>,
    pub fall_time: u32,
    pub jump: Option<JumpInfo>,
    pub spline_elevation: Option<f32>,
}

impl MovementInfo {
    fn has_pitch(flags: MovementFlags, flags2: MovementFlags2) -> bool {
        flags.intersects(MovementFlags::SWIMMING | MovementFlags::FLYING)
            || flags2.contains(MovementFlags2::ALWAYS_ALLOW_PITCHING)
    }

    pub fn read(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        let flags = MovementFlags::from_bits_retain(reader.read_u32()?);
        let flags2 = MovementFlags2::from_bits_retain(reader.read_u16()?);
        let time = reader.read_u32()?;
        let position = Position::read(reader)?;

        let transport = if flags.contains(MovementFlags::ON_TRANSPORT) {
            Some(TransportInfo {
                guid: reader.read_packed_guid()?,
                offset: Position::read(reader)?,
                time: reader.read_u32()?,
                seat: reader.read_i8()?,
                time2: if flags2.contains(MovementFlags2::INTERPOLATED_MOVEMENT) {
                    Some(reader.read_u32()?)
                } else {
                    None
                },
            })
        } else {
            None
        };

        let pitch = if Self::has_pitch(flags, flags2) {
            Some(reader.read_f32()?)
        } else {
            None
        };

        let fall_time = reader.read_u32()?;

        let jump = if flags.contains(MovementFlags::FALLING) {
            Some(JumpInfo {
                z_speed: reader.read_f32()?,
                sin_angle: reader.read_f32()?,
                cos_angle: reader.read_f32()?,
                xy_speed: reader.read_f32()?,
            })
        } else {
            None
        };

        let spline_elevation = if flags.contains(MovementFlags::SPLINE_ELEVATION) {
            Some(reader.read_f32()?)
        } else {
            None
        };

        Ok(Self {
            flags,
            flags2,
            time,
            position,
            transport,
            pitch,
            fall_time,
            jump,
            spline_elevation,
        })
    }

    /// Writes the block. Optional parts follow the flags: a flag without its
    /// data writes zeros, data without its flag is left out.
    pub fn write(&self, out: &mut Vec<u8>) {
        out.write_u32(self.flags.bits())
            .write_u16(self.flags2.bits())
            .write_u32(self.time);
        self.position.write(out);

        if self.flags.contains(MovementFlags::ON_TRANSPORT) {
            let transport = self.transport.unwrap_or_default();
            out.write_packed_guid(transport.guid);
            transport.offset.write(out);
            out.write_u32(transport.time).write_i8(transport.seat);
            if self.flags2.contains(MovementFlags2::INTERPOLATED_MOVEMENT) {
                out.write_u32(transport.time2.unwrap_or_default());
            }
        }

        if Self::has_pitch(self.flags, self.flags2) {
            out.write_f32(self.pitch.unwrap_or_default());
        }

        out.write_u32(self.fall_time);

        if self.flags.contains(MovementFlags::FALLING) {
            let jump = self.jump.unwrap_or_default();
            out.write_f32(jump.z_speed)
                .write_f32(jump.sin_angle)
                .write_f32(jump.cos_angle)
                .write_f32(jump.xy_speed);
        }

        if self.flags.contains(MovementFlags::SPLINE_ELEVATION) {
            out.write_f32(self.spline_elevation.unwrap_or_default());
        }
    }
}

/// A `MSG_MOVE_*` packet: the mover's packed guid followed by its movement.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementPacket {
    pub opcode: u32,
    pub guid: u64,
    pub info: MovementInfo,
}

impl MovementPacket {
    pub fn read(packet: &WorldPacket) -> Result<Self, DecodeError> {
        let mut reader = packet.reader();
        Ok(Self {
            opcode: packet.opcode(),
            guid: reader.read_packed_guid()?,
            info: MovementInfo::read(&mut reader)?,
        })
    }

    pub fn to_packet(&self) -> WorldPacket {
        let mut packet = WorldPacket::new(self.opcode);
        packet.payload_mut().write_packed_guid(self.guid);
        self.info.write(packet.payload_mut());
        packet
    }
}
