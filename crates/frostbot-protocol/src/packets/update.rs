//! `SMSG_UPDATE_OBJECT` and its zlib compressed twin.

use std::collections::BTreeMap;
use std::io::Read;

use bitflags::bitflags;
use flate2::read::ZlibDecoder;
use strum_macros::{Display, FromRepr};

use super::movement::{MovementFlags, MovementInfo, Position};
use super::opcodes::{SMSG_COMPRESSED_UPDATE_OBJECT, SMSG_UPDATE_OBJECT};
use super::WorldPacket;
use crate::buffer::PacketReader;
use crate::error::DecodeError;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ObjectUpdateFlags: u16 {
        const SELF = 0x0001;
        const TRANSPORT = 0x0002;
        const HAS_TARGET = 0x0004;
        const UNKNOWN = 0x0008;
        const LOWGUID = 0x0010;
        const LIVING = 0x0020;
        const STATIONARY_POSITION = 0x0040;
        const VEHICLE = 0x0080;
        const POSITION = 0x0100;
        const ROTATION = 0x0200;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SplineFlags: u32 {
        const DONE = 0x0000_0100;
        const FALLING = 0x0000_0200;
        const NO_SPLINE = 0x0000_0400;
        const PARABOLIC = 0x0000_0800;
        const WALKMODE = 0x0000_1000;
        const FLYING = 0x0000_2000;
        const ORIENTATION_FIXED = 0x0000_4000;
        const FINAL_POINT = 0x0000_8000;
        const FINAL_TARGET = 0x0001_0000;
        const FINAL_ANGLE = 0x0002_0000;
        const CATMULLROM = 0x0004_0000;
        const CYCLIC = 0x0008_0000;
        const ENTER_CYCLE = 0x0010_0000;
        const ANIMATION = 0x0020_0000;
        const FROZEN = 0x0040_0000;
        const TRANSPORT_ENTER = 0x0080_0000;
        const TRANSPORT_EXIT = 0x0100_0000;
        const ORIENTATION_INVERSED = 0x0800_0000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum UpdateType {
    Values = 0,
    Movement = 1,
    CreateObject = 2,
    CreateObject2 = 3,
    OutOfRangeObjects = 4,
    NearObjects = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum TypeId {
    Object = 0,
    Item = 1,
    Container = 2,
    Unit = 3,
    Player = 4,
    GameObject = 5,
    DynamicObject = 6,
    Corpse = 7,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    fn read(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            x: reader.read_f32()?,
            y: reader.read_f32()?,
            z: reader.read_f32()?,
        })
    }
}

/// Movement speeds sent with every living object, in `UnitMoveType` order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Speeds {
    pub walk: f32,
    pub run: f32,
    pub run_back: f32,
    pub swim: f32,
    pub swim_back: f32,
    pub flight: f32,
    pub flight_back: f32,
    pub turn_rate: f32,
    pub pitch_rate: f32,
}

impl Speeds {
    fn read(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            walk: reader.read_f32()?,
            run: reader.read_f32()?,
            run_back: reader.read_f32()?,
            swim: reader.read_f32()?,
            swim_back: reader.read_f32()?,
            flight: reader.read_f32()?,
            flight_back: reader.read_f32()?,
            turn_rate: reader.read_f32()?,
            pitch_rate: reader.read_f32()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplineFacing {
    None,
    Angle(f32),
    Target(u64),
    Point(Vector3),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplineInfo {
    pub flags: SplineFlags,
    pub facing: SplineFacing,
    pub time_passed: i32,
    pub duration: i32,
    pub id: u32,
    pub vertical_acceleration: f32,
    pub effect_start_time: i32,
    pub points: Vec<Vector3>,
    pub evaluation_mode: u8,
    pub endpoint: Vector3,
}

impl SplineInfo {
    fn read(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        let flags = SplineFlags::from_bits_retain(reader.read_u32()?);
        let facing = if flags.contains(SplineFlags::FINAL_ANGLE) {
            SplineFacing::Angle(reader.read_f32()?)
        } else if flags.contains(SplineFlags::FINAL_TARGET) {
            SplineFacing::Target(reader.read_u64()?)
        } else if flags.contains(SplineFlags::FINAL_POINT) {
            SplineFacing::Point(Vector3::read(reader)?)
        } else {
            SplineFacing::None
        };

        let time_passed = reader.read_i32()?;
        let duration = reader.read_i32()?;
        let id = reader.read_u32()?;
        // duration modifiers
        reader.skip(8)?;
        let vertical_acceleration = reader.read_f32()?;
        let effect_start_time = reader.read_i32()?;

        let count = reader.read_u32()?;
        let mut points = Vec::new();
        for _ in 0..count {
            points.push(Vector3::read(reader)?);
        }

        Ok(Self {
            flags,
            facing,
            time_passed,
            duration,
            id,
            vertical_acceleration,
            effect_start_time,
            points,
            evaluation_mode: reader.read_u8()?,
            endpoint: Vector3::read(reader)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LivingInfo {
    pub movement: MovementInfo,
    pub speeds: Speeds,
    pub spline: Option<SplineInfo>,
}

/// The positional part of a movement block; which variant is present
/// depends on the update flags.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectPosition {
    Living(Box<LivingInfo>),
    Transported {
        transport_guid: u64,
        position: Vector3,
        transport_offset: Vector3,
        orientation: f32,
        corpse_orientation: f32,
    },
    Stationary(Position),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleInfo {
    pub id: u32,
    pub orientation: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovementUpdate {
    pub flags: ObjectUpdateFlags,
    pub position: ObjectPosition,
    pub low_guid: Option<u32>,
    pub target_guid: Option<u64>,
    pub transport_timer: Option<u32>,
    pub vehicle: Option<VehicleInfo>,
    pub rotation: Option<i64>,
}

impl MovementUpdate {
    fn read(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        let flags = ObjectUpdateFlags::from_bits_retain(reader.read_u16()?);

        let position = if flags.contains(ObjectUpdateFlags::LIVING) {
            let movement = MovementInfo::read(reader)?;
            let speeds = Speeds::read(reader)?;
            let spline = if movement.flags.contains(MovementFlags::SPLINE_ENABLED) {
                Some(SplineInfo::read(reader)?)
            } else {
                None
            };
            ObjectPosition::Living(Box::new(LivingInfo {
                movement,
                speeds,
                spline,
            }))
        } else if flags.contains(ObjectUpdateFlags::POSITION) {
            ObjectPosition::Transported {
                transport_guid: reader.read_packed_guid()?,
                position: Vector3::read(reader)?,
                transport_offset: Vector3::read(reader)?,
                orientation: reader.read_f32()?,
                corpse_orientation: reader.read_f32()?,
            }
        } else if flags.contains(ObjectUpdateFlags::STATIONARY_POSITION) {
            ObjectPosition::Stationary(Position {
                x: reader.read_f32()?,
                y: reader.read_f32()?,
                z: reader.read_f32()?,
                orientation: reader.read_f32()?,
            })
        } else {
            ObjectPosition::None
        };

        if flags.contains(ObjectUpdateFlags::UNKNOWN) {
            reader.skip(4)?;
        }
        let low_guid = flags
            .contains(ObjectUpdateFlags::LOWGUID)
            .then(|| reader.read_u32())
            .transpose()?;
        let target_guid = flags
            .contains(ObjectUpdateFlags::HAS_TARGET)
            .then(|| reader.read_packed_guid())
            .transpose()?;
        let transport_timer = flags
            .contains(ObjectUpdateFlags::TRANSPORT)
            .then(|| reader.read_u32())
            .transpose()?;
        let vehicle = if flags.contains(ObjectUpdateFlags::VEHICLE) {
            Some(VehicleInfo {
                id: reader.read_u32()?,
                orientation: reader.read_f32()?,
            })
        } else {
            None
        };
        let rotation = flags
            .contains(ObjectUpdateFlags::ROTATION)
            .then(|| reader.read_i64())
            .transpose()?;

        Ok(Self {
            flags,
            position,
            low_guid,
            target_guid,
            transport_timer,
            vehicle,
            rotation,
        })
    }
}

/// Reads an update mask and the values it selects. Keys are field indices
/// (`block * 32 + bit`).
fn read_values(reader: &mut PacketReader<'_>) -> Result<BTreeMap<u32, u32>, DecodeError> {
    let block_count = reader.read_u8()?;
    let mut masks = Vec::with_capacity(usize::from(block_count));
    for _ in 0..block_count {
        masks.push(reader.read_u32()?);
    }

    let mut fields = BTreeMap::new();
    for (block, mask) in masks.into_iter().enumerate() {
        for bit in 0..32 {
            if mask & (1 << bit) != 0 {
                fields.insert(block as u32 * 32 + bit, reader.read_u32()?);
            }
        }
    }
    Ok(fields)
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateBlock {
    Values {
        guid: u64,
        fields: BTreeMap<u32, u32>,
    },
    Movement {
        guid: u64,
        movement: MovementUpdate,
    },
    Create {
        /// `CREATE_OBJECT2`, sent for objects that have just spawned.
        spawned: bool,
        guid: u64,
        object_type: TypeId,
        movement: MovementUpdate,
        fields: BTreeMap<u32, u32>,
    },
    OutOfRange {
        guids: Vec<u64>,
    },
    NearObjects,
}

impl UpdateBlock {
    pub fn read(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        let raw = reader.read_u8()?;
        let update_type = UpdateType::from_repr(raw).ok_or(DecodeError::InvalidValue {
            what: "update type",
            value: u64::from(raw),
        })?;

        Ok(match update_type {
            UpdateType::Values => Self::Values {
                guid: reader.read_packed_guid()?,
                fields: read_values(reader)?,
            },
            UpdateType::Movement => Self::Movement {
                guid: reader.read_packed_guid()?,
                movement: MovementUpdate::read(reader)?,
            },
            UpdateType::CreateObject | UpdateType::CreateObject2 => {
                let guid = reader.read_packed_guid()?;
                let raw = reader.read_u8()?;
                let object_type = TypeId::from_repr(raw).ok_or(DecodeError::InvalidValue {
                    what: "object type",
                    value: u64::from(raw),
                })?;
                Self::Create {
                    spawned: update_type == UpdateType::CreateObject2,
                    guid,
                    object_type,
                    movement: MovementUpdate::read(reader)?,
                    fields: read_values(reader)?,
                }
            }
            UpdateType::OutOfRangeObjects => {
                let count = reader.read_u32()?;
                let mut guids = Vec::new();
                for _ in 0..count {
                    guids.push(reader.read_packed_guid()?);
                }
                Self::OutOfRange { guids }
            }
            UpdateType::NearObjects => Self::NearObjects,
        })
    }

    pub fn guid(&self) -> Option<u64> {
        match self {
            Self::Values { guid, .. } | Self::Movement { guid, .. } | Self::Create { guid, .. } => {
                Some(*guid)
            }
            Self::OutOfRange { .. } | Self::NearObjects => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateData {
    pub blocks: Vec<UpdateBlock>,
}

impl UpdateData {
    pub fn read(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        let count = reader.read_u32()?;
        let mut blocks = Vec::new();
        for _ in 0..count {
            blocks.push(UpdateBlock::read(reader)?);
        }
        Ok(Self { blocks })
    }

    /// Decodes either update opcode, inflating the compressed form first.
    pub fn from_packet(packet: &WorldPacket) -> Result<Self, DecodeError> {
        match packet.opcode() {
            SMSG_UPDATE_OBJECT => Self::read(&mut packet.reader()),
            SMSG_COMPRESSED_UPDATE_OBJECT => {
                let inflated = inflate(packet.payload())?;
                Self::read(&mut PacketReader::new(&inflated))
            }
            other => Err(DecodeError::InvalidValue {
                what: "update opcode",
                value: u64::from(other),
            }),
        }
    }
}

/// Inflates a `u32 size` + zlib body. The declared size must match exactly.
pub fn inflate(payload: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut reader = PacketReader::new(payload);
    let size = reader.read_u32()? as usize;

    let mut decoder = ZlibDecoder::new(reader.rest()).take(size as u64 + 1);
    let mut inflated = Vec::new();
    decoder
        .read_to_end(&mut inflated)
        .map_err(|e| DecodeError::Decompress(e.to_string()))?;

    if inflated.len() != size {
        return Err(DecodeError::Decompress(format!(
            "declared {} bytes but inflated {}",
            size,
            inflated.len()
        )));
    }
    Ok(inflated)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    use super::*;
    use crate::buffer::PacketWrite;

    fn values_block(guid: u64) -> Vec<u8> {
        let mut out = Vec::new();
        out.write_u8(UpdateType::Values as u8)
            .write_packed_guid(guid)
            .write_u8(2)
            .write_u32(0b101)
            .write_u32(1 << 3)
            .write_u32(10)
            .write_u32(20)
            .write_u32(30);
        out
    }

    fn compress(body: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(body).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut payload = Vec::new();
        payload.write_u32(body.len() as u32).write_bytes(&compressed);
        payload
    }

    #[test]
    fn test_values_use_block_and_bit_index() {
        let mut body = Vec::new();
        body.write_u32(1).write_bytes(&values_block(0x42));

        let data = UpdateData::read(&mut PacketReader::new(&body)).unwrap();
        let UpdateBlock::Values { guid, fields } = &data.blocks[0] else {
            panic!("expected a values block");
        };
        assert_eq!(*guid, 0x42);
        assert_eq!(fields.get(&0), Some(&10));
        assert_eq!(fields.get(&2), Some(&20));
        assert_eq!(fields.get(&35), Some(&30));
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn test_create_living_object_with_spline() {
        let mut body = Vec::new();
        body.write_u32(1)
            .write_u8(UpdateType::CreateObject2 as u8)
            .write_packed_guid(0x0700)
            .write_u8(TypeId::Unit as u8)
            .write_u16((ObjectUpdateFlags::LIVING | ObjectUpdateFlags::LOWGUID).bits());

        let movement = MovementInfo {
            flags: MovementFlags::SPLINE_ENABLED | MovementFlags::FORWARD,
            time: 10,
            ..Default::default()
        };
        movement.write(&mut body);
        for speed in 1..=9 {
            body.write_f32(speed as f32);
        }
        body.write_u32(SplineFlags::FINAL_TARGET.bits())
            .write_u64(0xBEEF)
            .write_i32(100)
            .write_i32(2000)
            .write_u32(77)
            .write_f32(1.0)
            .write_f32(1.0)
            .write_f32(0.5)
            .write_i32(0)
            .write_u32(2)
            .write_f32(1.0)
            .write_f32(2.0)
            .write_f32(3.0)
            .write_f32(4.0)
            .write_f32(5.0)
            .write_f32(6.0)
            .write_u8(1)
            .write_f32(7.0)
            .write_f32(8.0)
            .write_f32(9.0);
        body.write_u32(0x1234);
        // no value masks
        body.write_u8(0);

        let data = UpdateData::read(&mut PacketReader::new(&body)).unwrap();
        let UpdateBlock::Create {
            spawned,
            guid,
            object_type,
            movement,
            fields,
        } = &data.blocks[0]
        else {
            panic!("expected a create block");
        };
        assert!(*spawned);
        assert_eq!(*guid, 0x0700);
        assert_eq!(*object_type, TypeId::Unit);
        assert_eq!(movement.low_guid, Some(0x1234));
        assert!(fields.is_empty());

        let ObjectPosition::Living(living) = &movement.position else {
            panic!("expected a living object");
        };
        assert_eq!(living.speeds.run, 2.0);
        assert_eq!(living.speeds.pitch_rate, 9.0);
        let spline = living.spline.as_ref().unwrap();
        assert_eq!(spline.facing, SplineFacing::Target(0xBEEF));
        assert_eq!(spline.id, 77);
        assert_eq!(spline.points.len(), 2);
        assert_eq!(spline.endpoint, Vector3 { x: 7.0, y: 8.0, z: 9.0 });
    }

    #[test]
    fn test_stationary_object_with_trailers() {
        let mut body = Vec::new();
        body.write_u32(2)
            .write_u8(UpdateType::Movement as u8)
            .write_packed_guid(9)
            .write_u16(
                (ObjectUpdateFlags::STATIONARY_POSITION
                    | ObjectUpdateFlags::HAS_TARGET
                    | ObjectUpdateFlags::VEHICLE
                    | ObjectUpdateFlags::ROTATION)
                    .bits(),
            )
            .write_f32(1.0)
            .write_f32(2.0)
            .write_f32(3.0)
            .write_f32(4.0)
            .write_packed_guid(0x11)
            .write_u32(5)
            .write_f32(0.5)
            .write_i64(-2)
            .write_u8(UpdateType::NearObjects as u8);

        let data = UpdateData::read(&mut PacketReader::new(&body)).unwrap();
        assert_eq!(data.blocks.len(), 2);
        let UpdateBlock::Movement { guid, movement } = &data.blocks[0] else {
            panic!("expected a movement block");
        };
        assert_eq!(*guid, 9);
        assert_eq!(
            movement.position,
            ObjectPosition::Stationary(Position {
                x: 1.0,
                y: 2.0,
                z: 3.0,
                orientation: 4.0
            })
        );
        assert_eq!(movement.target_guid, Some(0x11));
        assert_eq!(
            movement.vehicle,
            Some(VehicleInfo {
                id: 5,
                orientation: 0.5
            })
        );
        assert_eq!(movement.rotation, Some(-2));
        assert_eq!(data.blocks[1], UpdateBlock::NearObjects);
    }

    #[test]
    fn test_out_of_range_guids_are_packed() {
        let mut body = Vec::new();
        body.write_u32(1)
            .write_u8(UpdateType::OutOfRangeObjects as u8)
            .write_u32(2)
            .write_packed_guid(0x10)
            .write_packed_guid(0xF130_0000_0000_0001);
        let data = UpdateData::read(&mut PacketReader::new(&body)).unwrap();
        assert_eq!(
            data.blocks[0],
            UpdateBlock::OutOfRange {
                guids: vec![0x10, 0xF130_0000_0000_0001]
            }
        );
        assert_eq!(data.blocks[0].guid(), None);
    }

    #[test]
    fn test_compressed_update() {
        let mut body = Vec::new();
        body.write_u32(1).write_bytes(&values_block(3));

        let plain = WorldPacket::with_payload(SMSG_UPDATE_OBJECT, body.clone());
        let compressed = WorldPacket::with_payload(SMSG_COMPRESSED_UPDATE_OBJECT, compress(&body));
        assert_eq!(
            UpdateData::from_packet(&plain).unwrap(),
            UpdateData::from_packet(&compressed).unwrap()
        );
    }

    #[test]
    fn test_inflate_rejects_size_mismatch_and_garbage() {
        let mut payload = compress(b"hello");
        payload[0] = 4;
        assert!(matches!(inflate(&payload), Err(DecodeError::Decompress(_))));

        let garbage = [5, 0, 0, 0, 1, 2, 3, 4];
        assert!(matches!(inflate(&garbage), Err(DecodeError::Decompress(_))));
    }

    #[test]
    fn test_unknown_update_type() {
        let body = [1, 0, 0, 0, 9];
        assert_eq!(
            UpdateData::read(&mut PacketReader::new(&body)),
            Err(DecodeError::InvalidValue {
                what: "update type",
                value: 9
            })
        );
    }
}
