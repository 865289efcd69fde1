//! Layouts the engine ships with: character selection and login.

use super::schema::{Direction, Field, Primitive, Schema, SchemaSet, Width};
use crate::packets::opcodes;

pub const CHAR_ENUM_ITEM: &str = "CharEnumItem";
pub const CHAR_ENUM_BAG: &str = "CharEnumBag";
pub const CHAR_ENUM_ENTRY: &str = "CharEnumEntry";
pub const SMSG_CHAR_ENUM: &str = "SmsgCharEnum";
pub const CMSG_CHAR_ENUM: &str = "CmsgCharEnum";
pub const CMSG_PLAYER_LOGIN: &str = "CmsgPlayerLogin";
pub const CMSG_SET_ACTIVE_MOVER: &str = "CmsgSetActiveMover";

pub const EQUIPMENT_SLOTS: usize = 19;
pub const BAG_SLOTS: usize = 4;

fn equipment(name: &str) -> Schema {
    Schema::chunk(name)
        .field(Field::primitive("display_id", Primitive::U32))
        .field(Field::primitive("inventory_type", Primitive::U8))
        .field(Field::primitive("enchant", Primitive::U32))
}

fn char_enum_entry() -> Schema {
    Schema::chunk(CHAR_ENUM_ENTRY)
        .field(Field::primitive("guid", Primitive::U64))
        .field(Field::cstring("name"))
        .field(Field::primitive("race", Primitive::U8))
        .field(Field::primitive("class", Primitive::U8))
        .field(Field::primitive("gender", Primitive::U8))
        // skin, face, hair style, hair color, facial hair
        .field(Field::primitive("appearance", Primitive::U8).array(5))
        .field(Field::primitive("level", Primitive::U8))
        .field(Field::primitive("zone", Primitive::U32))
        .field(Field::primitive("map", Primitive::U32))
        .field(Field::primitive("x", Primitive::F32))
        .field(Field::primitive("y", Primitive::F32))
        .field(Field::primitive("z", Primitive::F32))
        .field(Field::primitive("guild", Primitive::U32))
        .field(Field::primitive("flags", Primitive::U32))
        .field(Field::primitive("customize", Primitive::U32))
        .field(Field::primitive("first_login", Primitive::U8))
        .field(Field::primitive("pet_display", Primitive::U32))
        .field(Field::primitive("pet_level", Primitive::U32))
        .field(Field::primitive("pet_family", Primitive::U32))
        .field(Field::nested("items", CHAR_ENUM_ITEM).array(EQUIPMENT_SLOTS))
        .field(Field::nested("bags", CHAR_ENUM_BAG).array(BAG_SLOTS))
}

/// Every built-in schema, ready for [`SchemaSet::decode_packet`].
pub fn builtin() -> SchemaSet {
    let mut set = SchemaSet::new();
    set.insert(equipment(CHAR_ENUM_ITEM))
        .insert(equipment(CHAR_ENUM_BAG))
        .insert(char_enum_entry())
        .insert(
            Schema::packet(SMSG_CHAR_ENUM, opcodes::SMSG_CHAR_ENUM, Direction::Inbound)
                .field(Field::nested("characters", CHAR_ENUM_ENTRY).vector(Width::U8)),
        )
        .insert(Schema::packet(
            CMSG_CHAR_ENUM,
            opcodes::CMSG_CHAR_ENUM,
            Direction::Outbound,
        ))
        .insert(
            Schema::packet(
                CMSG_PLAYER_LOGIN,
                opcodes::CMSG_PLAYER_LOGIN,
                Direction::Outbound,
            )
            .field(Field::primitive("guid", Primitive::U64)),
        )
        .insert(
            Schema::packet(
                CMSG_SET_ACTIVE_MOVER,
                opcodes::CMSG_SET_ACTIVE_MOVER,
                Direction::Outbound,
            )
            .field(Field::primitive("guid", Primitive::U64)),
        );
    set
}
