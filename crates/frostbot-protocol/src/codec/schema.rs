use std::collections::BTreeMap;

use strum_macros::Display;

use crate::error::CodecError;

/// Fixed width numeric types. All are little-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Primitive {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl Primitive {
    pub fn size(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }
}

/// Width of the count written in front of a vector or sized string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Width {
    U8,
    U16,
    U32,
}

impl Width {
    pub fn max(self) -> usize {
        match self {
            Self::U8 => u8::MAX as usize,
            Self::U16 => u16::MAX as usize,
            Self::U32 => u32::MAX as usize,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Primitive(Primitive),
    /// Another schema in the same [`SchemaSet`], by name.
    Nested(String),
    /// Zero terminated.
    CString,
    /// Exactly `n` bytes, zero padded.
    FixedString(usize),
    /// Length prefixed.
    SizedString(Width),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cardinality {
    #[default]
    Single,
    Array(usize),
    Vector(Width),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub cardinality: Cardinality,
}

impl Field {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            cardinality: Cardinality::Single,
        }
    }

    pub fn primitive(name: &str, primitive: Primitive) -> Self {
        Self::new(name, FieldKind::Primitive(primitive))
    }

    pub fn nested(name: &str, schema: &str) -> Self {
        Self::new(name, FieldKind::Nested(schema.to_string()))
    }

    pub fn cstring(name: &str) -> Self {
        Self::new(name, FieldKind::CString)
    }

    pub fn fixed_string(name: &str, len: usize) -> Self {
        Self::new(name, FieldKind::FixedString(len))
    }

    pub fn sized_string(name: &str, width: Width) -> Self {
        Self::new(name, FieldKind::SizedString(width))
    }

    pub fn array(mut self, len: usize) -> Self {
        self.cardinality = Cardinality::Array(len);
        self
    }

    pub fn vector(mut self, width: Width) -> Self {
        self.cardinality = Cardinality::Vector(width);
        self
    }
}

/// Which side of the connection produces a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
pub enum Direction {
    /// Sent by the server; the client only reads it.
    Inbound,
    /// Sent by the client.
    Outbound,
    #[default]
    Both,
}

impl Direction {
    pub fn reads(self) -> bool {
        matches!(self, Self::Inbound | Self::Both)
    }

    pub fn writes(self) -> bool {
        matches!(self, Self::Outbound | Self::Both)
    }
}

/// An ordered field layout. Schemas with an opcode describe a whole packet
/// body; the rest are chunks embedded through [`FieldKind::Nested`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub name: String,
    pub opcode: Option<u32>,
    pub direction: Direction,
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn chunk(name: &str) -> Self {
        Self {
            name: name.to_string(),
            opcode: None,
            direction: Direction::Both,
            fields: Vec::new(),
        }
    }

    pub fn packet(name: &str, opcode: u32, direction: Direction) -> Self {
        Self {
            name: name.to_string(),
            opcode: Some(opcode),
            direction,
            fields: Vec::new(),
        }
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }
}

/// Schemas addressable by name, so nested fields can be resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaSet {
    schemas: BTreeMap<String, Schema>,
}

impl SchemaSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a schema by name.
    pub fn insert(&mut self, schema: Schema) -> &mut Self {
        self.schemas.insert(schema.name.clone(), schema);
        self
    }

    pub fn get(&self, name: &str) -> Result<&Schema, CodecError> {
        self.schemas
            .get(name)
            .ok_or_else(|| CodecError::UnknownSchema(name.to_string()))
    }

    pub fn by_opcode(&self, opcode: u32) -> Option<&Schema> {
        self.schemas.values().find(|s| s.opcode == Some(opcode))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Checks that every nested reference names a schema in the set.
    pub fn validate(&self) -> Result<(), CodecError> {
        for schema in self.schemas.values() {
            for field in &schema.fields {
                if let FieldKind::Nested(name) = &field.kind {
                    self.get(name)?;
                }
            }
        }
        Ok(())
    }
}
