//! Declarative packet layouts.
//!
//! A [`Schema`] lists fields in wire order; [`SchemaSet::decode`] walks it
//! over a [`PacketReader`] and produces a [`Record`], and
//! [`SchemaSet::encode`] writes a record back. [`render_rust`] turns the same
//! layouts into plain Rust structs for callers that want static types.

mod codegen;
pub mod definitions;
mod schema;
mod value;

pub use codegen::render_rust;
pub use schema::{Cardinality, Direction, Field, FieldKind, Primitive, Schema, SchemaSet, Width};
pub use value::{Record, Value};

use crate::buffer::{PacketReader, PacketWrite};
use crate::error::CodecError;
use crate::packets::WorldPacket;

fn read_width(reader: &mut PacketReader<'_>, width: Width) -> Result<usize, CodecError> {
    Ok(match width {
        Width::U8 => usize::from(reader.read_u8()?),
        Width::U16 => usize::from(reader.read_u16()?),
        Width::U32 => reader.read_u32()? as usize,
    })
}

/// Converts an element count to its size prefix type.
pub fn size_prefix<T: TryFrom<usize>>(field: &str, len: usize) -> Result<T, CodecError> {
    T::try_from(len).map_err(|_| CodecError::LengthOverflow {
        field: field.to_string(),
        len,
    })
}

/// Fixed-size arrays must hold exactly `expected` elements.
pub fn expect_len(field: &str, expected: usize, actual: usize) -> Result<(), CodecError> {
    if actual != expected {
        return Err(CodecError::LengthMismatch {
            field: field.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Fixed-width strings are zero padded, never truncated.
pub fn fit_fixed(field: &str, len: usize, width: usize) -> Result<(), CodecError> {
    if len > width {
        return Err(CodecError::LengthOverflow {
            field: field.to_string(),
            len,
        });
    }
    Ok(())
}

fn write_width(out: &mut Vec<u8>, width: Width, field: &str, len: usize) -> Result<(), CodecError> {
    match width {
        Width::U8 => out.write_u8(size_prefix(field, len)?),
        Width::U16 => out.write_u16(size_prefix(field, len)?),
        Width::U32 => out.write_u32(size_prefix(field, len)?),
    };
    Ok(())
}

fn read_primitive(reader: &mut PacketReader<'_>, primitive: Primitive) -> Result<Value, CodecError> {
    Ok(match primitive {
        Primitive::U8 => Value::U8(reader.read_u8()?),
        Primitive::I8 => Value::I8(reader.read_i8()?),
        Primitive::U16 => Value::U16(reader.read_u16()?),
        Primitive::I16 => Value::I16(reader.read_i16()?),
        Primitive::U32 => Value::U32(reader.read_u32()?),
        Primitive::I32 => Value::I32(reader.read_i32()?),
        Primitive::U64 => Value::U64(reader.read_u64()?),
        Primitive::I64 => Value::I64(reader.read_i64()?),
        Primitive::F32 => Value::F32(reader.read_f32()?),
        Primitive::F64 => Value::F64(reader.read_f64()?),
    })
}

fn write_primitive(
    out: &mut Vec<u8>,
    primitive: Primitive,
    field: &str,
    value: &Value,
) -> Result<(), CodecError> {
    match (primitive, value) {
        (Primitive::U8, Value::U8(v)) => out.write_u8(*v),
        (Primitive::I8, Value::I8(v)) => out.write_i8(*v),
        (Primitive::U16, Value::U16(v)) => out.write_u16(*v),
        (Primitive::I16, Value::I16(v)) => out.write_i16(*v),
        (Primitive::U32, Value::U32(v)) => out.write_u32(*v),
        (Primitive::I32, Value::I32(v)) => out.write_i32(*v),
        (Primitive::U64, Value::U64(v)) => out.write_u64(*v),
        (Primitive::I64, Value::I64(v)) => out.write_i64(*v),
        (Primitive::F32, Value::F32(v)) => out.write_f32(*v),
        (Primitive::F64, Value::F64(v)) => out.write_f64(*v),
        _ => return Err(mismatch(field, primitive.to_string(), value)),
    };
    Ok(())
}

fn mismatch(field: &str, expected: String, actual: &Value) -> CodecError {
    CodecError::TypeMismatch {
        field: field.to_string(),
        expected: format!("{}, found {}", expected, actual.type_name()),
    }
}

impl SchemaSet {
    /// Reads the fields of `schema` in declaration order.
    pub fn decode(&self, schema: &str, reader: &mut PacketReader<'_>) -> Result<Record, CodecError> {
        let schema = self.get(schema)?;
        let mut record = Record::new();
        for field in &schema.fields {
            let value = self.decode_field(field, reader)?;
            record.set(&field.name, value);
        }
        Ok(record)
    }

    /// Appends `record` laid out as `schema`. Fields the schema does not
    /// name are ignored.
    pub fn encode(&self, schema: &str, record: &Record, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let schema = self.get(schema)?;
        for field in &schema.fields {
            let value = record
                .get(&field.name)
                .ok_or_else(|| CodecError::MissingField(field.name.clone()))?;
            self.encode_field(field, value, out)?;
        }
        Ok(())
    }

    /// Decodes a whole packet body using the schema registered for its opcode.
    pub fn decode_packet(&self, packet: &WorldPacket) -> Result<(&Schema, Record), CodecError> {
        let schema = self
            .by_opcode(packet.opcode())
            .ok_or_else(|| CodecError::UnknownSchema(format!("opcode {:#06x}", packet.opcode())))?;
        let record = self.decode(&schema.name, &mut packet.reader())?;
        Ok((schema, record))
    }

    pub fn encode_packet(&self, schema: &str, record: &Record) -> Result<WorldPacket, CodecError> {
        let opcode = self
            .get(schema)?
            .opcode
            .ok_or_else(|| CodecError::NotAPacket(schema.to_string()))?;
        let mut packet = WorldPacket::new(opcode);
        self.encode(schema, record, packet.payload_mut())?;
        Ok(packet)
    }

    fn decode_field(&self, field: &Field, reader: &mut PacketReader<'_>) -> Result<Value, CodecError> {
        match field.cardinality {
            Cardinality::Single => self.decode_element(&field.kind, reader),
            Cardinality::Array(len) => self.decode_list(&field.kind, len, reader),
            Cardinality::Vector(width) => {
                let len = read_width(reader, width)?;
                self.decode_list(&field.kind, len, reader)
            }
        }
    }

    fn decode_list(
        &self,
        kind: &FieldKind,
        len: usize,
        reader: &mut PacketReader<'_>,
    ) -> Result<Value, CodecError> {
        let mut items = Vec::with_capacity(len.min(reader.remaining()));
        for _ in 0..len {
            items.push(self.decode_element(kind, reader)?);
        }
        Ok(Value::List(items))
    }

    fn decode_element(&self, kind: &FieldKind, reader: &mut PacketReader<'_>) -> Result<Value, CodecError> {
        Ok(match kind {
            FieldKind::Primitive(primitive) => read_primitive(reader, *primitive)?,
            FieldKind::Nested(name) => Value::Record(self.decode(name, reader)?),
            FieldKind::CString => Value::Str(reader.read_cstring()?),
            FieldKind::FixedString(len) => Value::Str(reader.read_fixed_string(*len)?),
            FieldKind::SizedString(width) => {
                let len = read_width(reader, *width)?;
                Value::Str(String::from_utf8_lossy(reader.read_bytes(len)?).into_owned())
            }
        })
    }

    fn encode_field(&self, field: &Field, value: &Value, out: &mut Vec<u8>) -> Result<(), CodecError> {
        match field.cardinality {
            Cardinality::Single => self.encode_element(field, value, out),
            Cardinality::Array(len) => {
                let items = value
                    .as_list()
                    .ok_or_else(|| mismatch(&field.name, format!("list of {}", len), value))?;
                expect_len(&field.name, len, items.len())?;
                items
                    .iter()
                    .try_for_each(|item| self.encode_element(field, item, out))
            }
            Cardinality::Vector(width) => {
                let items = value
                    .as_list()
                    .ok_or_else(|| mismatch(&field.name, "list".to_string(), value))?;
                write_width(out, width, &field.name, items.len())?;
                items
                    .iter()
                    .try_for_each(|item| self.encode_element(field, item, out))
            }
        }
    }

    fn encode_element(&self, field: &Field, value: &Value, out: &mut Vec<u8>) -> Result<(), CodecError> {
        match &field.kind {
            FieldKind::Primitive(primitive) => write_primitive(out, *primitive, &field.name, value),
            FieldKind::Nested(name) => match value {
                Value::Record(record) => self.encode(name, record, out),
                other => Err(mismatch(&field.name, format!("record {}", name), other)),
            },
            FieldKind::CString => {
                let text = value
                    .as_str()
                    .ok_or_else(|| mismatch(&field.name, "string".to_string(), value))?;
                out.write_cstring(text);
                Ok(())
            }
            FieldKind::FixedString(len) => {
                let text = value
                    .as_str()
                    .ok_or_else(|| mismatch(&field.name, "string".to_string(), value))?;
                fit_fixed(&field.name, text.len(), *len)?;
                out.write_fixed_string(text, *len);
                Ok(())
            }
            FieldKind::SizedString(width) => {
                let text = value
                    .as_str()
                    .ok_or_else(|| mismatch(&field.name, "string".to_string(), value))?;
                write_width(out, *width, &field.name, text.len())?;
                out.write_bytes(text.as_bytes());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> SchemaSet {
        let mut set = SchemaSet::new();
        set.insert(
            Schema::chunk("Point")
                .field(Field::primitive("x", Primitive::F32))
                .field(Field::primitive("y", Primitive::F32)),
        )
        .insert(
            Schema::packet("Route", 0x100, Direction::Both)
                .field(Field::primitive("id", Primitive::U32))
                .field(Field::cstring("name"))
                .field(Field::nested("points", "Point").vector(Width::U8)),
        );
        set
    }

    fn point(x: f32, y: f32) -> Value {
        Record::new().with("x", x).with("y", y).into()
    }

    #[test]
    fn test_nested_vector_layout() {
        let record = Record::new()
            .with("id", 7_u32)
            .with("name", "ab")
            .with("points", vec![point(1.0, 2.0)]);
        let packet = set().encode_packet("Route", &record).unwrap();

        let mut expected = vec![7, 0, 0, 0, b'a', b'b', 0, 1];
        expected.extend_from_slice(&1.0_f32.to_le_bytes());
        expected.extend_from_slice(&2.0_f32.to_le_bytes());
        assert_eq!(packet.opcode(), 0x100);
        assert_eq!(packet.payload(), expected.as_slice());

        let schemas = set();
        let (schema, decoded) = schemas.decode_packet(&packet).unwrap();
        assert_eq!(schema.name, "Route");
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_missing_field_and_type_mismatch() {
        let set = set();
        let mut out = Vec::new();
        let record = Record::new().with("id", 7_u32);
        assert_eq!(
            set.encode("Route", &record, &mut out),
            Err(CodecError::MissingField("name".to_string()))
        );

        let record = Record::new()
            .with("id", 7_u64)
            .with("name", "x")
            .with("points", Vec::<Value>::new());
        assert!(matches!(
            set.encode("Route", &record, &mut out),
            Err(CodecError::TypeMismatch { field, .. }) if field == "id"
        ));
    }

    #[test]
    fn test_vector_overflow() {
        let set = set();
        let record = Record::new()
            .with("id", 1_u32)
            .with("name", "")
            .with("points", vec![point(0.0, 0.0); 256]);
        assert_eq!(
            set.encode("Route", &record, &mut Vec::new()),
            Err(CodecError::LengthOverflow {
                field: "points".to_string(),
                len: 256
            })
        );
    }

    #[test]
    fn test_unknown_schema_and_opcode() {
        let set = set();
        assert_eq!(
            set.decode("Nope", &mut PacketReader::new(&[])),
            Err(CodecError::UnknownSchema("Nope".to_string()))
        );
        assert_eq!(
            set.encode_packet("Point", &Record::new()),
            Err(CodecError::NotAPacket("Point".to_string()))
        );
        let packet = WorldPacket::new(0x999);
        assert!(matches!(
            set.decode_packet(&packet),
            Err(CodecError::UnknownSchema(_))
        ));
    }

    #[test]
    fn test_truncated_input_is_a_decode_error() {
        let set = set();
        let result = set.decode("Route", &mut PacketReader::new(&[1, 0, 0, 0, b'a']));
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }
}
