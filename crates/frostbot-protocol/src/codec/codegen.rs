use std::fmt::Write;

use super::schema::{Cardinality, Field, FieldKind, Primitive, Schema, SchemaSet, Width};

const KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "static", "struct", "super", "trait", "true", "type", "unsafe", "use", "where", "while",
    "async", "await", "dyn",
];

fn ident(name: &str) -> String {
    if KEYWORDS.contains(&name) {
        format!("r#{}", name)
    } else {
        name.to_string()
    }
}

fn primitive_type(primitive: Primitive) -> &'static str {
    match primitive {
        Primitive::U8 => "u8",
        Primitive::I8 => "i8",
        Primitive::U16 => "u16",
        Primitive::I16 => "i16",
        Primitive::U32 => "u32",
        Primitive::I32 => "i32",
        Primitive::U64 => "u64",
        Primitive::I64 => "i64",
        Primitive::F32 => "f32",
        Primitive::F64 => "f64",
    }
}

fn width_type(width: Width) -> &'static str {
    match width {
        Width::U8 => "u8",
        Width::U16 => "u16",
        Width::U32 => "u32",
    }
}

fn element_type(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Primitive(p) => primitive_type(*p).to_string(),
        FieldKind::Nested(name) => name.clone(),
        FieldKind::CString | FieldKind::FixedString(_) | FieldKind::SizedString(_) => {
            "String".to_string()
        }
    }
}

fn field_type(field: &Field) -> String {
    match field.cardinality {
        Cardinality::Single => element_type(&field.kind),
        Cardinality::Array(_) | Cardinality::Vector(_) => format!("Vec<{}>", element_type(&field.kind)),
    }
}

fn read_expr(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Primitive(p) => format!("reader.read_{}()?", primitive_type(*p)),
        FieldKind::Nested(name) => format!("{}::read(reader)?", name),
        FieldKind::CString => "reader.read_cstring()?".to_string(),
        FieldKind::FixedString(len) => format!("reader.read_fixed_string({})?", len),
        FieldKind::SizedString(width) => format!(
            "{{ let len = reader.read_{}()? as usize; \
             String::from_utf8_lossy(reader.read_bytes(len)?).into_owned() }}",
            width_type(*width)
        ),
    }
}

/// Statement writing one element. `place` is `self.field` for single
/// fields and `item` (a reference) inside loops.
fn write_stmt(field: &str, kind: &FieldKind, place: &str, in_loop: bool) -> String {
    let by_ref = if in_loop {
        place.to_string()
    } else {
        format!("&{}", place)
    };
    match kind {
        FieldKind::Primitive(p) => {
            let value = if in_loop {
                format!("*{}", place)
            } else {
                place.to_string()
            };
            format!("out.write_{}({});", primitive_type(*p), value)
        }
        FieldKind::Nested(_) => format!("{}.write(out)?;", place),
        FieldKind::CString => format!("out.write_cstring({});", by_ref),
        FieldKind::FixedString(len) => format!(
            "codec::fit_fixed({:?}, {}.len(), {})?; out.write_fixed_string({}, {});",
            field, place, len, by_ref, len
        ),
        FieldKind::SizedString(width) => format!(
            "out.write_{}(codec::size_prefix({:?}, {}.len())?).write_bytes({}.as_bytes());",
            width_type(*width),
            field,
            place,
            place
        ),
    }
}

fn render_list_read(out: &mut String, name: &str, count: &str, capacity: &str, element: &str) {
    let _ = writeln!(out, "            {}: {{", name);
    let _ = writeln!(out, "                let mut items = Vec::with_capacity({});", capacity);
    let _ = writeln!(out, "                for _ in 0..{} {{", count);
    let _ = writeln!(out, "                    items.push({});", element);
    let _ = writeln!(out, "                }}");
    let _ = writeln!(out, "                items");
    let _ = writeln!(out, "            }},");
}

fn render_read(out: &mut String, field: &Field) {
    let name = ident(&field.name);
    let element = read_expr(&field.kind);
    match field.cardinality {
        Cardinality::Single => {
            let _ = writeln!(out, "            {}: {},", name, element);
        }
        Cardinality::Array(len) => {
            let len = len.to_string();
            render_list_read(out, &name, &len, &len, &element);
        }
        Cardinality::Vector(width) => {
            let count = format!("reader.read_{}()?", width_type(width));
            render_list_read(out, &name, &count, "0", &element);
        }
    }
}

fn render_write(out: &mut String, field: &Field) {
    let place = format!("self.{}", ident(&field.name));
    match field.cardinality {
        Cardinality::Single => {
            let _ = writeln!(out, "        {}", write_stmt(&field.name, &field.kind, &place, false));
        }
        Cardinality::Array(len) => {
            let _ = writeln!(
                out,
                "        codec::expect_len({:?}, {}, {}.len())?;",
                field.name, len, place
            );
            let _ = writeln!(
                out,
                "        for item in &{} {{ {} }}",
                place,
                write_stmt(&field.name, &field.kind, "item", true)
            );
        }
        Cardinality::Vector(width) => {
            let _ = writeln!(
                out,
                "        out.write_{}(codec::size_prefix({:?}, {}.len())?);",
                width_type(width),
                field.name,
                place
            );
            let _ = writeln!(
                out,
                "        for item in &{} {{ {} }}",
                place,
                write_stmt(&field.name, &field.kind, "item", true)
            );
        }
    }
}

fn render_schema(out: &mut String, schema: &Schema) {
    let _ = writeln!(out, "#[derive(Debug, Clone, PartialEq, Default)]");
    let _ = writeln!(out, "pub struct {} {{", schema.name);
    for field in &schema.fields {
        let _ = writeln!(out, "    pub {}: {},", ident(&field.name), field_type(field));
    }
    let _ = writeln!(out, "}}\n");

    let _ = writeln!(out, "impl {} {{", schema.name);
    if let Some(opcode) = schema.opcode {
        let _ = writeln!(out, "    pub const OPCODE: u32 = {:#06x};\n", opcode);
    }

    if schema.direction.reads() || schema.opcode.is_none() {
        let binding = if schema.fields.is_empty() { "_reader" } else { "reader" };
        let _ = writeln!(
            out,
            "    pub fn read({}: &mut PacketReader<'_>) -> Result<Self, DecodeError> {{",
            binding
        );
        let _ = writeln!(out, "        Ok(Self {{");
        for field in &schema.fields {
            render_read(out, field);
        }
        let _ = writeln!(out, "        }})");
        let _ = writeln!(out, "    }}\n");
    }

    if schema.direction.writes() || schema.opcode.is_none() {
        let binding = if schema.fields.is_empty() { "_out" } else { "out" };
        let _ = writeln!(
            out,
            "    pub fn write(&self, {}: &mut Vec<u8>) -> Result<(), CodecError> {{",
            binding
        );
        for field in &schema.fields {
            render_write(out, field);
        }
        let _ = writeln!(out, "        Ok(())");
        let _ = writeln!(out, "    }}");
    }
    let _ = writeln!(out, "}}\n");
}

/// Renders every schema in `set` as a struct with `read`/`write` methods
/// built on [`PacketReader`](crate::PacketReader) and
/// [`PacketWrite`](crate::PacketWrite).
///
/// Packets only get the method for the direction they travel in; chunks get
/// both since either side may embed them. Writers check lengths with the
/// same rules as [`SchemaSet::encode`](super::SchemaSet::encode).
pub fn render_rust(set: &SchemaSet) -> String {
    let mut out = String::new();
    out.push_str("// @generated by frostbot-protocol. Do not edit.\n\n");
    out.push_str("#[allow(unused_imports)]\n");
    out.push_str("use frostbot_protocol::codec;\n");
    out.push_str("#[allow(unused_imports)]\n");
    out.push_str("use frostbot_protocol::{CodecError, DecodeError, PacketReader, PacketWrite};\n\n");
    for schema in set.iter() {
        render_schema(&mut out, schema);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::definitions;
    use crate::codec::Direction;

    #[test]
    fn test_struct_and_methods() {
        let mut set = SchemaSet::new();
        set.insert(
            Schema::packet("Greeting", 0x42, Direction::Both)
                .field(Field::primitive("type", Primitive::U8))
                .field(Field::cstring("name"))
                .field(Field::sized_string("motd", Width::U16))
                .field(Field::primitive("scores", Primitive::U32).vector(Width::U8)),
        );
        let code = render_rust(&set);

        assert!(code.contains("pub struct Greeting {"));
        assert!(code.contains("pub r#type: u8,"));
        assert!(code.contains("pub scores: Vec<u32>,"));
        assert!(code.contains("pub const OPCODE: u32 = 0x0042;"));
        assert!(code.contains("r#type: reader.read_u8()?,"));
        assert!(code.contains("name: reader.read_cstring()?,"));
        assert!(code.contains("out.write_u8(self.r#type);"));
        assert!(code.contains("out.write_cstring(&self.name);"));
        assert!(code.contains("out.write_u8(codec::size_prefix(\"scores\", self.scores.len())?);"));
        assert!(code.contains("for item in &self.scores { out.write_u32(*item); }"));
        assert!(code.contains(
            "out.write_u16(codec::size_prefix(\"motd\", self.motd.len())?).write_bytes(self.motd.as_bytes());"
        ));
        assert!(!code.contains(" as u8"));
    }

    #[test]
    fn test_direction_limits_methods() {
        let mut set = SchemaSet::new();
        set.insert(Schema::packet("Inbound", 1, Direction::Inbound))
            .insert(Schema::packet("Outbound", 2, Direction::Outbound));
        let code = render_rust(&set);

        let inbound = code.find("impl Inbound").unwrap();
        let outbound = code.find("impl Outbound").unwrap();
        assert!(code[inbound..outbound].contains("pub fn read"));
        assert!(!code[inbound..outbound].contains("pub fn write"));
        assert!(code[outbound..].contains("pub fn write(&self, _out: &mut Vec<u8>) -> Result<(), CodecError>"));
        assert!(!code[outbound..].contains("pub fn read"));
    }

    #[test]
    fn test_builtin_char_enum() {
        let code = render_rust(&definitions::builtin());
        assert!(code.contains("pub struct SmsgCharEnum {"));
        assert!(code.contains("pub characters: Vec<CharEnumEntry>,"));
        assert!(code.contains("pub items: Vec<CharEnumItem>,"));
        assert!(code.contains("for _ in 0..19 {"));
        assert!(code.contains("items.push(CharEnumItem::read(reader)?);"));
        assert!(code.contains("for _ in 0..reader.read_u8()? {"));
        assert!(code.contains("pub const OPCODE: u32 = 0x003b;"));
    }
}
