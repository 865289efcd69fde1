use frostbot_protocol::codec::{render_rust, Direction, Field, Primitive, Record, Schema, SchemaSet, Value, Width};
use frostbot_protocol::{CodecError, PacketReader};

mod generated {
    include!("codegen/route.rs");
}

use generated::{Point, Route};

fn schemas() -> SchemaSet {
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
            .field(Field::fixed_string("tag", 4))
            .field(Field::sized_string("motd", Width::U16))
            .field(Field::nested("points", "Point").vector(Width::U8))
            .field(Field::primitive("flags", Primitive::U8).array(3)),
    );
    set
}

fn route() -> Route {
    Route {
        id: 42,
        name: "north".to_string(),
        tag: "NR".to_string(),
        motd: "hello".to_string(),
        points: vec![Point { x: 1.5, y: -2.0 }, Point { x: 0.0, y: 8.25 }],
        flags: vec![1, 0, 7],
    }
}

fn record(route: &Route) -> Record {
    let points: Vec<Value> = route
        .points
        .iter()
        .map(|p| Record::new().with("x", p.x).with("y", p.y).into())
        .collect();
    let flags: Vec<Value> = route.flags.iter().map(|f| Value::U8(*f)).collect();
    Record::new()
        .with("id", route.id)
        .with("name", route.name.as_str())
        .with("tag", route.tag.as_str())
        .with("motd", route.motd.as_str())
        .with("points", points)
        .with("flags", flags)
}

#[test]
fn test_checked_in_output_is_current() {
    assert_eq!(render_rust(&schemas()), include_str!("codegen/route.rs"));
}

#[test]
fn test_generated_code_agrees_with_runtime_codec() {
    let route = route();
    let mut generated = Vec::new();
    route.write(&mut generated).unwrap();

    let mut runtime = Vec::new();
    schemas().encode("Route", &record(&route), &mut runtime).unwrap();
    assert_eq!(generated, runtime);

    let decoded = Route::read(&mut PacketReader::new(&runtime)).unwrap();
    assert_eq!(decoded, route);
    assert_eq!(Route::OPCODE, 0x100);
}

#[test]
fn test_generated_writer_rejects_what_runtime_rejects() {
    let mut route = route();
    route.points = vec![Point::default(); 256];
    assert_eq!(
        route.write(&mut Vec::new()),
        Err(CodecError::LengthOverflow {
            field: "points".to_string(),
            len: 256
        })
    );
    assert_eq!(
        schemas().encode("Route", &record(&route), &mut Vec::new()),
        route.write(&mut Vec::new())
    );

    let mut route = self::route();
    route.tag = "TOO LONG".to_string();
    assert!(matches!(
        route.write(&mut Vec::new()),
        Err(CodecError::LengthOverflow { field, len: 8 }) if field == "tag"
    ));

    let mut route = self::route();
    route.flags.pop();
    assert_eq!(
        route.write(&mut Vec::new()),
        Err(CodecError::LengthMismatch {
            field: "flags".to_string(),
            expected: 3,
            actual: 2
        })
    );
}
