/// A dynamically typed field value produced by the codec.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Record(Record),
    /// Arrays and vectors.
    List(Vec<Value>),
}

impl Value {
    /// Short name of the variant, used in mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::U8(_) => "u8",
            Self::I8(_) => "i8",
            Self::U16(_) => "u16",
            Self::I16(_) => "i16",
            Self::U32(_) => "u32",
            Self::I32(_) => "i32",
            Self::U64(_) => "u64",
            Self::I64(_) => "i64",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::Str(_) => "string",
            Self::Record(_) => "record",
            Self::List(_) => "list",
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::U8(v) => Some(u64::from(v)),
            Self::U16(v) => Some(u64::from(v)),
            Self::U32(v) => Some(u64::from(v)),
            Self::U64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from!(
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    String => Str,
    Record => Record,
    Vec<Value> => List,
);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

/// Field values in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Replaces the value of an existing field or appends a new one.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn get_u8(&self, name: &str) -> Option<u8> {
        match self.get(name)? {
            Value::U8(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_u32(&self, name: &str) -> Option<u32> {
        match self.get(name)? {
            Value::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_u64(&self, name: &str) -> Option<u64> {
        match self.get(name)? {
            Value::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_f32(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name)?.as_str()
    }

    pub fn get_record(&self, name: &str) -> Option<&Record> {
        self.get(name)?.as_record()
    }

    pub fn get_list(&self, name: &str) -> Option<&[Value]> {
        self.get(name)?.as_list()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut record = Record::new().with("a", 1_u8).with("b", "x");
        record.set("a", 2_u8);
        record.set("c", 3_u64);

        let names: Vec<&str> = record.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(record.get_u8("a"), Some(2));
        assert_eq!(record.get_str("b"), Some("x"));
        assert_eq!(record.get_u64("c"), Some(3));
    }

    #[test]
    fn test_typed_getters_do_not_coerce() {
        let record = Record::new().with("guid", 5_u32);
        assert_eq!(record.get_u64("guid"), None);
        assert_eq!(record.get("guid").and_then(Value::as_u64), Some(5));
        assert_eq!(record.get_u32("missing"), None);
    }

    #[test]
    fn test_nested_access() {
        let inner = Record::new().with("level", 80_u8);
        let record = Record::new().with(
            "entries",
            vec![Value::from(inner.clone()), Value::from(inner)],
        );
        let entries = record.get_list("entries").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].as_record().unwrap().get_u8("level"), Some(80));
    }
}
