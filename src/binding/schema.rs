//! In-memory type tables produced by the binding generator.

use std::sync::Arc;

use super::value::Value;

/// Scalar protobuf types. Each maps onto exactly one [`Value`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

impl ScalarType {
    /// Returns the protobuf type name for this scalar.
    pub fn proto_name(&self) -> &'static str {
        match self {
            ScalarType::Double => "double",
            ScalarType::Float => "float",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::Uint32 => "uint32",
            ScalarType::Uint64 => "uint64",
            ScalarType::Sint32 => "sint32",
            ScalarType::Sint64 => "sint64",
            ScalarType::Fixed32 => "fixed32",
            ScalarType::Fixed64 => "fixed64",
            ScalarType::Sfixed32 => "sfixed32",
            ScalarType::Sfixed64 => "sfixed64",
            ScalarType::Bool => "bool",
            ScalarType::String => "string",
            ScalarType::Bytes => "bytes",
        }
    }

    /// The zero value used when a field has no explicit default.
    pub fn zero(&self) -> Value {
        match self {
            ScalarType::Double => Value::F64(0.0),
            ScalarType::Float => Value::F32(0.0),
            ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32 => Value::I32(0),
            ScalarType::Int64 | ScalarType::Sint64 | ScalarType::Sfixed64 => Value::I64(0),
            ScalarType::Uint32 | ScalarType::Fixed32 => Value::U32(0),
            ScalarType::Uint64 | ScalarType::Fixed64 => Value::U64(0),
            ScalarType::Bool => Value::Bool(false),
            ScalarType::String => Value::String(String::new()),
            ScalarType::Bytes => Value::Bytes(Vec::new()),
        }
    }

    /// Parse a default value as protoc records it in `default_value`.
    pub fn parse_default(&self, text: &str) -> Option<Value> {
        let value = match self {
            ScalarType::Double => Value::F64(text.parse().ok()?),
            ScalarType::Float => Value::F32(text.parse().ok()?),
            ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32 => {
                Value::I32(text.parse().ok()?)
            }
            ScalarType::Int64 | ScalarType::Sint64 | ScalarType::Sfixed64 => {
                Value::I64(text.parse().ok()?)
            }
            ScalarType::Uint32 | ScalarType::Fixed32 => Value::U32(text.parse().ok()?),
            ScalarType::Uint64 | ScalarType::Fixed64 => Value::U64(text.parse().ok()?),
            ScalarType::Bool => Value::Bool(text.parse().ok()?),
            ScalarType::String => Value::String(text.to_string()),
            ScalarType::Bytes => Value::Bytes(unescape_bytes(text)),
        };
        Some(value)
    }

    /// Whether `value` has the representation this scalar uses.
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ScalarType::Double, Value::F64(_))
                | (ScalarType::Float, Value::F32(_))
                | (
                    ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32,
                    Value::I32(_)
                )
                | (
                    ScalarType::Int64 | ScalarType::Sint64 | ScalarType::Sfixed64,
                    Value::I64(_)
                )
                | (ScalarType::Uint32 | ScalarType::Fixed32, Value::U32(_))
                | (ScalarType::Uint64 | ScalarType::Fixed64, Value::U64(_))
                | (ScalarType::Bool, Value::Bool(_))
                | (ScalarType::String, Value::String(_))
                | (ScalarType::Bytes, Value::Bytes(_))
        )
    }
}

/// Undo the C-style escaping protoc applies to `bytes` defaults.
fn unescape_bytes(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' || i + 1 == bytes.len() {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let next = bytes[i + 1];
        match next {
            b'0'..=b'7' => {
                let digits = bytes[i + 1..]
                    .iter()
                    .take(3)
                    .take_while(|b| (b'0'..=b'7').contains(*b))
                    .count();
                let octal = std::str::from_utf8(&bytes[i + 1..i + 1 + digits]).unwrap_or("0");
                out.push(u8::from_str_radix(octal, 8).unwrap_or(0));
                i += 1 + digits;
            }
            _ => {
                out.push(match next {
                    b'n' => b'\n',
                    b'r' => b'\r',
                    b't' => b'\t',
                    other => other,
                });
                i += 2;
            }
        }
    }
    out
}

/// What a field holds.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Scalar(ScalarType),
    /// A message, by fully-qualified name without the leading dot.
    Message(String),
    /// An enum; enum types cannot form cycles so the table is held directly.
    Enum(Arc<EnumType>),
}

impl FieldKind {
    /// Human readable name for error messages.
    pub fn describe(&self) -> String {
        match self {
            FieldKind::Scalar(scalar) => scalar.proto_name().to_string(),
            FieldKind::Message(name) => format!("message {}", name),
            FieldKind::Enum(enum_type) => format!("enum {}", enum_type.full_name),
        }
    }

    /// Whether a single (non-list) value fits this kind.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldKind::Scalar(scalar), value) => scalar.accepts(value),
            (FieldKind::Message(name), Value::Message(msg)) => {
                msg.message_type().full_name == *name
            }
            (FieldKind::Enum(_), Value::Enum(_)) => true,
            _ => false,
        }
    }
}

/// Field cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// proto3 field without `optional`: no presence beyond "non-default".
    Implicit,
    /// Field with explicit presence.
    Optional,
    /// proto2 `required`.
    Required,
    Repeated,
}

/// One field of a message type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    /// Declared field number.
    pub number: u32,
    pub kind: FieldKind,
    pub cardinality: Cardinality,
    /// Explicit `[default = ...]` value.
    pub default: Option<Value>,
    /// Index into [`MessageType::oneofs`] for members of a real oneof.
    pub oneof: Option<usize>,
    pub json_name: Option<String>,
}

impl FieldDef {
    /// Whether the field is `repeated` (map fields included).
    pub fn is_repeated(&self) -> bool {
        self.cardinality == Cardinality::Repeated
    }

    /// The value a reader observes when the field is unset. Message fields
    /// have no default and return `None`.
    pub fn default_value(&self) -> Option<Value> {
        if self.is_repeated() {
            return Some(Value::List(Vec::new()));
        }
        if let Some(default) = &self.default {
            return Some(default.clone());
        }
        match &self.kind {
            FieldKind::Scalar(scalar) => Some(scalar.zero()),
            FieldKind::Enum(enum_type) => Some(Value::Enum(enum_type.default_number())),
            FieldKind::Message(_) => None,
        }
    }
}

/// A message type, with fields in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageType {
    /// Fully-qualified name without leading dot, e.g. `demo.Outer.Inner`.
    pub full_name: String,
    /// Short name, e.g. `Inner`.
    pub name: String,
    pub package: String,
    /// Schema file that defines the type.
    pub file: String,
    pub fields: Vec<FieldDef>,
    /// Names of the real oneofs.
    pub oneofs: Vec<String>,
    pub is_map_entry: bool,
}

impl MessageType {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_number(&self, number: u32) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.number == number)
    }
}

/// One named value of an enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub number: i32,
}

/// An enum type, with values in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    /// Fully-qualified name without leading dot.
    pub full_name: String,
    pub name: String,
    pub package: String,
    pub file: String,
    pub values: Vec<EnumValue>,
}

impl EnumType {
    /// Number of the value called `name`.
    pub fn value_by_name(&self, name: &str) -> Option<i32> {
        self.values.iter().find(|v| v.name == name).map(|v| v.number)
    }

    /// Name of the first value declared with `number`.
    pub fn name_of(&self, number: i32) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.number == number)
            .map(|v| v.name.as_str())
    }

    /// First declared value (proto2 semantics; proto3 requires it to be 0).
    pub fn default_number(&self) -> i32 {
        self.values.first().map(|v| v.number).unwrap_or(0)
    }
}

/// The loadable binding for one schema file: every type it defines, nested
/// types flattened and keyed by fully-qualified name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Binding {
    pub file: String,
    pub package: String,
    pub dependencies: Vec<String>,
    pub messages: Vec<Arc<MessageType>>,
    pub enums: Vec<Arc<EnumType>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default() {
        assert_eq!(ScalarType::Int32.parse_default("-7"), Some(Value::I32(-7)));
        assert_eq!(ScalarType::Bool.parse_default("true"), Some(Value::Bool(true)));
        assert_eq!(ScalarType::Double.parse_default("inf"), Some(Value::F64(f64::INFINITY)));
        assert_eq!(
            ScalarType::String.parse_default("hello"),
            Some(Value::String("hello".into()))
        );
        assert_eq!(ScalarType::Uint32.parse_default("-1"), None);
    }

    #[test]
    fn test_unescape_bytes() {
        assert_eq!(unescape_bytes(r"a\001\n\\"), vec![b'a', 1, b'\n', b'\\']);
        assert_eq!(unescape_bytes(r"\377x"), vec![0xFF, b'x']);
    }

    #[test]
    fn test_enum_lookup() {
        let color = EnumType {
            full_name: "demo.Color".into(),
            name: "Color".into(),
            package: "demo".into(),
            file: "demo.proto".into(),
            values: vec![
                EnumValue { name: "RED".into(), number: 5 },
                EnumValue { name: "GREEN".into(), number: 0 },
            ],
        };
        assert_eq!(color.value_by_name("GREEN"), Some(0));
        assert_eq!(color.name_of(5), Some("RED"));
        assert_eq!(color.name_of(9), None);
        assert_eq!(color.default_number(), 5);
    }
}
