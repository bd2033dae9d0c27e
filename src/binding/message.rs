//! A message instance backed by a loaded [`MessageType`].

use std::collections::BTreeMap;
use std::sync::Arc;

use super::schema::{FieldDef, FieldKind, MessageType};
use super::value::Value;
use crate::Error;

/// An instance of a loaded message type.
///
/// Values are keyed by field number and type-checked on every write. Only
/// explicitly set fields are stored; readers fall back to the field default.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicMessage {
    message_type: Arc<MessageType>,
    values: BTreeMap<u32, Value>,
}

impl DynamicMessage {
    /// Create an empty instance of `message_type`.
    pub fn new(message_type: Arc<MessageType>) -> Self {
        Self {
            message_type,
            values: BTreeMap::new(),
        }
    }

    pub fn message_type(&self) -> &Arc<MessageType> {
        &self.message_type
    }

    /// Set a field. Repeated fields take a [`Value::List`]; enum fields also
    /// accept a plain `i32`. Setting a oneof member clears its siblings.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<(), Error> {
        let def = self.field_def(field)?;
        let value = coerce(def, value.into());

        if def.is_repeated() {
            let items = match &value {
                Value::List(items) => items,
                other => return Err(mismatch(def, "list", other)),
            };
            if let Some(bad) = items.iter().find(|item| !def.kind.accepts(item)) {
                return Err(mismatch(def, &def.kind.describe(), bad));
            }
        } else if !def.kind.accepts(&value) {
            return Err(mismatch(def, &def.kind.describe(), &value));
        }

        let number = def.number;
        if let Some(oneof) = def.oneof {
            let siblings: Vec<u32> = self
                .message_type
                .fields
                .iter()
                .filter(|f| f.oneof == Some(oneof) && f.number != number)
                .map(|f| f.number)
                .collect();
            for sibling in siblings {
                self.values.remove(&sibling);
            }
        }

        self.values.insert(number, value);
        Ok(())
    }

    /// Append one element to a repeated field.
    pub fn push(&mut self, field: &str, value: impl Into<Value>) -> Result<(), Error> {
        let def = self.field_def(field)?;
        let value = coerce(def, value.into());
        if !def.is_repeated() {
            return Err(mismatch(def, &def.kind.describe(), &Value::List(vec![value])));
        }
        if !def.kind.accepts(&value) {
            return Err(mismatch(def, &def.kind.describe(), &value));
        }

        let number = def.number;
        match self
            .values
            .entry(number)
            .or_insert_with(|| Value::List(Vec::new()))
        {
            Value::List(items) => items.push(value),
            slot => *slot = Value::List(vec![value]),
        }
        Ok(())
    }

    /// Set an enum field by value name.
    pub fn set_enum_by_name(&mut self, field: &str, value_name: &str) -> Result<(), Error> {
        let def = self.field_def(field)?;
        let FieldKind::Enum(enum_type) = &def.kind else {
            return Err(mismatch(def, "enum", &Value::String(value_name.to_string())));
        };
        let number = enum_type
            .value_by_name(value_name)
            .ok_or_else(|| Error::TypeMismatch {
                field: def.name.clone(),
                expected: format!("a value of {}", enum_type.full_name),
                found: value_name.to_string(),
            })?;
        self.set(field, Value::Enum(number))
    }

    /// The explicitly set value of a field, if any.
    pub fn get(&self, field: &str) -> Result<Option<&Value>, Error> {
        let def = self.field_def(field)?;
        Ok(self.values.get(&def.number))
    }

    /// Mutable access to an explicitly set value, e.g. to edit a nested
    /// message in place.
    pub fn get_mut(&mut self, field: &str) -> Result<Option<&mut Value>, Error> {
        let number = self.field_def(field)?.number;
        Ok(self.values.get_mut(&number))
    }

    /// The set value of a field, or its default when unset. Unset message
    /// fields have no default and are reported as an error.
    pub fn get_or_default(&self, field: &str) -> Result<Value, Error> {
        let def = self.field_def(field)?;
        if let Some(value) = self.values.get(&def.number) {
            return Ok(value.clone());
        }
        def.default_value().ok_or_else(|| {
            Error::InvalidArgument(format!(
                "message field '{}' of '{}' is unset and has no default",
                def.name, self.message_type.full_name
            ))
        })
    }

    /// Whether the field has been explicitly set.
    pub fn has(&self, field: &str) -> Result<bool, Error> {
        let def = self.field_def(field)?;
        Ok(self.values.contains_key(&def.number))
    }

    /// Unset a field, returning its previous value.
    pub fn clear(&mut self, field: &str) -> Result<Option<Value>, Error> {
        let number = self.field_def(field)?.number;
        Ok(self.values.remove(&number))
    }

    /// Set fields in ascending field-number order.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldDef, &Value)> {
        self.values.iter().filter_map(|(number, value)| {
            self.message_type
                .field_by_number(*number)
                .map(|def| (def, value))
        })
    }

    /// Name of the oneof member currently set, if any.
    pub fn which_oneof(&self, oneof: &str) -> Option<&str> {
        let index = self.message_type.oneofs.iter().position(|o| o == oneof)?;
        self.message_type
            .fields
            .iter()
            .filter(|f| f.oneof == Some(index))
            .find(|f| self.values.contains_key(&f.number))
            .map(|f| f.name.as_str())
    }

    fn field_def(&self, field: &str) -> Result<&FieldDef, Error> {
        self.message_type
            .field(field)
            .ok_or_else(|| Error::UnknownField {
                message: self.message_type.full_name.clone(),
                field: field.to_string(),
            })
    }
}

/// Plain integers are accepted for enum fields.
fn coerce(def: &FieldDef, value: Value) -> Value {
    if !matches!(def.kind, FieldKind::Enum(_)) {
        return value;
    }
    match value {
        Value::I32(n) => Value::Enum(n),
        Value::List(items) => Value::List(
            items
                .into_iter()
                .map(|item| match item {
                    Value::I32(n) => Value::Enum(n),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}

fn mismatch(def: &FieldDef, expected: &str, found: &Value) -> Error {
    let expected = if def.is_repeated() && expected != "list" {
        format!("repeated {}", expected)
    } else {
        expected.to_string()
    };
    Error::TypeMismatch {
        field: def.name.clone(),
        expected,
        found: found.kind_name(),
    }
}
