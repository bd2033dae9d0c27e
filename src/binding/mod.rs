//! Generic runtime for loaded bindings.
//!
//! A binding is a table of message and enum types. Once a binding is
//! activated in a [`Registry`], callers create [`DynamicMessage`] instances
//! of its types and read or write fields by name.

mod message;
mod registry;
mod schema;
mod value;

pub use message::DynamicMessage;
pub use registry::Registry;
pub use schema::{
    Binding, Cardinality, EnumType, EnumValue, FieldDef, FieldKind, MessageType, ScalarType,
};
pub use value::Value;
