//! Mapping from protobuf field types to type-table kinds and Rust types.

use proc_macro2::TokenStream;
use quote::quote;

use crate::binding::{Cardinality, FieldKind, ScalarType};
use crate::context::{GenerationContext, TypeKind};
use crate::descriptor::{FieldDescriptorProto, Label, Type};
use crate::Error;

/// The table scalar for a proto type, `None` for messages, enums and groups.
pub fn scalar_type(proto_type: Type) -> Option<ScalarType> {
    let scalar = match proto_type {
        Type::Double => ScalarType::Double,
        Type::Float => ScalarType::Float,
        Type::Int32 => ScalarType::Int32,
        Type::Int64 => ScalarType::Int64,
        Type::Uint32 => ScalarType::Uint32,
        Type::Uint64 => ScalarType::Uint64,
        Type::Sint32 => ScalarType::Sint32,
        Type::Sint64 => ScalarType::Sint64,
        Type::Fixed32 => ScalarType::Fixed32,
        Type::Fixed64 => ScalarType::Fixed64,
        Type::Sfixed32 => ScalarType::Sfixed32,
        Type::Sfixed64 => ScalarType::Sfixed64,
        Type::Bool => ScalarType::Bool,
        Type::String => ScalarType::String,
        Type::Bytes => ScalarType::Bytes,
        Type::Message | Type::Enum | Type::Group => return None,
    };
    Some(scalar)
}

/// The declared type of a field, checked for presence.
pub fn field_type(file: &str, field: &FieldDescriptorProto) -> Result<Type, Error> {
    field.field_type().ok_or_else(|| {
        Error::InvalidDescriptor(format!(
            "field '{}' in '{}' has unknown type {}",
            field.name.as_deref().unwrap_or(""),
            file,
            field.r#type.unwrap_or(-1)
        ))
    })
}

/// Resolve what a field holds, looking message and enum references up in
/// the set being generated and in earlier loads. A proto2 group holds its
/// nested message, so it resolves like a message field.
pub fn field_kind(
    ctx: &GenerationContext,
    file: &str,
    field: &FieldDescriptorProto,
) -> Result<FieldKind, Error> {
    let proto_type = field_type(file, field)?;
    if let Some(scalar) = scalar_type(proto_type) {
        return Ok(FieldKind::Scalar(scalar));
    }

    let type_name = referenced_type(file, field)?;
    let unresolved = || Error::UnresolvedType {
        file: file.to_string(),
        type_name: type_name.to_string(),
    };
    match proto_type {
        Type::Enum => ctx.resolve_enum(type_name).map(FieldKind::Enum).ok_or_else(unresolved),
        _ => match ctx.type_kind(type_name) {
            Some(TypeKind::Message) => {
                Ok(FieldKind::Message(type_name.trim_start_matches('.').to_string()))
            }
            _ => Err(unresolved()),
        },
    }
}

/// Presence semantics of a field.
pub fn cardinality(field: &FieldDescriptorProto, is_proto3: bool) -> Cardinality {
    match field.label() {
        Label::Repeated => Cardinality::Repeated,
        Label::Required => Cardinality::Required,
        Label::Optional if !is_proto3 => Cardinality::Optional,
        Label::Optional => {
            let explicit = field.proto3_optional.unwrap_or(false)
                || field.real_oneof().is_some()
                || field.field_type() == Some(Type::Message);
            if explicit {
                Cardinality::Optional
            } else {
                Cardinality::Implicit
            }
        }
    }
}

fn referenced_type<'f>(file: &str, field: &'f FieldDescriptorProto) -> Result<&'f str, Error> {
    field.type_name.as_deref().ok_or_else(|| {
        Error::InvalidDescriptor(format!(
            "field '{}' in '{}' references a type but names none",
            field.name.as_deref().unwrap_or(""),
            file
        ))
    })
}

/// Rust type information for a rendered field.
pub struct RustType {
    /// The base Rust type, without wrappers.
    pub base_type: TokenStream,
    pub is_optional: bool,
    pub is_repeated: bool,
    pub is_boxed: bool,
}

impl RustType {
    pub fn new(base_type: TokenStream, cardinality: Cardinality, is_boxed: bool) -> Self {
        Self {
            base_type,
            is_optional: cardinality == Cardinality::Optional,
            is_repeated: cardinality == Cardinality::Repeated,
            is_boxed,
        }
    }
}

/// The base Rust type of a field. `depth` is how many modules below the
/// shared root the field's struct is rendered.
pub fn base_rust_type(
    ctx: &GenerationContext,
    file: &str,
    field: &FieldDescriptorProto,
    depth: usize,
) -> Result<TokenStream, Error> {
    let tokens = match field_type(file, field)? {
        Type::Int32 | Type::Sint32 | Type::Sfixed32 => quote!(i32),
        Type::Int64 | Type::Sint64 | Type::Sfixed64 => quote!(i64),
        Type::Uint32 | Type::Fixed32 => quote!(u32),
        Type::Uint64 | Type::Fixed64 => quote!(u64),
        Type::Float => quote!(f32),
        Type::Double => quote!(f64),
        Type::Bool => quote!(bool),
        Type::String => quote!(::std::string::String),
        Type::Bytes => quote!(::std::vec::Vec<u8>),
        // Enum fields carry the raw number; the rendered enum converts.
        Type::Enum => quote!(i32),
        Type::Message | Type::Group => {
            let type_name = referenced_type(file, field)?;
            let rust_path = ctx.resolve_rust_path(type_name, depth).ok_or_else(|| {
                Error::UnresolvedType {
                    file: file.to_string(),
                    type_name: type_name.to_string(),
                }
            })?;
            let path: syn::Path = syn::parse_str(&rust_path)
                .map_err(|e| Error::SynParse(format!("invalid type path '{}': {}", rust_path, e)))?;
            quote!(#path)
        }
    };
    Ok(tokens)
}

/// Build the full Rust type including `Option`/`Vec`/`Box` wrappers.
///
/// Boxing wraps the base type, so an optional recursive field renders as
/// `Option<Box<T>>`.
pub fn build_full_type(rust_type: &RustType) -> TokenStream {
    let base = &rust_type.base_type;
    let inner = if rust_type.is_boxed {
        quote!(::std::boxed::Box<#base>)
    } else {
        quote!(#base)
    };

    if rust_type.is_repeated {
        quote!(::std::vec::Vec<#inner>)
    } else if rust_type.is_optional {
        quote!(::std::option::Option<#inner>)
    } else {
        inner
    }
}
