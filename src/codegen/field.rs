//! Field tables and rendered struct fields.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::binding::{FieldDef, FieldKind, Value};
use crate::context::{to_rust_field_name, GenerationContext};
use crate::descriptor::{DescriptorProto, FieldDescriptorProto};
use crate::Error;

use super::types::{base_rust_type, build_full_type, cardinality, field_kind, RustType};

/// Build the table entry for one field.
pub fn build_field(
    ctx: &GenerationContext,
    file: &str,
    field: &FieldDescriptorProto,
    is_proto3: bool,
) -> Result<FieldDef, Error> {
    let name = field
        .name
        .clone()
        .ok_or_else(|| Error::InvalidDescriptor(format!("unnamed field in '{}'", file)))?;
    let number = field
        .number
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| *n > 0)
        .ok_or_else(|| {
            Error::InvalidDescriptor(format!("field '{}' in '{}' has no valid number", name, file))
        })?;
    let kind = field_kind(ctx, file, field)?;

    let default = match &field.default_value {
        Some(text) => Some(parse_default(&kind, text).ok_or_else(|| {
            Error::InvalidDescriptor(format!(
                "field '{}' in '{}' has unparseable default '{}'",
                name, file, text
            ))
        })?),
        None => None,
    };

    Ok(FieldDef {
        number,
        kind,
        cardinality: cardinality(field, is_proto3),
        default,
        oneof: field.real_oneof(),
        json_name: field.json_name.clone(),
        name,
    })
}

fn parse_default(kind: &FieldKind, text: &str) -> Option<Value> {
    match kind {
        FieldKind::Scalar(scalar) => scalar.parse_default(text),
        FieldKind::Enum(enum_type) => enum_type.value_by_name(text).map(Value::Enum),
        FieldKind::Message(_) => None,
    }
}

/// Render a struct field. Map fields, whose synthetic entry message is
/// passed as `map_entry`, render as a `HashMap`.
pub fn generate_field(
    ctx: &GenerationContext,
    file: &str,
    parent_fqn: &str,
    field: &FieldDescriptorProto,
    is_proto3: bool,
    depth: usize,
    map_entry: Option<&DescriptorProto>,
) -> Result<TokenStream, Error> {
    let name = field.name.as_deref().unwrap_or_default();
    let field_ident = format_ident!("{}", to_rust_field_name(name));
    let doc = format!(" Field number {}.", field.number.unwrap_or_default());

    let full_type = match map_entry {
        Some(entry) => {
            let (key, value) = map_key_value(entry, file)?;
            let key = base_rust_type(ctx, file, key, depth)?;
            let value = base_rust_type(ctx, file, value, depth)?;
            quote!(::std::collections::HashMap<#key, #value>)
        }
        None => {
            let rust_type = RustType::new(
                base_rust_type(ctx, file, field, depth)?,
                cardinality(field, is_proto3),
                ctx.is_recursive_field(parent_fqn, name),
            );
            build_full_type(&rust_type)
        }
    };

    Ok(quote! {
        #[doc = #doc]
        pub #field_ident: #full_type,
    })
}

fn map_key_value<'e>(
    entry: &'e DescriptorProto,
    file: &str,
) -> Result<(&'e FieldDescriptorProto, &'e FieldDescriptorProto), Error> {
    let by_number = |n: i32| entry.field.iter().find(|f| f.number == Some(n));
    match (by_number(1), by_number(2)) {
        (Some(key), Some(value)) => Ok((key, value)),
        _ => Err(Error::InvalidDescriptor(format!(
            "map entry '{}' in '{}' lacks key or value",
            entry.name.as_deref().unwrap_or(""),
            file
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{Cardinality, Registry, ScalarType};
    use crate::descriptor::{FileDescriptorProto, FileDescriptorSet, Label, Type};

    fn scalar(name: &str, number: i32, proto_type: Type) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.into()),
            number: Some(number),
            label: Some(Label::Optional as i32),
            r#type: Some(proto_type as i32),
            ..Default::default()
        }
    }

    fn empty_set() -> FileDescriptorSet {
        FileDescriptorSet {
            file: vec![FileDescriptorProto {
                name: Some("f.proto".into()),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn test_build_field_with_default() {
        let set = empty_set();
        let loaded = Registry::new();
        let ctx = GenerationContext::new(&set, &loaded);

        let mut field = scalar("retries", 3, Type::Uint32);
        field.default_value = Some("5".into());
        let def = build_field(&ctx, "f.proto", &field, false).unwrap();

        assert_eq!(def.number, 3);
        assert_eq!(def.kind, FieldKind::Scalar(ScalarType::Uint32));
        assert_eq!(def.cardinality, Cardinality::Optional);
        assert_eq!(def.default, Some(Value::U32(5)));
    }

    #[test]
    fn test_build_field_rejects_bad_input() {
        let set = empty_set();
        let loaded = Registry::new();
        let ctx = GenerationContext::new(&set, &loaded);

        let mut bad_default = scalar("flag", 1, Type::Bool);
        bad_default.default_value = Some("maybe".into());
        assert!(matches!(
            build_field(&ctx, "f.proto", &bad_default, false),
            Err(Error::InvalidDescriptor(_))
        ));

        assert!(matches!(
            build_field(&ctx, "f.proto", &scalar("zero", 0, Type::Bool), false),
            Err(Error::InvalidDescriptor(_))
        ));

        let mut dangling = scalar("other", 2, Type::Message);
        dangling.type_name = Some(".nowhere.Thing".into());
        assert!(matches!(
            build_field(&ctx, "f.proto", &dangling, false),
            Err(Error::UnresolvedType { .. })
        ));
    }

    #[test]
    fn test_generate_keyword_field() {
        let set = empty_set();
        let loaded = Registry::new();
        let ctx = GenerationContext::new(&set, &loaded);

        let tokens =
            generate_field(&ctx, "f.proto", ".Msg", &scalar("type", 1, Type::String), true, 1, None)
                .unwrap()
                .to_string();
        assert!(tokens.contains("r#type"));
        assert!(tokens.contains("String"));
        assert!(!tokens.contains("Option"));
    }
}
