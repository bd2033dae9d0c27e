//! Message tables and rendered message structs.

use std::collections::HashMap;
use std::sync::Arc;

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::binding::{Binding, MessageType};
use crate::context::{to_rust_field_name, to_rust_type_name, GenerationContext};
use crate::descriptor::{DescriptorProto, FieldDescriptorProto};
use crate::Error;

use super::enumeration::{generate_enum, variant_name};
use super::field::{build_field, generate_field};
use super::types::base_rust_type;

/// Add the table for `message`, its nested messages and its nested enums to
/// `binding`. `prefix` ends with a dot, e.g. `.pkg.` or `.pkg.Outer.`.
pub fn build_message(
    ctx: &GenerationContext,
    file: &str,
    is_proto3: bool,
    prefix: &str,
    message: &DescriptorProto,
    binding: &mut Binding,
) -> Result<(), Error> {
    let name = message
        .name
        .as_deref()
        .ok_or_else(|| Error::InvalidDescriptor(format!("unnamed message in '{}'", file)))?;
    let fqn = format!("{}{}", prefix, name);

    // Synthetic proto3 oneofs are dropped, so indices are renumbered.
    let real_oneofs = real_oneof_indices(message);
    let mut fields = Vec::with_capacity(message.field.len());
    for field in &message.field {
        let mut def = build_field(ctx, file, field, is_proto3)?;
        def.oneof = def
            .oneof
            .and_then(|i| real_oneofs.iter().position(|real| *real == i));
        fields.push(def);
    }
    let oneofs = real_oneofs
        .iter()
        .map(|i| {
            message.oneof_decl[*i].name.clone().ok_or_else(|| {
                Error::InvalidDescriptor(format!("unnamed oneof in '{}'", fqn))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let nested_prefix = format!("{}.", fqn);
    for enum_type in &message.enum_type {
        push_enum(ctx, &nested_prefix, enum_type.name.as_deref(), binding);
    }
    for nested in &message.nested_type {
        build_message(ctx, file, is_proto3, &nested_prefix, nested, binding)?;
    }

    binding.messages.push(Arc::new(MessageType {
        full_name: fqn.trim_start_matches('.').to_string(),
        name: name.to_string(),
        package: binding.package.clone(),
        file: file.to_string(),
        fields,
        oneofs,
        is_map_entry: message.is_map_entry(),
    }));
    Ok(())
}

/// Add an enum table the context already built.
pub fn push_enum(ctx: &GenerationContext, prefix: &str, name: Option<&str>, binding: &mut Binding) {
    let Some(name) = name else {
        return;
    };
    if let Some(enum_type) = ctx.enums.get(&format!("{}{}", prefix, name)) {
        binding.enums.push(Arc::clone(enum_type));
    }
}

/// Declaration indices of oneofs that have at least one real member.
fn real_oneof_indices(message: &DescriptorProto) -> Vec<usize> {
    let mut indices: Vec<usize> = message
        .field
        .iter()
        .filter_map(FieldDescriptorProto::real_oneof)
        .filter(|i| *i < message.oneof_decl.len())
        .collect();
    indices.sort_unstable();
    indices.dedup();
    indices
}

/// Render `message` as a struct, with nested types, oneof enums and the
/// message's enums in a snake_case module named after it.
pub fn generate_message(
    ctx: &GenerationContext,
    file: &str,
    is_proto3: bool,
    prefix: &str,
    message: &DescriptorProto,
    depth: usize,
) -> Result<TokenStream, Error> {
    let name = message
        .name
        .as_deref()
        .ok_or_else(|| Error::InvalidDescriptor(format!("unnamed message in '{}'", file)))?;
    let fqn = format!("{}{}", prefix, name);
    let nested_prefix = format!("{}.", fqn);
    let struct_ident = format_ident!("{}", to_rust_type_name(name));
    let mod_ident = format_ident!("{}", to_rust_field_name(name));

    let map_entries: HashMap<String, &DescriptorProto> = message
        .nested_type
        .iter()
        .filter(|m| m.is_map_entry())
        .filter_map(|m| Some((format!("{}{}", nested_prefix, m.name.as_deref()?), m)))
        .collect();

    let mut fields = Vec::new();
    for field in message.field.iter().filter(|f| f.real_oneof().is_none()) {
        let map_entry = field
            .type_name
            .as_deref()
            .and_then(|t| map_entries.get(t))
            .copied();
        fields.push(generate_field(ctx, file, &fqn, field, is_proto3, depth, map_entry)?);
    }

    let mut nested = TokenStream::new();
    for index in real_oneof_indices(message) {
        let oneof_name = message.oneof_decl[index].name.as_deref().unwrap_or_default();
        let enum_ident = format_ident!("{}", variant_name(oneof_name));
        let field_ident = format_ident!("{}", to_rust_field_name(oneof_name));
        let members: Vec<_> = message
            .field
            .iter()
            .filter(|f| f.real_oneof() == Some(index))
            .collect();
        nested.extend(generate_oneof(ctx, file, &fqn, &enum_ident, &members, depth + 1)?);
        fields.push(quote! {
            pub #field_ident: ::std::option::Option<#mod_ident::#enum_ident>,
        });
    }
    for enum_type in &message.enum_type {
        nested.extend(generate_enum(file, enum_type)?);
    }
    for nested_message in message.nested_type.iter().filter(|m| !m.is_map_entry()) {
        nested.extend(generate_message(
            ctx,
            file,
            is_proto3,
            &nested_prefix,
            nested_message,
            depth + 1,
        )?);
    }

    let nested_mod = if nested.is_empty() {
        quote!()
    } else {
        quote! {
            pub mod #mod_ident {
                #nested
            }
        }
    };
    let full_name = fqn.trim_start_matches('.');

    Ok(quote! {
        #[derive(Debug, Clone, PartialEq, Default)]
        pub struct #struct_ident {
            #(#fields)*
        }

        impl #struct_ident {
            /// Fully-qualified protobuf name of this message.
            pub const FULL_NAME: &'static str = #full_name;
        }

        #nested_mod
    })
}

/// Render a oneof as an enum with one variant per member.
fn generate_oneof(
    ctx: &GenerationContext,
    file: &str,
    parent_fqn: &str,
    enum_ident: &proc_macro2::Ident,
    members: &[&FieldDescriptorProto],
    depth: usize,
) -> Result<TokenStream, Error> {
    let mut variants = Vec::with_capacity(members.len());
    for member in members {
        let member_name = member.name.as_deref().unwrap_or_default();
        let variant = format_ident!("{}", variant_name(member_name));
        let base = base_rust_type(ctx, file, member, depth)?;
        let ty = if ctx.is_recursive_field(parent_fqn, member_name) {
            quote!(::std::boxed::Box<#base>)
        } else {
            base
        };
        variants.push(quote!(#variant(#ty)));
    }

    Ok(quote! {
        #[derive(Debug, Clone, PartialEq)]
        pub enum #enum_ident {
            #(#variants),*
        }
    })
}
