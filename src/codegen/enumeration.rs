//! Rendered Rust enums.

use std::collections::HashMap;

use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote};

use crate::context::to_rust_type_name;
use crate::descriptor::EnumDescriptorProto;
use crate::Error;

/// Render a proto enum as a `#[repr(i32)]` Rust enum.
///
/// Values that reuse an earlier number (`allow_alias`) become associated
/// constants pointing at the first variant with that number.
pub fn generate_enum(file: &str, enum_type: &EnumDescriptorProto) -> Result<TokenStream, Error> {
    let name = enum_type
        .name
        .as_deref()
        .ok_or_else(|| Error::InvalidDescriptor(format!("unnamed enum in '{}'", file)))?;
    let enum_ident = format_ident!("{}", to_rust_type_name(name));

    let mut variants = Vec::new();
    let mut from_arms = Vec::new();
    let mut aliases = Vec::new();
    let mut first_by_number: HashMap<i32, proc_macro2::Ident> = HashMap::new();

    for value in &enum_type.value {
        let (Some(value_name), Some(number)) = (&value.name, value.number) else {
            return Err(Error::InvalidDescriptor(format!(
                "enum '{}' in '{}' has an incomplete value",
                name, file
            )));
        };
        let ident = format_ident!("{}", variant_name(value_name));
        let number_lit = number_tokens(number);

        match first_by_number.get(&number) {
            Some(canonical) => aliases.push(quote! {
                pub const #ident: Self = Self::#canonical;
            }),
            None => {
                variants.push(quote!(#ident = #number_lit));
                from_arms.push(quote!(#number_lit => ::std::option::Option::Some(Self::#ident)));
                first_by_number.insert(number, ident);
            }
        }
    }

    // proto3 requires the first value to be zero; proto2 defaults to the first.
    let default_ident = enum_type
        .value
        .first()
        .and_then(|v| v.number)
        .and_then(|n| first_by_number.get(&n))
        .ok_or_else(|| {
            Error::InvalidDescriptor(format!("enum '{}' in '{}' has no values", name, file))
        })?;

    Ok(quote! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        pub enum #enum_ident {
            #(#variants),*
        }

        #[allow(non_upper_case_globals)]
        impl #enum_ident {
            #(#aliases)*

            /// The variant with this number, if any.
            pub fn from_i32(value: i32) -> ::std::option::Option<Self> {
                match value {
                    #(#from_arms,)*
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl ::std::convert::From<#enum_ident> for i32 {
            fn from(value: #enum_ident) -> Self {
                value as i32
            }
        }

        impl ::std::default::Default for #enum_ident {
            fn default() -> Self {
                Self::#default_ident
            }
        }
    })
}

fn number_tokens(number: i32) -> TokenStream {
    let magnitude = Literal::i64_unsuffixed(i64::from(number).abs());
    if number < 0 {
        quote!(-#magnitude)
    } else {
        quote!(#magnitude)
    }
}

/// Identifier for an enum value, oneof enum or oneof member. protoc accepts
/// names like `_1`, whose PascalCase form starts with a digit; those keep a
/// leading underscore.
pub fn variant_name(name: &str) -> String {
    let pascal = to_pascal_case(name);
    if pascal.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", pascal)
    } else {
        to_rust_type_name(&pascal)
    }
}

/// SCREAMING_SNAKE_CASE to PascalCase.
pub fn to_pascal_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for word in s.split('_').filter(|w| !w.is_empty()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.extend(chars.flat_map(char::to_lowercase));
        }
    }
    if out.is_empty() {
        out.push_str("Value");
    }
    out
}
