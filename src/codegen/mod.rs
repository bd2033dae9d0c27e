//! Binding generation from protobuf descriptors.
//!
//! Every file yields a [`Binding`], the type table that gets activated in a
//! [`Registry`](crate::Registry). [`generate_binding`] also renders the
//! equivalent Rust source for callers that want static types.

mod enumeration;
mod field;
mod message;
mod module;
mod recursion;
mod types;

pub use module::write_modules;
pub use recursion::{find_recursive_fields, RecursiveField};

use proc_macro2::TokenStream;

use crate::binding::Binding;
use crate::context::{file_module_name, GenerationContext};
use crate::descriptor::FileDescriptorProto;
use crate::Error;

/// The output of generating one schema file.
#[derive(Debug, Clone)]
pub struct GeneratedBinding {
    /// Type table for activation.
    pub binding: Binding,
    /// Rust module the source belongs in; files sharing a package share it.
    pub module: String,
    /// Rust source for the file's types.
    pub source: String,
}

/// Build the type table for one file of the context's descriptor set.
///
/// Fails with [`Error::UnresolvedDependency`] when an import is neither in
/// the set nor already loaded, and with [`Error::UnresolvedType`] when a
/// field references a type that cannot be found.
pub fn build_binding(
    ctx: &GenerationContext,
    file: &FileDescriptorProto,
) -> Result<Binding, Error> {
    let file_name = file_name(file)?;
    ctx.check_dependencies(file_name, &file.dependency)?;

    let prefix = file.type_prefix();
    let is_proto3 = file.is_proto3();
    let mut binding = Binding {
        file: file_name.to_string(),
        package: file.package().to_string(),
        dependencies: file.dependency.clone(),
        ..Default::default()
    };
    for enum_type in &file.enum_type {
        message::push_enum(ctx, &prefix, enum_type.name.as_deref(), &mut binding);
    }
    for msg in &file.message_type {
        message::build_message(ctx, file_name, is_proto3, &prefix, msg, &mut binding)?;
    }

    tracing::debug!(
        file = %file_name,
        messages = binding.messages.len(),
        enums = binding.enums.len(),
        "built binding"
    );
    Ok(binding)
}

/// Build the type table for one file and render its Rust source.
pub fn generate_binding(
    ctx: &GenerationContext,
    file: &FileDescriptorProto,
) -> Result<GeneratedBinding, Error> {
    let binding = build_binding(ctx, file)?;
    let file_name = file_name(file)?;
    let prefix = file.type_prefix();
    let is_proto3 = file.is_proto3();

    let mut tokens = TokenStream::new();
    for enum_type in &file.enum_type {
        tokens.extend(enumeration::generate_enum(file_name, enum_type)?);
    }
    for msg in &file.message_type {
        // Top-level items sit one module below the shared root.
        tokens.extend(message::generate_message(ctx, file_name, is_proto3, &prefix, msg, 1)?);
    }
    let source = render(tokens, ctx.skip_format)?;

    Ok(GeneratedBinding {
        module: file_module_name(file.package(), file_name),
        binding,
        source,
    })
}

/// Type tables for every file in the context's set, in set order. The first
/// failure aborts the whole set.
pub fn build_set(ctx: &GenerationContext) -> Result<Vec<Binding>, Error> {
    ctx.set
        .file
        .iter()
        .map(|file| build_binding(ctx, file))
        .collect()
}

/// Like [`build_set`], with the rendered source of every file.
pub fn generate_set(ctx: &GenerationContext) -> Result<Vec<GeneratedBinding>, Error> {
    ctx.set
        .file
        .iter()
        .map(|file| generate_binding(ctx, file))
        .collect()
}

fn file_name(file: &FileDescriptorProto) -> Result<&str, Error> {
    file.name
        .as_deref()
        .ok_or_else(|| Error::InvalidDescriptor("file descriptor without a name".into()))
}

/// Parse rendered tokens as a Rust file and pretty-print them.
fn render(tokens: TokenStream, skip_format: bool) -> Result<String, Error> {
    if skip_format {
        syn::parse2::<syn::File>(tokens.clone()).map_err(|e| Error::SynParse(e.to_string()))?;
        return Ok(tokens.to_string());
    }
    let file: syn::File = syn::parse2(tokens).map_err(|e| Error::SynParse(e.to_string()))?;
    Ok(prettyplease::unparse(&file))
}
