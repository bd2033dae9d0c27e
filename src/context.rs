//! Generation context for type resolution across one descriptor set.

use std::cell::OnceCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::binding::{EnumType, EnumValue, Registry};
use crate::codegen::{find_recursive_fields, RecursiveField};
use crate::descriptor::{DescriptorProto, EnumDescriptorProto, FileDescriptorSet};
use crate::Error;

/// Whether a registered name is a message or an enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Message,
    Enum,
}

/// Information about a type in the registry.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub kind: TypeKind,
    /// Package of the defining file.
    pub package: String,
    /// The Rust module the file's types are rendered into.
    pub rust_module: String,
}

/// Context for generating the bindings of one descriptor set.
pub struct GenerationContext<'a> {
    /// The set being generated.
    pub set: &'a FileDescriptorSet,
    /// Bindings activated by earlier loads; consulted for anything the set
    /// itself does not define.
    pub loaded: &'a Registry,
    /// Map from fully-qualified proto type name -> type info.
    pub type_registry: HashMap<String, TypeInfo>,
    /// Enum tables built from the set, keyed by fully-qualified name.
    pub enums: HashMap<String, Arc<EnumType>>,
    /// Fields that need to be boxed due to recursive type cycles. Only
    /// rendered source needs them, so they are found on first use.
    recursive_fields: OnceCell<HashSet<RecursiveField>>,
    /// Render source without prettyplease.
    pub skip_format: bool,
}

impl<'a> GenerationContext<'a> {
    /// Create a new generation context.
    pub fn new(set: &'a FileDescriptorSet, loaded: &'a Registry) -> Self {
        let mut type_registry = HashMap::new();
        let mut enums = HashMap::new();

        for file in &set.file {
            let file_name = file.name.clone().unwrap_or_default();
            let rust_module = file_module_name(file.package(), &file_name);
            let prefix = file.type_prefix();

            for message in &file.message_type {
                register_message(
                    &mut type_registry,
                    &mut enums,
                    &file_name,
                    file.package(),
                    &rust_module,
                    &prefix,
                    message,
                );
            }

            for enum_type in &file.enum_type {
                register_enum(
                    &mut type_registry,
                    &mut enums,
                    &file_name,
                    file.package(),
                    &rust_module,
                    &prefix,
                    enum_type,
                );
            }
        }

        Self {
            set,
            loaded,
            type_registry,
            enums,
            recursive_fields: OnceCell::new(),
            skip_format: false,
        }
    }

    /// Check that every import of `file` is satisfiable.
    pub fn check_dependencies(&self, file: &str, dependencies: &[String]) -> Result<(), Error> {
        for dependency in dependencies {
            let in_set = self.set.file_by_name(dependency).is_some();
            if !in_set && !self.loaded.contains_file(dependency) {
                return Err(Error::UnresolvedDependency {
                    file: file.to_string(),
                    dependency: dependency.clone(),
                });
            }
        }
        Ok(())
    }

    /// Kind of a fully-qualified type name, from the set or earlier loads.
    pub fn type_kind(&self, proto_type_name: &str) -> Option<TypeKind> {
        if let Some(info) = self.type_registry.get(proto_type_name) {
            return Some(info.kind);
        }
        if self.loaded.message(proto_type_name).is_some() {
            Some(TypeKind::Message)
        } else if self.loaded.enumeration(proto_type_name).is_some() {
            Some(TypeKind::Enum)
        } else {
            None
        }
    }

    /// Resolve an enum table, from the set or earlier loads.
    pub fn resolve_enum(&self, proto_type_name: &str) -> Option<Arc<EnumType>> {
        self.enums
            .get(proto_type_name)
            .cloned()
            .or_else(|| self.loaded.enumeration(proto_type_name))
    }

    /// Check if a field needs to be boxed due to recursive type cycles.
    pub fn is_recursive_field(&self, message_fqn: &str, field_name: &str) -> bool {
        let recursive_fields = self
            .recursive_fields
            .get_or_init(|| find_recursive_fields(self.set));
        recursive_fields.contains(&RecursiveField {
            message_fqn: message_fqn.to_string(),
            field_name: field_name.to_string(),
        })
    }

    /// Resolve a proto type name to a Rust path, relative to a module nested
    /// `depth` levels below the root that all rendered files share.
    pub fn resolve_rust_path(&self, proto_type_name: &str, depth: usize) -> Option<String> {
        let (package, rust_module) = match self.type_registry.get(proto_type_name) {
            Some(info) => (info.package.clone(), info.rust_module.clone()),
            None => {
                let (package, file) = self
                    .loaded
                    .message(proto_type_name)
                    .map(|m| (m.package.clone(), m.file.clone()))
                    .or_else(|| {
                        self.loaded
                            .enumeration(proto_type_name)
                            .map(|e| (e.package.clone(), e.file.clone()))
                    })?;
                let rust_module = file_module_name(&package, &file);
                (package, rust_module)
            }
        };

        let type_path = proto_path_to_rust_type(proto_type_name, &package);
        Some(format!("{}{}::{}", "super::".repeat(depth), rust_module, type_path))
    }
}

/// Register a message and its nested types in the registry.
fn register_message(
    registry: &mut HashMap<String, TypeInfo>,
    enums: &mut HashMap<String, Arc<EnumType>>,
    file_name: &str,
    package: &str,
    rust_module: &str,
    prefix: &str,
    message: &DescriptorProto,
) {
    let Some(name) = &message.name else {
        return;
    };
    // prefix is like "." or ".package." or ".Parent."
    let full_name = format!("{}{}", prefix, name);

    registry.insert(
        full_name.clone(),
        TypeInfo {
            kind: TypeKind::Message,
            package: package.to_string(),
            rust_module: rust_module.to_string(),
        },
    );

    let nested_prefix = format!("{}.", full_name);

    for nested in &message.nested_type {
        register_message(registry, enums, file_name, package, rust_module, &nested_prefix, nested);
    }

    for enum_type in &message.enum_type {
        register_enum(registry, enums, file_name, package, rust_module, &nested_prefix, enum_type);
    }
}

/// Register an enum and build its value table.
fn register_enum(
    registry: &mut HashMap<String, TypeInfo>,
    enums: &mut HashMap<String, Arc<EnumType>>,
    file_name: &str,
    package: &str,
    rust_module: &str,
    prefix: &str,
    enum_type: &EnumDescriptorProto,
) {
    let Some(name) = &enum_type.name else {
        return;
    };
    let full_name = format!("{}{}", prefix, name);

    let values = enum_type
        .value
        .iter()
        .filter_map(|v| {
            Some(EnumValue {
                name: v.name.clone()?,
                number: v.number?,
            })
        })
        .collect();
    enums.insert(
        full_name.clone(),
        Arc::new(EnumType {
            full_name: full_name.trim_start_matches('.').to_string(),
            name: name.clone(),
            package: package.to_string(),
            file: file_name.to_string(),
            values,
        }),
    );

    registry.insert(
        full_name,
        TypeInfo {
            kind: TypeKind::Enum,
            package: package.to_string(),
            rust_module: rust_module.to_string(),
        },
    );
}

/// Name of the Rust module a file's types are rendered into: the package
/// with dots replaced, or the file stem when there is no package.
pub fn file_module_name(package: &str, file_name: &str) -> String {
    if !package.is_empty() {
        return package.replace('.', "_");
    }
    let stem = std::path::Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");
    to_rust_field_name(&stem.replace(['-', '.'], "_"))
}

/// Convert proto fully-qualified type name to Rust type path within its
/// package module.
///
/// Examples:
/// - ".mypackage.MyMessage.NestedMessage" (package "mypackage") -> "my_message::NestedMessage"
/// - ".com.example.MyMessage" (package "com.example") -> "MyMessage"
pub fn proto_path_to_rust_type(proto_path: &str, package: &str) -> String {
    let components: Vec<&str> = proto_path.trim_start_matches('.').split('.').collect();

    let package_depth = if package.is_empty() {
        0
    } else {
        package.split('.').count()
    };

    let type_components: Vec<&str> = components.into_iter().skip(package_depth).collect();

    let Some((last, parents)) = type_components.split_last() else {
        // Fallback: use the last component of the proto_path
        return proto_path
            .rsplit('.')
            .next()
            .map(to_rust_type_name)
            .unwrap_or_default();
    };

    // Nested types live in a snake_case module named after each parent.
    let mut path: Vec<String> = parents.iter().map(|p| to_rust_field_name(p)).collect();
    path.push(to_rust_type_name(last));
    path.join("::")
}

/// Convert proto name to valid Rust type identifier (PascalCase).
pub fn to_rust_type_name(name: &str) -> String {
    escape_keyword(name.to_string())
}

/// Convert proto field name to Rust field name (snake_case).
pub fn to_rust_field_name(name: &str) -> String {
    escape_keyword(to_snake_case(name))
}

fn escape_keyword(ident: String) -> String {
    match ident.as_str() {
        // These cannot be raw identifiers.
        "self" | "Self" | "super" | "crate" => format!("{}_", ident),
        _ if is_rust_keyword(&ident) => format!("r#{}", ident),
        _ => ident,
    }
}

/// Convert a string to snake_case.
///
/// Handles consecutive uppercase letters correctly:
/// - "HTTPServer" -> "http_server"
/// - "myField" -> "my_field"
/// - "XMLParser" -> "xml_parser"
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev_lower = chars[i - 1].is_lowercase();
                let prev_upper = chars[i - 1].is_uppercase();
                let next_lower = chars.get(i + 1).map(|c| c.is_lowercase()).unwrap_or(false);
                if prev_lower || (prev_upper && next_lower) {
                    result.push('_');
                }
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

/// Check if a string is a Rust keyword.
fn is_rust_keyword(s: &str) -> bool {
    matches!(
        s,
        "as" | "break"
            | "const"
            | "continue"
            | "crate"
            | "else"
            | "enum"
            | "extern"
            | "false"
            | "fn"
            | "for"
            | "if"
            | "impl"
            | "in"
            | "let"
            | "loop"
            | "match"
            | "mod"
            | "move"
            | "mut"
            | "pub"
            | "ref"
            | "return"
            | "self"
            | "Self"
            | "static"
            | "struct"
            | "super"
            | "trait"
            | "true"
            | "type"
            | "unsafe"
            | "use"
            | "where"
            | "while"
            | "async"
            | "await"
            | "dyn"
            | "abstract"
            | "become"
            | "box"
            | "do"
            | "final"
            | "macro"
            | "override"
            | "priv"
            | "typeof"
            | "unsized"
            | "virtual"
            | "yield"
            | "try"
    )
}
