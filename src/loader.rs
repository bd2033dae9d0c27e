//! Activation of generated bindings.

use crate::binding::{Binding, Registry};
use crate::codegen::build_set;
use crate::context::GenerationContext;
use crate::descriptor::FileDescriptorSet;
use crate::Error;

/// What a load made available.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Schema files activated, in descriptor-set order.
    pub files: Vec<String>,
    /// Fully-qualified names of the activated message types.
    pub messages: Vec<String>,
    /// Fully-qualified names of the activated enum types.
    pub enums: Vec<String>,
}

impl LoadReport {
    /// Whether the load made this message or enum available.
    pub fn contains(&self, type_name: &str) -> bool {
        let type_name = type_name.trim_start_matches('.');
        self.messages.iter().chain(&self.enums).any(|n| n == type_name)
    }
}

/// Build every binding of `set` and activate them in `registry`.
///
/// Only the type tables are built; no source is rendered. The whole set is
/// built before anything is activated, so a failure in any file leaves the
/// registry untouched.
pub fn load_set(set: &FileDescriptorSet, registry: &Registry) -> Result<LoadReport, Error> {
    let ctx = GenerationContext::new(set, registry);
    let bindings = build_set(&ctx)?;
    Ok(activate(registry, bindings))
}

/// Activate already built bindings under one registry write.
pub fn activate(registry: &Registry, bindings: Vec<Binding>) -> LoadReport {
    let mut report = LoadReport::default();
    for binding in &bindings {
        report.files.push(binding.file.clone());
        report
            .messages
            .extend(binding.messages.iter().map(|m| m.full_name.clone()));
        report
            .enums
            .extend(binding.enums.iter().map(|e| e.full_name.clone()));
    }

    registry.load_all(bindings);
    tracing::debug!(
        files = report.files.len(),
        messages = report.messages.len(),
        enums = report.enums.len(),
        "loaded descriptor set"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Value;
    use crate::descriptor::{
        DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
        FileDescriptorProto, Label, Type,
    };

    fn file(name: &str, dependency: Vec<String>, message: &str) -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some(name.into()),
            package: Some("chain".into()),
            dependency,
            message_type: vec![DescriptorProto {
                name: Some(message.into()),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_load_set_reports_types() {
        let set = FileDescriptorSet {
            file: vec![
                file("a.proto", vec![], "A"),
                file("b.proto", vec!["a.proto".into()], "B"),
            ],
        };
        let registry = Registry::new();
        let report = load_set(&set, &registry).unwrap();

        assert_eq!(report.files, vec!["a.proto", "b.proto"]);
        assert!(report.contains(".chain.B"));
        assert!(registry.new_message("chain.A").is_ok());
    }

    #[test]
    fn test_failed_set_activates_nothing() {
        let set = FileDescriptorSet {
            file: vec![
                file("a.proto", vec![], "A"),
                file("b.proto", vec!["missing.proto".into()], "B"),
            ],
        };
        let registry = Registry::new();
        assert!(matches!(
            load_set(&set, &registry),
            Err(Error::UnresolvedDependency { .. })
        ));
        assert!(!registry.contains_file("a.proto"));
        assert!(registry.message("chain.A").is_none());
    }

    #[test]
    fn test_load_group_and_digit_leading_enum() {
        let version = EnumDescriptorProto {
            name: Some("Version".into()),
            value: ["_1", "_2X"]
                .iter()
                .zip(0..)
                .map(|(name, number)| EnumValueDescriptorProto {
                    name: Some(name.to_string()),
                    number: Some(number),
                })
                .collect(),
        };
        let search = DescriptorProto {
            name: Some("Search".into()),
            field: vec![
                FieldDescriptorProto {
                    name: Some("result".into()),
                    number: Some(1),
                    label: Some(Label::Repeated as i32),
                    r#type: Some(Type::Group as i32),
                    type_name: Some(".g.Search.Result".into()),
                    ..Default::default()
                },
                FieldDescriptorProto {
                    name: Some("version".into()),
                    number: Some(2),
                    label: Some(Label::Optional as i32),
                    r#type: Some(Type::Enum as i32),
                    type_name: Some(".g.Version".into()),
                    ..Default::default()
                },
            ],
            nested_type: vec![DescriptorProto {
                name: Some("Result".into()),
                field: vec![FieldDescriptorProto {
                    name: Some("url".into()),
                    number: Some(2),
                    label: Some(Label::Optional as i32),
                    r#type: Some(Type::String as i32),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        let set = FileDescriptorSet {
            file: vec![FileDescriptorProto {
                name: Some("g.proto".into()),
                package: Some("g".into()),
                message_type: vec![search],
                enum_type: vec![version],
                ..Default::default()
            }],
        };
        let registry = Registry::new();
        let report = load_set(&set, &registry).unwrap();
        assert!(report.contains("g.Search.Result"));
        assert!(report.contains("g.Version"));

        let mut result = registry.new_message("g.Search.Result").unwrap();
        result.set("url", "https://example.com").unwrap();
        let mut search = registry.new_message("g.Search").unwrap();
        search.push("result", result).unwrap();
        search.set_enum_by_name("version", "_2X").unwrap();

        let results = search.get("result").unwrap().and_then(Value::as_list).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(search.get("version").unwrap().and_then(Value::as_enum), Some(1));
        assert!(search.push("result", "not a message").is_err());
    }
}
