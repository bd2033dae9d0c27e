//! Detection of message fields that close a reference cycle.
//!
//! A message that reaches itself through singular message fields, e.g.
//! `message Node { Node next = 1; }` or `A -> B -> A`, has no finite size
//! as a plain Rust struct. The rendered source boxes the fields found here.
//! The type tables never need this: field kinds refer to messages by name.

use std::collections::{HashMap, HashSet};

use crate::descriptor::{DescriptorProto, FileDescriptorSet, Label, Type};

/// A field whose type leads back to the message that declares it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecursiveField {
    /// Fully-qualified name of the declaring message, with leading dot.
    pub message_fqn: String,
    pub field_name: String,
}

/// message fqn -> [(field name, referenced message fqn)]
type Graph = HashMap<String, Vec<(String, String)>>;

/// Find every field that needs boxing in the rendered source.
pub fn find_recursive_fields(set: &FileDescriptorSet) -> HashSet<RecursiveField> {
    let mut graph = Graph::new();
    for file in &set.file {
        let prefix = file.type_prefix();
        for message in &file.message_type {
            collect_edges(&mut graph, &prefix, message);
        }
    }

    let mut found = HashSet::new();
    for start in graph.keys() {
        let mut path = HashSet::from([start.as_str()]);
        walk(&graph, start, start, &mut path, &mut found);
    }
    found
}

fn collect_edges(graph: &mut Graph, prefix: &str, message: &DescriptorProto) {
    let Some(name) = &message.name else {
        return;
    };
    let fqn = format!("{}{}", prefix, name);

    // Repeated fields already live behind a heap allocation.
    let edges = message
        .field
        .iter()
        .filter(|f| matches!(f.field_type(), Some(Type::Message | Type::Group)))
        .filter(|f| f.label() != Label::Repeated)
        .filter_map(|f| Some((f.name.clone()?, f.type_name.clone()?)))
        .collect();
    graph.insert(fqn.clone(), edges);

    let nested_prefix = format!("{}.", fqn);
    for nested in message.nested_type.iter().filter(|m| !m.is_map_entry()) {
        collect_edges(graph, &nested_prefix, nested);
    }
}

fn walk<'g>(
    graph: &'g Graph,
    current: &str,
    target: &str,
    path: &mut HashSet<&'g str>,
    found: &mut HashSet<RecursiveField>,
) {
    let Some(edges) = graph.get(current) else {
        return;
    };

    for (field_name, referenced) in edges {
        if referenced == target {
            found.insert(RecursiveField {
                message_fqn: current.to_string(),
                field_name: field_name.clone(),
            });
            continue;
        }
        if !path.insert(referenced.as_str()) {
            continue;
        }
        walk(graph, referenced, target, path, found);
        path.remove(referenced.as_str());
    }
}
