//! Registry of activated bindings.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use super::message::DynamicMessage;
use super::schema::{Binding, EnumType, MessageType};
use crate::Error;

static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();

#[derive(Debug, Default)]
struct Tables {
    messages: HashMap<String, Arc<MessageType>>,
    enums: HashMap<String, Arc<EnumType>>,
    files: HashSet<String>,
}

/// Types made available by loading bindings.
///
/// Loading a type whose fully-qualified name is already registered replaces
/// the earlier definition; a differing redefinition is logged. Each
/// [`Registry::load_all`] call is applied under one write lock, so readers see
/// either none or all of its types.
#[derive(Debug, Default)]
pub struct Registry {
    tables: RwLock<Tables>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used unless a caller supplies its own.
    pub fn global() -> Arc<Registry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Registry::new())))
    }

    /// Activate a single binding.
    pub fn load(&self, binding: Binding) {
        self.load_all(std::iter::once(binding));
    }

    /// Activate several bindings atomically, in order.
    pub fn load_all(&self, bindings: impl IntoIterator<Item = Binding>) {
        let mut tables = self.tables.write();
        for binding in bindings {
            for message in binding.messages {
                let previous = tables.messages.get(&message.full_name);
                if previous.is_some_and(|previous| **previous != *message) {
                    tracing::warn!(
                        type_name = %message.full_name,
                        file = %binding.file,
                        "replacing previously loaded message type"
                    );
                }
                tables.messages.insert(message.full_name.clone(), message);
            }
            for enum_type in binding.enums {
                let previous = tables.enums.get(&enum_type.full_name);
                if previous.is_some_and(|previous| **previous != *enum_type) {
                    tracing::warn!(
                        type_name = %enum_type.full_name,
                        file = %binding.file,
                        "replacing previously loaded enum type"
                    );
                }
                tables.enums.insert(enum_type.full_name.clone(), enum_type);
            }
            tracing::debug!(file = %binding.file, "activated binding");
            tables.files.insert(binding.file);
        }
    }

    /// Look up a message type. A leading `.` is accepted.
    pub fn message(&self, name: &str) -> Option<Arc<MessageType>> {
        self.tables
            .read()
            .messages
            .get(name.trim_start_matches('.'))
            .cloned()
    }

    /// Look up an enum type. A leading `.` is accepted.
    pub fn enumeration(&self, name: &str) -> Option<Arc<EnumType>> {
        self.tables
            .read()
            .enums
            .get(name.trim_start_matches('.'))
            .cloned()
    }

    /// Create an empty instance of a loaded message type.
    pub fn new_message(&self, name: &str) -> Result<DynamicMessage, Error> {
        self.message(name)
            .map(DynamicMessage::new)
            .ok_or_else(|| Error::UnknownMessage(name.to_string()))
    }

    /// Whether a binding for this schema file has been loaded.
    pub fn contains_file(&self, file: &str) -> bool {
        self.tables.read().files.contains(file)
    }

    /// Whether a message or enum with this name is loaded.
    pub fn contains_type(&self, name: &str) -> bool {
        let name = name.trim_start_matches('.');
        let tables = self.tables.read();
        tables.messages.contains_key(name) || tables.enums.contains_key(name)
    }

    /// Names of all loaded message types, sorted.
    pub fn message_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.tables.read().messages.keys().cloned().collect();
        names.sort();
        names
    }
}
