//! The subset of `google/protobuf/descriptor.proto` that bindings are built
//! from.
//!
//! Field names follow the descriptor schema so they line up with its
//! documentation; the trailing comments give the wire field numbers the
//! decoder matches on. Anything not listed here is skipped while decoding.

mod decode;

pub use decode::{decode_file_descriptor_set, decode_file_descriptor_set_from};

/// Output of `protoc -o`: every compiled file, dependencies before the
/// files importing them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileDescriptorSet {
    pub file: Vec<FileDescriptorProto>, // 1
}

impl FileDescriptorSet {
    /// Find a file by the name the compiler recorded for it.
    pub fn file_by_name(&self, name: &str) -> Option<&FileDescriptorProto> {
        self.file.iter().find(|f| f.name.as_deref() == Some(name))
    }

    /// Names of every file in the set.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.file.iter().filter_map(|f| f.name.as_deref())
    }
}

/// One schema file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileDescriptorProto {
    /// Path relative to the include directory it was found in, e.g.
    /// `nested/child.proto`. Imports refer to files by this name.
    pub name: Option<String>, // 1
    pub package: Option<String>, // 2
    /// Names of imported files.
    pub dependency: Vec<String>, // 3
    pub message_type: Vec<DescriptorProto>, // 4
    pub enum_type: Vec<EnumDescriptorProto>, // 5
    /// `"proto2"`, `"proto3"`, or absent for proto2.
    pub syntax: Option<String>, // 12
}

impl FileDescriptorProto {
    /// The package, or the empty string when none was declared.
    pub fn package(&self) -> &str {
        self.package.as_deref().unwrap_or("")
    }

    /// Whether the file declares `syntax = "proto3"`.
    pub fn is_proto3(&self) -> bool {
        self.syntax.as_deref() == Some("proto3")
    }

    /// Prefix used to build fully-qualified type names, e.g. `.my.pkg.`.
    pub fn type_prefix(&self) -> String {
        match self.package() {
            "" => ".".to_string(),
            package => format!(".{}.", package),
        }
    }
}

/// A message, with its nested messages and enums.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptorProto {
    pub name: Option<String>, // 1
    pub field: Vec<FieldDescriptorProto>, // 2
    /// Includes the synthetic `XxxEntry` messages of map fields.
    pub nested_type: Vec<DescriptorProto>, // 3
    pub enum_type: Vec<EnumDescriptorProto>, // 4
    pub options: Option<MessageOptions>, // 7
    /// Real oneofs, followed by the synthetic ones protoc adds for proto3
    /// `optional` fields.
    pub oneof_decl: Vec<OneofDescriptorProto>, // 8
}

impl DescriptorProto {
    /// Whether protoc synthesized this message for a map field.
    pub fn is_map_entry(&self) -> bool {
        matches!(
            self.options,
            Some(MessageOptions {
                map_entry: Some(true)
            })
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldDescriptorProto {
    pub name: Option<String>, // 1
    pub number: Option<i32>, // 3
    pub label: Option<i32>, // 4
    pub r#type: Option<i32>, // 5
    /// Fully-qualified with a leading dot, e.g. `.pkg.Outer.Inner`, for
    /// message and enum fields.
    pub type_name: Option<String>, // 6
    /// `[default = ...]` as text; enum defaults are the value name.
    pub default_value: Option<String>, // 7
    pub oneof_index: Option<i32>, // 9
    pub json_name: Option<String>, // 10
    pub proto3_optional: Option<bool>, // 17
}

impl FieldDescriptorProto {
    /// The label, treating a missing or unknown label as optional.
    pub fn label(&self) -> Label {
        self.label
            .and_then(|raw| Label::try_from(raw).ok())
            .unwrap_or(Label::Optional)
    }

    /// The declared type, `None` when missing or unknown.
    pub fn field_type(&self) -> Option<Type> {
        self.r#type.and_then(|raw| Type::try_from(raw).ok())
    }

    /// The oneof this field really belongs to. Synthetic oneofs generated for
    /// proto3 `optional` fields are not reported.
    pub fn real_oneof(&self) -> Option<usize> {
        if self.proto3_optional.unwrap_or(false) {
            return None;
        }
        self.oneof_index.and_then(|i| usize::try_from(i).ok())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnumDescriptorProto {
    pub name: Option<String>, // 1
    /// In declaration order; aliases share a number.
    pub value: Vec<EnumValueDescriptorProto>, // 2
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnumValueDescriptorProto {
    pub name: Option<String>, // 1
    pub number: Option<i32>, // 2
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OneofDescriptorProto {
    pub name: Option<String>, // 1
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageOptions {
    pub map_entry: Option<bool>, // 7
}

/// Implements `TryFrom<i32>` for a fieldless enum from its discriminants.
/// The unknown number is returned as the error.
macro_rules! wire_enum {
    ($(#[$attr:meta])* pub enum $name:ident { $($variant:ident = $number:literal,)* }) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(i32)]
        pub enum $name {
            $($variant = $number,)*
        }

        impl TryFrom<i32> for $name {
            type Error = i32;

            fn try_from(raw: i32) -> Result<Self, i32> {
                match raw {
                    $($number => Ok(Self::$variant),)*
                    unknown => Err(unknown),
                }
            }
        }
    };
}

wire_enum! {
    /// `FieldDescriptorProto.Type`.
    pub enum Type {
        Double = 1,
        Float = 2,
        Int64 = 3,
        Uint64 = 4,
        Int32 = 5,
        Fixed64 = 6,
        Fixed32 = 7,
        Bool = 8,
        String = 9,
        Group = 10,
        Message = 11,
        Bytes = 12,
        Uint32 = 13,
        Enum = 14,
        Sfixed32 = 15,
        Sfixed64 = 16,
        Sint32 = 17,
        Sint64 = 18,
    }
}

wire_enum! {
    /// `FieldDescriptorProto.Label`.
    pub enum Label {
        Optional = 1,
        Required = 2,
        Repeated = 3,
    }
}
