//! Error types for protoload.

use std::io;

/// Errors that can occur while compiling, decoding, generating or loading
/// protobuf schemas.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller supplied an argument the pipeline cannot work with, e.g.
    /// zero input files.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The external compiler could not be run or exited unsuccessfully.
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// The compiler output was not a valid `FileDescriptorSet`.
    #[error("failed to decode FileDescriptorSet: {0}")]
    Decode(#[from] DecodeError),
    /// A file imports another file that is neither in the same descriptor
    /// set nor already loaded.
    #[error("unresolved dependency: '{file}' imports '{dependency}'")]
    UnresolvedDependency { file: String, dependency: String },
    /// A field references a message or enum type that cannot be found.
    #[error("unresolved type '{type_name}' referenced from '{file}'")]
    UnresolvedType { file: String, type_name: String },
    /// The descriptor is structurally incomplete (missing names, numbers...).
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),
    /// No message type with this name has been loaded.
    #[error("unknown message type '{0}'")]
    UnknownMessage(String),
    /// The message type has no field with this name.
    #[error("message '{message}' has no field '{field}'")]
    UnknownField { message: String, field: String },
    /// A value does not match the declared type of the field.
    #[error("type mismatch for field '{field}': expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },
    /// The rendered Rust source failed to parse.
    #[error("failed to parse generated code: {0}")]
    SynParse(String),
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Failures of the external compiler invocation.
///
/// The `Exited` variant displays nothing but the numeric exit status so
/// callers can match on the leading digits of the message.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The configured executable does not resolve to an executable file.
    /// Raised before any process is spawned.
    #[error("could not find executable: {name}")]
    ExecutableNotFound { name: String },
    /// The compiler ran and exited with a non-zero status.
    #[error("{status}")]
    Exited { status: i32, stderr: String },
    /// The operating system refused to launch the compiler.
    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl CompileError {
    /// Exit status of the compiler, if it ran to completion.
    pub fn status(&self) -> Option<i32> {
        match self {
            Self::Exited { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whatever the compiler printed on stderr before failing.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Exited { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Errors produced while decoding a binary `FileDescriptorSet`.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Invalid varint encoding.
    #[error("invalid varint encoding")]
    InvalidVarint,
    /// Unexpected end of buffer.
    #[error("unexpected end of buffer")]
    UnexpectedEof,
    /// Invalid or unsupported wire type.
    #[error("invalid wire type: {0}")]
    InvalidWireType(u8),
    /// Invalid UTF-8 in string field.
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,
    /// A length prefix exceeds the maximum message size.
    #[error("message size {0} exceeds maximum")]
    MessageTooLarge(u64),
    /// Reading the encoded bytes failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
