//! `protoload` compiles `.proto` files with `protoc` and loads them into the
//! running process, so their messages can be used without checked-in
//! generated code.
//!
//! # Example
//!
//! ```rust,no_run
//! fn main() -> Result<(), protoload::Error> {
//!     protoload::compile_and_load(&["proto/person.proto"], &["proto/"])?;
//!
//!     let mut person = protoload::Registry::global().new_message("demo.Person")?;
//!     person.set("name", "Ada")?;
//!     person.set("id", 7i32)?;
//!     assert_eq!(person.get("name")?.and_then(|v| v.as_str()), Some("Ada"));
//!     Ok(())
//! }
//! ```
//!
//! Schema text works too; it is written to a temporary `schema.proto`:
//!
//! ```rust,no_run
//! fn main() -> Result<(), protoload::Error> {
//!     protoload::compile_and_load_string(
//!         r#"syntax = "proto3"; package demo; message Ping { uint64 seq = 1; }"#,
//!         &[] as &[&str],
//!     )?;
//!     Ok(())
//! }
//! ```
//!
//! # Loaded Bindings
//!
//! Loading turns every file of the compiled descriptor set into a table of
//! message and enum types and activates it in a [`Registry`]. Instances are
//! [`DynamicMessage`]s whose fields are checked against those tables on
//! every write. All files of one load are built before any of them is
//! activated, so a failing file leaves the registry as it was. Loading a type
//! that is already loaded replaces it.
//!
//! # Compiler Command
//!
//! The `protoc` executable is looked up on `PATH`. The `PROTOC` environment
//! variable, [`set_compiler_command`], or a per-session
//! [`Compiler::command`] override it:
//!
//! ```rust,no_run
//! fn main() -> Result<(), protoload::Error> {
//!     let report = protoload::Compiler::new()
//!         .command("/opt/protobuf/bin/protoc")
//!         .include("proto/")
//!         .compile_and_load(["proto/service.proto"])?;
//!     println!("loaded {:?}", report.messages);
//!     Ok(())
//! }
//! ```
//!
//! # Generated Source
//!
//! The same descriptors can be rendered as plain Rust structs and enums,
//! with recursive fields boxed, for projects that want static types:
//!
//! ```rust,no_run
//! fn main() -> Result<(), protoload::Error> {
//!     protoload::Compiler::new().generate_sources(["proto/person.proto"], "src/proto")?;
//!     Ok(())
//! }
//! ```

pub mod binding;
mod codegen;
mod command;
mod config;
mod context;
pub mod descriptor;
mod error;
mod loader;
mod protoc;
mod which;

pub use binding::{DynamicMessage, Registry, Value};
pub use codegen::{
    build_binding, build_set, generate_binding, generate_set, write_modules, GeneratedBinding,
};
pub use command::{compiler_command, reset_compiler_command, set_compiler_command, DEFAULT_COMMAND};
pub use config::{Compiler, STRING_SCHEMA_NAME};
pub use context::GenerationContext;
pub use error::{CompileError, DecodeError, Error};
pub use loader::{activate, load_set, LoadReport};
pub use protoc::{CompileRequest, MIN_VERSION};
pub use which::find_executable;

use std::path::Path;

fn session(includes: &[impl AsRef<Path>]) -> Compiler {
    let mut compiler = Compiler::new();
    for include in includes {
        compiler.include(include);
    }
    compiler
}

/// Run the compiler on `inputs`, writing a descriptor set to `output`.
///
/// Runs `<command> -I<include>... -o<output> <inputs>...` with the
/// process-wide command. Fails with [`Error::InvalidArgument`] for empty
/// `inputs`, and with [`CompileError`] when the command cannot be found or
/// exits unsuccessfully.
pub fn compile(
    output: impl AsRef<Path>,
    inputs: &[impl AsRef<Path>],
    includes: &[impl AsRef<Path>],
) -> Result<(), Error> {
    session(includes)
        .include_imports(false)
        .compile(output, inputs)
}

/// Compile `inputs` and load every file of the result into
/// [`Registry::global`].
///
/// # Example
///
/// ```rust,no_run
/// fn main() -> Result<(), protoload::Error> {
///     let report = protoload::compile_and_load(&["a.proto", "b.proto"], &["proto/"])?;
///     assert!(report.contains("pkg.Message"));
///     Ok(())
/// }
/// ```
pub fn compile_and_load(
    inputs: &[impl AsRef<Path>],
    includes: &[impl AsRef<Path>],
) -> Result<LoadReport, Error> {
    session(includes).compile_and_load(inputs)
}

/// Compile schema text and load it into [`Registry::global`].
pub fn compile_and_load_string(
    schema: &str,
    includes: &[impl AsRef<Path>],
) -> Result<LoadReport, Error> {
    session(includes).compile_and_load_string(schema)
}

/// Whether the process-wide compiler command runs and reports at least
/// [`MIN_VERSION`]. A command that is not installed is `Ok(false)`.
pub fn is_available() -> Result<bool, Error> {
    Compiler::new().is_available()
}
