//! Compiler sessions.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::binding::Registry;
use crate::codegen::{generate_set, write_modules};
use crate::command::compiler_command;
use crate::context::GenerationContext;
use crate::descriptor::{decode_file_descriptor_set, FileDescriptorSet};
use crate::loader::{load_set, LoadReport};
use crate::protoc::{probe_version, version_at_least, CompileRequest, MIN_VERSION};
use crate::Error;

/// File name used for schema text passed to
/// [`Compiler::compile_and_load_string`].
pub const STRING_SCHEMA_NAME: &str = "schema.proto";

/// A configured compiler session.
///
/// Without an explicit [`command`](Compiler::command) the session reads the
/// process-wide command once per invocation. Loads go to
/// [`Registry::global`] unless a [`registry`](Compiler::registry) is set.
#[derive(Debug, Clone)]
pub struct Compiler {
    command: Option<PathBuf>,
    include_dirs: Vec<PathBuf>,
    protoc_args: Vec<String>,
    include_imports: bool,
    registry: Option<Arc<Registry>>,
    skip_format: bool,
}

impl Default for Compiler {
    fn default() -> Self {
        Self {
            command: None,
            include_dirs: Vec::new(),
            protoc_args: Vec::new(),
            include_imports: true,
            registry: None,
            skip_format: false,
        }
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this executable name or path instead of the process-wide one.
    pub fn command(&mut self, command: impl AsRef<Path>) -> &mut Self {
        self.command = Some(command.as_ref().to_path_buf());
        self
    }

    /// Add an import search directory. Directories are searched in the order
    /// they are added, before the directories of the input files.
    pub fn include(&mut self, dir: impl AsRef<Path>) -> &mut Self {
        self.include_dirs.push(dir.as_ref().to_path_buf());
        self
    }

    /// Add an argument to pass to the compiler.
    pub fn protoc_arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.protoc_args.push(arg.into());
        self
    }

    /// Whether compiled sets carry transitive imports. On by default so that
    /// loads see every file their inputs depend on.
    pub fn include_imports(&mut self, include_imports: bool) -> &mut Self {
        self.include_imports = include_imports;
        self
    }

    /// Load into `registry` instead of the process-wide one.
    pub fn registry(&mut self, registry: Arc<Registry>) -> &mut Self {
        self.registry = Some(registry);
        self
    }

    /// Skip formatting rendered sources with prettyplease.
    pub fn skip_format(&mut self) -> &mut Self {
        self.skip_format = true;
        self
    }

    /// The executable this session runs.
    pub fn resolved_command(&self) -> PathBuf {
        self.command.clone().unwrap_or_else(compiler_command)
    }

    /// The registry loads go to.
    pub fn target_registry(&self) -> Arc<Registry> {
        self.registry.clone().unwrap_or_else(Registry::global)
    }

    /// Run the compiler, writing a descriptor set to `output`.
    ///
    /// Only the configured include directories are passed.
    pub fn compile<I, P>(&self, output: impl AsRef<Path>, inputs: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        CompileRequest::new(output, inputs)?
            .include_dirs(&self.include_dirs)
            .extra_args(self.protoc_args.iter().cloned())
            .include_imports(self.include_imports)
            .run(&self.resolved_command())
    }

    /// Compile `inputs` into a temporary file and decode the result.
    ///
    /// The directory of every input is searched after the configured include
    /// directories. The temporary output is removed on every path.
    pub fn compile_to_set<I, P>(&self, inputs: I) -> Result<FileDescriptorSet, Error>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let inputs: Vec<PathBuf> = inputs.into_iter().map(|p| p.as_ref().to_path_buf()).collect();
        let tempdir = tempfile::Builder::new().prefix("protoload").tempdir()?;
        let output = tempdir.path().join("descriptor_set.pb");

        CompileRequest::new(&output, &inputs)?
            .include_dirs(self.search_path(&inputs))
            .extra_args(self.protoc_args.iter().cloned())
            .include_imports(self.include_imports)
            .run(&self.resolved_command())?;

        let bytes = std::fs::read(&output)?;
        Ok(decode_file_descriptor_set(&bytes)?)
    }

    /// Compile `inputs`, then build and activate a binding for every file of
    /// the resulting set. Nothing is activated unless every file succeeds.
    pub fn compile_and_load<I, P>(&self, inputs: I) -> Result<LoadReport, Error>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let set = self.compile_to_set(inputs)?;
        load_set(&set, &self.target_registry())
    }

    /// Like [`compile_and_load`](Compiler::compile_and_load) for schema text.
    ///
    /// The text is written as [`STRING_SCHEMA_NAME`] in a fresh temporary
    /// directory, which is also added to the include directories.
    pub fn compile_and_load_string(&self, schema: &str) -> Result<LoadReport, Error> {
        let tempdir = tempfile::Builder::new().prefix("protoload").tempdir()?;
        let path = tempdir.path().join(STRING_SCHEMA_NAME);
        std::fs::write(&path, schema)?;

        let mut session = self.clone();
        session.include(tempdir.path());
        session.compile_and_load([&path])
    }

    /// Compile `inputs` and write the rendered Rust source to `out_dir`, one
    /// module per package plus a `mod.rs`. Returns the written paths.
    pub fn generate_sources<I, P>(&self, inputs: I, out_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, Error>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let set = self.compile_to_set(inputs)?;
        let registry = self.target_registry();
        let mut ctx = GenerationContext::new(&set, &registry);
        ctx.skip_format = self.skip_format;
        let generated = generate_set(&ctx)?;
        write_modules(out_dir.as_ref(), &generated)
    }

    /// Whether a compiler of at least [`MIN_VERSION`] can be run.
    ///
    /// A missing executable is `Ok(false)`, not an error.
    pub fn is_available(&self) -> Result<bool, Error> {
        Ok(self
            .version()?
            .is_some_and(|version| version_at_least(&version, MIN_VERSION)))
    }

    /// The version the compiler reports, `None` when it is not installed.
    pub fn version(&self) -> Result<Option<String>, Error> {
        probe_version(&self.resolved_command())
    }

    /// Configured include directories, then each input's directory, without
    /// duplicates.
    fn search_path(&self, inputs: &[PathBuf]) -> Vec<PathBuf> {
        let parents = inputs.iter().map(|input| match input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        });

        let mut dirs: Vec<PathBuf> = Vec::new();
        for dir in self.include_dirs.iter().cloned().chain(parents) {
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        dirs
    }
}
