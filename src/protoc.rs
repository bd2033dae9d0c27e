//! Protoc invocation utilities.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use crate::error::CompileError;
use crate::which::find_executable;
use crate::Error;

/// Oldest compiler release the availability probe accepts.
pub const MIN_VERSION: &str = "2.2";

/// One compiler invocation: inputs, import search path and output target.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    inputs: Vec<PathBuf>,
    include_dirs: Vec<PathBuf>,
    output: PathBuf,
    extra_args: Vec<String>,
    include_imports: bool,
}

impl CompileRequest {
    /// Create a request writing a descriptor set to `output`.
    ///
    /// Fails with [`Error::InvalidArgument`] when `inputs` is empty.
    pub fn new<I, P>(output: impl AsRef<Path>, inputs: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let inputs: Vec<PathBuf> = inputs.into_iter().map(|p| p.as_ref().to_path_buf()).collect();
        if inputs.is_empty() {
            return Err(Error::InvalidArgument(
                "at least one input file is required".into(),
            ));
        }
        Ok(Self {
            inputs,
            include_dirs: Vec::new(),
            output: output.as_ref().to_path_buf(),
            extra_args: Vec::new(),
            include_imports: false,
        })
    }

    /// Add import search directories. The compiler uses the first match.
    pub fn include_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.include_dirs
            .extend(dirs.into_iter().map(|d| d.as_ref().to_path_buf()));
        self
    }

    /// Extra arguments placed before the input files.
    pub fn extra_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.extra_args.extend(args);
        self
    }

    /// Have the output carry every transitive import, not just the inputs.
    pub fn include_imports(mut self, include_imports: bool) -> Self {
        self.include_imports = include_imports;
        self
    }

    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// The argument list: `-I<dir>`... `-o<output>` [`--include_imports`]
    /// extra args, then the inputs.
    pub fn args(&self) -> Vec<OsString> {
        let mut args = Vec::with_capacity(self.include_dirs.len() + self.inputs.len() + 2);
        for dir in &self.include_dirs {
            args.push(prefixed("-I", dir));
        }
        args.push(prefixed("-o", &self.output));
        if self.include_imports {
            args.push("--include_imports".into());
        }
        args.extend(self.extra_args.iter().map(OsString::from));
        args.extend(self.inputs.iter().map(|p| p.as_os_str().to_owned()));
        args
    }

    /// Run the compiler found at `command`.
    ///
    /// The executable is resolved before anything is spawned. A non-zero
    /// exit becomes [`CompileError::Exited`], whose message is the status.
    pub fn run(&self, command: &Path) -> Result<(), Error> {
        let program = find_executable(command)?;
        let args = self.args();
        tracing::debug!(program = %program.display(), ?args, "invoking compiler");

        let output = Command::new(&program)
            .args(&args)
            .output()
            .map_err(|source| CompileError::Spawn {
                program: program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            let status = exit_code(output.status);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let combined = match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
                (true, _) => stderr.into_owned(),
                (false, true) => stdout.into_owned(),
                (false, false) => format!("{}\n{}", stdout, stderr),
            };
            tracing::debug!(status, stderr = %combined.trim_end(), "compiler failed");
            return Err(CompileError::Exited {
                status,
                stderr: combined,
            }
            .into());
        }
        Ok(())
    }
}

fn prefixed(flag: &str, path: &Path) -> OsString {
    let mut arg = OsString::from(flag);
    arg.push(path.as_os_str());
    arg
}

/// Numeric exit status. Signals map to `128 + signal` like a shell reports.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

/// Run `<command> --version` and extract the version number.
///
/// A command that cannot be launched because it does not exist yields
/// `Ok(None)`; other launch failures are errors.
pub fn probe_version(command: &Path) -> Result<Option<String>, Error> {
    let output = match Command::new(command).arg("--version").output() {
        Ok(output) => output,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(command = %command.display(), "compiler not installed");
            return Ok(None);
        }
        Err(source) => {
            return Err(CompileError::Spawn {
                program: command.display().to_string(),
                source,
            }
            .into())
        }
    };
    let version = extract_version(&String::from_utf8_lossy(&output.stdout));
    tracing::debug!(command = %command.display(), ?version, "probed compiler version");
    Ok(version)
}

/// The first run of digits and dots, e.g. `3.21.12` from `libprotoc 3.21.12`.
pub fn extract_version(text: &str) -> Option<String> {
    let is_version_char = |c: char| c.is_ascii_digit() || c == '.';
    let start = text.find(is_version_char)?;
    let version: String = text[start..].chars().take_while(|c| is_version_char(*c)).collect();
    Some(version)
}

/// Plain string comparison against `minimum`; `"10.0"` sorts below `"2.2"`.
pub fn version_at_least(version: &str, minimum: &str) -> bool {
    version >= minimum
}
