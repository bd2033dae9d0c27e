//! Process-wide compiler command.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use parking_lot::Mutex;

/// Command used when nothing overrides it.
pub const DEFAULT_COMMAND: &str = "protoc";

static COMMAND: OnceLock<Mutex<PathBuf>> = OnceLock::new();

fn global_command() -> &'static Mutex<PathBuf> {
    COMMAND.get_or_init(|| Mutex::new(default_command()))
}

/// `$PROTOC` when set and non-empty, otherwise [`DEFAULT_COMMAND`].
pub fn default_command() -> PathBuf {
    match std::env::var_os("PROTOC") {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => PathBuf::from(DEFAULT_COMMAND),
    }
}

/// Replace the compiler command used by later compilations.
pub fn set_compiler_command(command: impl AsRef<Path>) {
    let command = command.as_ref().to_path_buf();
    tracing::debug!(command = %command.display(), "setting compiler command");
    *global_command().lock() = command;
}

/// Restore the default compiler command.
pub fn reset_compiler_command() {
    let command = default_command();
    tracing::debug!(command = %command.display(), "resetting compiler command");
    *global_command().lock() = command;
}

/// The compiler command currently in effect.
pub fn compiler_command() -> PathBuf {
    global_command().lock().clone()
}
