//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use protoload::{Compiler, Registry};

pub fn proto_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("proto")
}

pub fn proto(name: &str) -> PathBuf {
    proto_dir().join(name)
}

/// A session that includes the fixture directory and loads into its own
/// registry, or `None` when no usable compiler is installed.
pub fn compiler() -> Option<(Compiler, Arc<Registry>)> {
    let registry = Arc::new(Registry::new());
    let mut compiler = Compiler::new();
    compiler
        .command(protoload::compiler_command())
        .include(proto_dir())
        .registry(Arc::clone(&registry));

    match compiler.is_available() {
        Ok(true) => Some((compiler, registry)),
        _ => {
            eprintln!("protoc is not installed, skipping");
            None
        }
    }
}

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

/// Behaviour of a stand-in compiler script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeCompiler {
    /// Copies `tests/fixtures/<name>` to the `-o` path.
    Emits(&'static str),
    /// Reports a missing file and exits with status 1.
    Fails,
    /// Writes bytes that are not a descriptor set.
    EmitsGarbage,
}

const FAKE_FIXTURES: &[&str] = &["simple.pb", "chain.pb", "chain_c_only.pb", "group.pb"];

/// Path to a shell script that answers `--version` like protoc and then
/// behaves as `kind` says, whatever the inputs.
///
/// Every script is written on first use, before any of them can run, and
/// outside `TMPDIR` so leftover checks only see what the crate creates.
#[cfg(unix)]
pub fn fake_compiler(kind: FakeCompiler) -> PathBuf {
    static DIR: OnceLock<PathBuf> = OnceLock::new();
    let dir = DIR.get_or_init(|| {
        let dir = Path::new(env!("CARGO_TARGET_TMPDIR"))
            .join(format!("protoload-fake-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        write_script(&dir.join("fails"), FakeCompiler::Fails);
        write_script(&dir.join("garbage"), FakeCompiler::EmitsGarbage);
        for &name in FAKE_FIXTURES {
            write_script(&dir.join(name), FakeCompiler::Emits(name));
        }
        dir
    });
    match kind {
        FakeCompiler::Emits(name) => {
            assert!(FAKE_FIXTURES.contains(&name), "no fixture named {}", name);
            dir.join(name)
        }
        FakeCompiler::Fails => dir.join("fails"),
        FakeCompiler::EmitsGarbage => dir.join("garbage"),
    }
}

#[cfg(unix)]
fn write_script(path: &Path, kind: FakeCompiler) {
    use std::os::unix::fs::PermissionsExt;

    let action = match kind {
        FakeCompiler::Emits(name) => format!("cp '{}' \"$out\"", fixture(name).display()),
        FakeCompiler::Fails => "echo \"$last: File not found.\" >&2\nexit 1".to_string(),
        FakeCompiler::EmitsGarbage => "printf '\\377\\377\\377' > \"$out\"".to_string(),
    };
    let script = format!(
        r#"#!/bin/sh
out=""
last=""
for arg in "$@"; do
  case "$arg" in
    --version) echo "libprotoc 3.21.12"; exit 0 ;;
    -o*) out="${{arg#-o}}" ;;
    *) last="$arg" ;;
  esac
done
[ -n "$out" ] || {{ echo "missing output" >&2; exit 2; }}
{}
"#,
        action
    );
    std::fs::write(path, script).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// A session running `kind` against the fixture directory, loading into its
/// own registry.
#[cfg(unix)]
pub fn fake_session(kind: FakeCompiler) -> (Compiler, Arc<Registry>) {
    let registry = Arc::new(Registry::new());
    let mut compiler = Compiler::new();
    compiler
        .command(fake_compiler(kind))
        .include(proto_dir())
        .registry(Arc::clone(&registry));
    (compiler, registry)
}
