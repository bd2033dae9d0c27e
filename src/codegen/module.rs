//! Writing rendered sources to disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::GeneratedBinding;
use crate::Error;

/// Write one `<module>.rs` per Rust module plus a `mod.rs` declaring them
/// all. Files that share a package are concatenated into one module.
///
/// Returns the written paths, `mod.rs` last.
pub fn write_modules(out_dir: &Path, generated: &[GeneratedBinding]) -> Result<Vec<PathBuf>, Error> {
    let mut modules: BTreeMap<&str, String> = BTreeMap::new();
    for binding in generated {
        let content = modules.entry(binding.module.as_str()).or_default();
        if !content.is_empty() {
            content.push('\n');
        }
        content.push_str(&format!("// {}\n", binding.binding.file));
        content.push_str(&binding.source);
    }

    std::fs::create_dir_all(out_dir)?;
    let mut written = Vec::with_capacity(modules.len() + 1);
    let mut root = String::new();
    for (module, content) in &modules {
        let path = out_dir.join(format!("{}.rs", module.trim_start_matches("r#")));
        std::fs::write(&path, content)?;
        tracing::debug!(path = %path.display(), "wrote generated module");
        written.push(path);
        root.push_str(&format!("pub mod {};\n", module));
    }

    let root_path = out_dir.join("mod.rs");
    std::fs::write(&root_path, root)?;
    written.push(root_path);
    Ok(written)
}
