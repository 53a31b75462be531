//! Path admission for the write path
//!
//! File inputs pass two gates before any I/O: an extension whitelist and a
//! traversal check. Both fail with E_PATH and the reason; neither touches
//! the filesystem.

use std::path::{Component, Path, PathBuf};

use crate::diagnostics::{Code, Diagnostic};

/// Extensions OCTAVE documents may live under.
pub const ALLOWED_EXTENSIONS: &[&str] = &[".md", ".oct.md", ".octave"];

pub fn check_path(path: &str) -> Result<PathBuf, Diagnostic> {
    let parsed = Path::new(path);

    // Traversal first: a whitelisted extension does not excuse `..`.
    if parsed
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(Diagnostic::new(Code::EPath, "Path traversal not allowed")
            .expected_got("a path without '..' segments", path));
    }

    let name = parsed
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
        return Err(Diagnostic::new(
            Code::EPath,
            format!(
                "Invalid file extension (expected one of {})",
                ALLOWED_EXTENSIONS.join(", ")
            ),
        )
        .expected_got(ALLOWED_EXTENSIONS.join("|"), path));
    }

    Ok(parsed.to_path_buf())
}
