//! Raw page dump for pages the classifier could not make sense of.

use std::fs;
use std::path::Path;

use tracing::warn;

/// Overwrite `path` with the raw page so the markup can be inspected later.
pub fn dump_page(path: &Path, raw: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, raw)?;
    warn!(path = %path.display(), bytes = raw.len(), "unrecognised page saved");
    Ok(())
}
