//! Flow discovery
//!
//! Lists flow files in a directory. Order is whatever the filesystem
//! enumerates; callers must not depend on it.

use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name endings recognised as flows
pub const FLOW_SUFFIXES: [&str; 3] = [".test.js", ".mjs", ".js"];

/// A discovered flow file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowFile {
    /// File name, used as the flow's identity in results
    pub name: String,
    pub path: PathBuf,
}

pub fn is_flow_file(name: &str) -> bool {
    FLOW_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// List flow files in `dir`
///
/// Returns `Ok(None)` when the directory does not exist.
pub async fn discover_flows(dir: &Path) -> io::Result<Option<Vec<FlowFile>>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if is_flow_file(&name) {
            files.push(FlowFile {
                name,
                path: entry.path(),
            });
        }
    }

    debug!("Discovered {} flow file(s) in {}", files.len(), dir.display());
    Ok(Some(files))
}
