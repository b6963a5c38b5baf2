//! Subcommand implementations.

pub mod merge;
pub mod show;
pub mod watch;

use std::path::Path;

use canopy::Document;

/// Read a JSON object from disk
pub fn read_document(path: &Path) -> Result<Document, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    Ok(Document::from_json_str(&text)?)
}
