//! Whole-file log reading.
//!
//! A log is always processed as one batch, so the loader simply reads the
//! entire file into memory before parsing begins.

use anyhow::Context;
use std::fs;
use std::path::Path;

/// Read a log file as UTF-8 text.
///
/// # Returns
///
/// The full file contents, or an error naming the path when the file cannot
/// be read or is not valid UTF-8. An empty file is not an error.
pub fn load_log_text(path: &Path) -> anyhow::Result<String> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read log file {}", path.display()))?;
    log::debug!("Read {} bytes from {}", bytes.len(), path.display());

    String::from_utf8(bytes).with_context(|| format!("Log file {} is not valid UTF-8", path.display()))
}

/// Short label for a loaded file, used in the UI and in log messages.
pub fn source_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
