//! Output directory checks and atomic file writes

use specmill_common::{GeneratorError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Check that `out_dir` can receive generated files
///
/// A missing directory is fine. An existing one must be a directory, and
/// must be empty unless `force` is set.
pub fn validate_output_dir(out_dir: &Path, force: bool) -> Result<PathBuf> {
    let abs = std::path::absolute(out_dir)?;
    if !abs.exists() {
        return Ok(abs);
    }
    if !abs.is_dir() {
        return Err(GeneratorError::Generation(format!(
            "Output path {} is not a directory",
            abs.display()
        )));
    }
    if !force && fs::read_dir(&abs)?.next().is_some() {
        return Err(GeneratorError::Generation(format!(
            "Output directory {} is not empty (use --force to overwrite)",
            abs.display()
        )));
    }
    Ok(abs)
}

/// Write `files` (relative path -> contents) under `out_dir`
///
/// Each file is written to a temporary file in its target directory and
/// renamed into place.
pub fn write_files(out_dir: &Path, files: &BTreeMap<String, Vec<u8>>, force: bool) -> Result<()> {
    let abs = validate_output_dir(out_dir, force)?;
    fs::create_dir_all(&abs).map_err(|e| {
        GeneratorError::Generation(format!(
            "Failed to create output directory {}: {}",
            abs.display(),
            e
        ))
    })?;

    for (rel, contents) in files {
        let target = abs.join(rel);
        let dir = target.parent().unwrap_or(abs.as_path());
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(contents)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| {
            GeneratorError::Generation(format!("Failed to write {}: {}", rel, e.error))
        })?;
        debug!(path = %target.display(), bytes = contents.len(), "wrote file");
    }

    Ok(())
}
