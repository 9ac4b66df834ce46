//! Input expansion for batch commands
//!
//! Turns the positional inputs (files, directories, glob patterns) into a
//! sorted, de-duplicated list of measurement files.

use crate::constants::{CSV_EXTENSIONS, SPREADSHEET_EXTENSIONS, TEXT_EXTENSIONS};
use crate::error::{ProcessorError, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// True for extensions the analyzer reads when a directory is scanned
pub fn is_measurement_file(path: &Path) -> bool {
    let Some(extension) = path.extension().map(|e| e.to_string_lossy().to_lowercase()) else {
        return false;
    };
    let extension = extension.as_str();
    CSV_EXTENSIONS.contains(&extension)
        || TEXT_EXTENSIONS.contains(&extension)
        || SPREADSHEET_EXTENSIONS.contains(&extension)
}

/// Measurement files under `dir`, recursively
fn discover_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() && is_measurement_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    debug!("Found {} measurement files in {}", files.len(), dir.display());
    Ok(files)
}

/// Expand inputs into files
///
/// Existing files are taken as given whatever their extension; directories
/// are walked; anything else is treated as a glob pattern.
pub fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = BTreeSet::new();

    for input in inputs {
        let path = Path::new(input);
        if path.is_file() {
            files.insert(path.to_path_buf());
        } else if path.is_dir() {
            files.extend(discover_directory(path)?);
        } else {
            let paths = glob::glob(input).map_err(|e| ProcessorError::Configuration {
                message: format!("Invalid input pattern '{}': {}", input, e),
            })?;
            let before = files.len();
            for entry in paths {
                match entry {
                    Ok(matched) if matched.is_file() => {
                        files.insert(matched);
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Skipping unreadable path: {}", e),
                }
            }
            if files.len() == before {
                warn!("Input '{}' matched no files", input);
            }
        }
    }

    if files.is_empty() {
        return Err(ProcessorError::Configuration {
            message: "No input files found".to_string(),
        });
    }
    Ok(files.into_iter().collect())
}
