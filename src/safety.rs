//! Guards for files written by the binaries.
//!
//! Query results and reports can be exported as JSON. These checks keep an
//! export from overwriting the catalog it was computed from.

use anyhow::{bail, Result};
use std::path::Path;

/// Extensions that identify catalog sources, never valid export targets.
const CATALOG_EXTENSIONS: [&str; 4] = ["csv", "sqlite", "sqlite3", "db"];

/// Validates that an export path is safe to overwrite.
///
/// Checks:
/// - Output must have a `.json` extension
/// - Output cannot be the same as any of the provided source paths
///
/// # Arguments
/// * `output` - The path that will be created/overwritten
/// * `source_paths` - Catalog paths that must not match the output
pub fn validate_output_path(output: &Path, source_paths: &[&Path]) -> Result<()> {
    let ext = output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if CATALOG_EXTENSIONS.contains(&ext.as_str()) {
        bail!(
            "Safety check failed: output '{}' looks like a catalog file",
            output.display()
        );
    }

    if ext != "json" {
        bail!(
            "Safety check failed: output file '{}' must have a .json extension",
            output.display()
        );
    }

    for source in source_paths {
        if output == *source {
            bail!(
                "Safety check failed: output '{}' cannot be the same as source '{}'",
                output.display(),
                source.display()
            );
        }
    }

    Ok(())
}
