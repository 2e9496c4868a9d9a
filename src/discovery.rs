use std::path::{Path, PathBuf};

use crate::config::REPOSITORY_MARKER;
use crate::error::{PgitError, Result};

/// Find the repositories directly under `root`, sorted by name.
///
/// A child directory qualifies when it holds a `.git` entry, its name does
/// not itself end in `.git` (bare clones), and it is not named in `exclude`.
/// Exclusion ignores case.
pub fn discover_repositories(root: &Path, exclude: &[String]) -> Result<Vec<PathBuf>> {
    let scan_error = |source| PgitError::Discovery {
        path: root.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in std::fs::read_dir(root).map_err(scan_error)? {
        let entry = entry.map_err(scan_error)?;
        if !entry.file_type().map_err(scan_error)?.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(REPOSITORY_MARKER) {
            tracing::debug!(name = %name, "Skipping bare repository directory");
            continue;
        }
        if !entry.path().join(REPOSITORY_MARKER).exists() {
            tracing::debug!(name = %name, "Skipping directory without a repository");
            continue;
        }
        if is_excluded(&name, exclude) {
            tracing::debug!(name = %name, "Skipping excluded directory");
            continue;
        }

        names.push(name);
    }

    names.sort();
    Ok(names.into_iter().map(|name| root.join(name)).collect())
}

/// Case-insensitive match of `name` against the exclude list.
pub fn is_excluded(name: &str, exclude: &[String]) -> bool {
    let name = name.to_lowercase();
    exclude.iter().any(|excluded| excluded.to_lowercase() == name)
}

/// Split a comma-separated exclude list, dropping blank entries.
pub fn parse_exclude_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
