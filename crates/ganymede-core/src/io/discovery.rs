use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GanymedeError, Result};

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// The most recent date folder under `root`.
///
/// Date folders are named so that lexical order is chronological
/// (e.g. `20240314`), so the greatest non-hidden directory name wins.
pub fn latest_date_folder(root: &Path) -> Result<PathBuf> {
    let mut latest: Option<PathBuf> = None;
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if !path.is_dir() || is_hidden(&path) {
            continue;
        }
        if latest
            .as_ref()
            .map_or(true, |current| path.file_name() > current.file_name())
        {
            latest = Some(path);
        }
    }
    latest.ok_or_else(|| GanymedeError::NoDateFolders(root.to_path_buf()))
}

/// Non-hidden regular files in `dir`, sorted by name.
pub fn list_exposures(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && !is_hidden(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Final path component as text, for log messages and output names.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
