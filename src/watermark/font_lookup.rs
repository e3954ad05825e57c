//! Font name resolution
//!
//! A configured font path that exists is used as is. A bare file name such
//! as the default `arial.ttf` is looked up, case-insensitively, in the
//! platform font directories. When it is not installed, a few common
//! sans-serif families are tried before giving up.

use log::{debug, warn};
use std::env;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Fonts tried when a bare font name is not installed
pub const FALLBACK_FONTS: [&str; 4] = [
    "DejaVuSans.ttf",
    "LiberationSans-Regular.ttf",
    "FreeSans.ttf",
    "Arial.ttf",
];

/// How far below a font directory to look
const MAX_SEARCH_DEPTH: usize = 5;

/// Resolves a configured font path to a file on disk
///
/// Returns `None` when nothing suitable is found. Paths that name a
/// directory are never searched for: they must exist as given.
pub fn resolve_font_path(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    let name = bare_file_name(path)?;

    let dirs = system_font_dirs();
    if let Some(found) = find_in_dirs(&dirs, name) {
        debug!("Resolved font {} to {}", name, found.display());
        return Some(found);
    }

    let fallback = FALLBACK_FONTS
        .iter()
        .filter(|candidate| !candidate.eq_ignore_ascii_case(name))
        .find_map(|candidate| find_in_dirs(&dirs, candidate));
    if let Some(found) = &fallback {
        warn!("Font {} is not installed, using {}", name, found.display());
    }
    fallback
}

/// Font directories of the current platform that exist
pub fn system_font_dirs() -> Vec<PathBuf> {
    let home = env::var_os("HOME").map(PathBuf::from);
    let mut dirs = Vec::new();

    if cfg!(target_os = "windows") {
        if let Some(windir) = env::var_os("WINDIR") {
            dirs.push(PathBuf::from(windir).join("Fonts"));
        }
        if let Some(local) = env::var_os("LOCALAPPDATA") {
            dirs.push(PathBuf::from(local).join("Microsoft").join("Windows").join("Fonts"));
        }
    } else if cfg!(target_os = "macos") {
        dirs.push(PathBuf::from("/Library/Fonts"));
        dirs.push(PathBuf::from("/System/Library/Fonts"));
        if let Some(home) = &home {
            dirs.push(home.join("Library").join("Fonts"));
        }
    } else {
        let data_home = env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| home.as_ref().map(|h| h.join(".local").join("share")));
        if let Some(data_home) = data_home {
            dirs.push(data_home.join("fonts"));
        }
        if let Some(home) = &home {
            dirs.push(home.join(".fonts"));
        }
        let data_dirs = env::var("XDG_DATA_DIRS")
            .ok()
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "/usr/local/share:/usr/share".to_string());
        dirs.extend(data_dirs.split(':').filter(|d| !d.is_empty()).map(|d| Path::new(d).join("fonts")));
    }

    dirs.retain(|dir| dir.is_dir());
    dirs
}

/// Searches `dirs` in order for a file called `name`, ignoring case
pub fn find_in_dirs(dirs: &[PathBuf], name: &str) -> Option<PathBuf> {
    let wanted = name.to_lowercase();
    dirs.iter().find_map(|dir| {
        WalkDir::new(dir)
            .follow_links(true)
            .max_depth(MAX_SEARCH_DEPTH)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .find(|entry| {
                entry.file_type().is_file() && entry.file_name().to_string_lossy().to_lowercase() == wanted
            })
            .map(|entry| entry.into_path())
    })
}

/// The file name of a path without directory components
fn bare_file_name(path: &Path) -> Option<&str> {
    let has_parent = path.parent().is_some_and(|parent| !parent.as_os_str().is_empty());
    if has_parent {
        return None;
    }
    path.file_name()?.to_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watermark::text::find_test_font;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_existing_path_is_used_as_is() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.ttf");
        fs::write(&path, b"font").unwrap();
        assert_eq!(resolve_font_path(&path), Some(path));
    }

    #[test]
    fn test_search_ignores_case_and_descends() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("truetype").join("msttcorefonts");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("Arial.TTF"), b"font").unwrap();

        let dirs = vec![dir.path().to_path_buf()];
        assert_eq!(find_in_dirs(&dirs, "arial.ttf"), Some(nested.join("Arial.TTF")));
        assert_eq!(find_in_dirs(&dirs, "verdana.ttf"), None);
    }

    #[test]
    fn test_paths_with_directories_are_not_searched() {
        assert_eq!(resolve_font_path(Path::new("/nonexistent/font.ttf")), None);
        assert_eq!(resolve_font_path(Path::new("fonts/arial.ttf")), None);
        assert_eq!(bare_file_name(Path::new("arial.ttf")), Some("arial.ttf"));
    }

    #[test]
    fn test_default_font_name_resolves_when_fonts_are_installed() {
        let Some(installed) = find_test_font() else {
            eprintln!("No system font found, skipping");
            return;
        };
        if !system_font_dirs().iter().any(|dir| installed.starts_with(dir)) {
            eprintln!("{} is outside the font directories, skipping", installed.display());
            return;
        }

        let resolved = resolve_font_path(Path::new("arial.ttf")).unwrap();
        assert!(resolved.is_file());
    }
}
