//! Image file discovery

use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::WatermarkConfig;
use crate::errors::{WatermarkError, WatermarkResult};

/// Lists image files in `dir`, sorted by path
///
/// A file is kept when `WatermarkConfig::accepts` takes its name.
/// Subdirectories are only entered when `recursive` is set; symlinked
/// directories are never followed.
pub fn scan_image_paths(dir: &Path, config: &WatermarkConfig, recursive: bool) -> WatermarkResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(WatermarkError::InputNotFound(dir.to_path_buf()));
    }

    let mut paths = Vec::new();
    collect(dir, config, recursive, &mut paths)?;
    paths.sort();

    info!("Found {} images in {}", paths.len(), dir.display());
    Ok(paths)
}

fn collect(dir: &Path, config: &WatermarkConfig, recursive: bool, paths: &mut Vec<PathBuf>) -> WatermarkResult<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();

        if file_type.is_dir() {
            if recursive {
                collect(&path, config, recursive, paths)?;
            }
            continue;
        }

        if config.accepts(&path) {
            paths.push(path);
        } else {
            debug!("Skipping {}", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config() -> WatermarkConfig {
        WatermarkConfig::default()
    }

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in ["b.PNG", "a.jpg", "c.txt", "d.tiff", "e.jpeg.bak"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.jpg")).unwrap();

        let found = scan_image_paths(dir.path(), &config(), false).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG", "d.tiff"]);
    }

    #[test]
    fn test_scan_recursive() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("top.jpg"), b"x").unwrap();
        fs::write(dir.path().join("sub").join("inner.png"), b"x").unwrap();

        assert_eq!(scan_image_paths(dir.path(), &config(), false).unwrap().len(), 1);
        assert_eq!(scan_image_paths(dir.path(), &config(), true).unwrap().len(), 2);
    }

    #[test]
    fn test_scan_uses_configured_extensions() {
        let dir = TempDir::new().unwrap();
        for name in ["a.jpg", "b.png", "c.webp"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let config = WatermarkConfig {
            extensions: vec![".webp".to_string(), ".png".to_string()],
            ..WatermarkConfig::default()
        };

        let found = scan_image_paths(dir.path(), &config, false).unwrap();
        assert_eq!(found, vec![dir.path().join("b.png"), dir.path().join("c.webp")]);
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let result = scan_image_paths(&dir.path().join("nope"), &config(), false);
        assert!(matches!(result, Err(WatermarkError::InputNotFound(_))));
    }
}
