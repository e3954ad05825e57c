//! Watermarking configuration
//!
//! Every pipeline invocation receives a `WatermarkConfig`; nothing is kept
//! in global state. Selected values can be overridden from a TOML file:
//!
//! ```toml
//! output_dir_name = "watermarked images"
//! font_path = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"
//! workers = 4
//! extensions = [".jpg", ".png"]
//! ```

use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{WatermarkError, WatermarkResult};

/// Name of the output directory created next to the inputs
pub const DEFAULT_OUTPUT_DIR_NAME: &str = "watermarked images";

/// Watermark text color (RGB)
pub const TEXT_COLOR: [u8; 3] = [255, 0, 221];

/// Settings for a watermarking run
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkConfig {
    /// Name of the output subdirectory
    pub output_dir_name: String,
    /// TrueType font used for the watermark text; a bare file name is
    /// also looked up in the system font directories
    pub font_path: PathBuf,
    /// Font size that suits an image of `reference_width` pixels
    pub reference_font_size: f32,
    /// Image width the reference font size was chosen for
    pub reference_width: u32,
    /// Distance from the image edges for metadata placements
    pub margin: u32,
    /// Top-left offset used when the image has no metadata
    pub fallback_offset: (i32, i32),
    /// Font size used when the image has no metadata
    pub fallback_font_size: f32,
    /// JPEG encoding quality
    pub jpeg_quality: u8,
    /// Accepted file extensions, lowercase with leading dot
    pub extensions: Vec<String>,
    /// Watermark color
    pub text_color: [u8; 3],
    /// Worker pool size, `None` for the number of CPUs
    pub workers: Option<usize>,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        WatermarkConfig {
            output_dir_name: DEFAULT_OUTPUT_DIR_NAME.to_string(),
            font_path: PathBuf::from("arial.ttf"),
            reference_font_size: 16.0,
            reference_width: 198,
            margin: 2,
            fallback_offset: (5, 5),
            fallback_font_size: 11.0,
            jpeg_quality: 100,
            extensions: [".jpg", ".jpeg", ".png", ".tif", ".tiff"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            text_color: TEXT_COLOR,
            workers: None,
        }
    }
}

impl WatermarkConfig {
    /// Loads overrides from a TOML file on top of the defaults
    pub fn from_file(path: &Path) -> WatermarkResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses overrides from TOML text on top of the defaults
    pub fn from_toml_str(content: &str) -> WatermarkResult<Self> {
        let table: toml::Table = content
            .parse()
            .map_err(|e: toml::de::Error| WatermarkError::ConfigError(e.to_string()))?;

        let mut config = WatermarkConfig::default();

        for (key, value) in &table {
            match key.as_str() {
                "output_dir_name" => {
                    let name = value.as_str().ok_or_else(|| type_error(key, "a string"))?;
                    if name.is_empty() || name.contains(['/', '\\']) {
                        return Err(WatermarkError::ConfigError(format!(
                            "output_dir_name must be a plain directory name, got '{}'",
                            name
                        )));
                    }
                    config.output_dir_name = name.to_string();
                }
                "font_path" => {
                    let path = value.as_str().ok_or_else(|| type_error(key, "a string"))?;
                    config.font_path = PathBuf::from(path);
                }
                "workers" => {
                    let workers = value
                        .as_integer()
                        .filter(|w| *w > 0)
                        .ok_or_else(|| type_error(key, "a positive integer"))?;
                    config.workers = Some(workers as usize);
                }
                "extensions" => {
                    let list = value.as_array().ok_or_else(|| type_error(key, "an array"))?;
                    let mut extensions = Vec::with_capacity(list.len());
                    for item in list {
                        let ext = item.as_str().ok_or_else(|| type_error(key, "an array of strings"))?;
                        extensions.push(normalize_extension(ext));
                    }
                    config.extensions = extensions;
                }
                other => warn!("Ignoring unknown configuration key '{}'", other),
            }
        }

        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Font size for an image of the given width
    ///
    /// Scales the reference size linearly and truncates to whole pixels.
    pub fn font_size_for_width(&self, image_width: u32) -> f32 {
        let size = (self.reference_font_size * image_width as f32 / self.reference_width as f32).floor();
        size.max(1.0)
    }

    /// Whether the file name has one of the accepted extensions
    pub fn accepts(&self, path: &Path) -> bool {
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().to_lowercase(),
            None => return false,
        };
        self.extensions.iter().any(|ext| name.ends_with(ext.as_str()))
    }

    /// Output directory for inputs found in `input_dir`
    pub fn output_dir_for(&self, input_dir: &Path) -> PathBuf {
        input_dir.join(&self.output_dir_name)
    }
}

fn type_error(key: &str, expected: &str) -> WatermarkError {
    WatermarkError::ConfigError(format!("'{}' must be {}", key, expected))
}

fn normalize_extension(ext: &str) -> String {
    let lower = ext.trim().to_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{}", lower)
    }
}
