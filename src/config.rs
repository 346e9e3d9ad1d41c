use crate::error::{PageSplitError, Result};
use crate::extractor::layout::TEXT_SUBDIR;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Label used when images are requested without any explicit size.
pub const ORIGINAL_SIZE_LABEL: &str = "original";

const GEOMETRY_PATTERN: &str = r"^(?:\d+x\d*|x\d+|\d+)[!<>^]?$|^\d+%$";
const NAME_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9_.-]*$";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub extract: ExtractionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub store_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConverterConfig {
    pub program: String,
    /// Seconds before the converter is killed. Unset means wait forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Which extractions run for an uploader type, and where their results go.
///
/// Declared once and shared by every uploader of that type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExtractionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<ImageExtraction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextExtraction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ImageExtraction {
    /// Accessor name the page images are exposed under.
    pub to: String,
    #[serde(default)]
    pub format: ImageFormat,
    /// Size label to geometry (`300x`, `x200`, `300x200`, `50%`).
    #[serde(default)]
    pub sizes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TextExtraction {
    /// Companion field that receives the extracted text.
    pub to: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Gif,
    Jpg,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Jpg => "jpg",
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ImageExtraction {
    /// Sizes to render, in label order. No configured sizes means one
    /// native-size rendering under [`ORIGINAL_SIZE_LABEL`].
    pub fn size_entries(&self) -> Vec<(String, Option<String>)> {
        if self.sizes.is_empty() {
            return vec![(ORIGINAL_SIZE_LABEL.to_string(), None)];
        }

        self.sizes
            .iter()
            .map(|(label, geometry)| (label.clone(), Some(geometry.clone())))
            .collect()
    }
}

impl ExtractionConfig {
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder::default()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_none() && self.text.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        let name_re = compile(NAME_PATTERN)?;
        let geometry_re = compile(GEOMETRY_PATTERN)?;

        if let Some(ref images) = self.images {
            if !name_re.is_match(&images.to) {
                return Err(PageSplitError::Config {
                    message: format!("Invalid image accessor name: '{}'", images.to),
                });
            }

            for (label, geometry) in &images.sizes {
                // Labels become directory names under the output path
                if !name_re.is_match(label) {
                    return Err(PageSplitError::Config {
                        message: format!("Invalid size label: '{}'", label),
                    });
                }

                if label == TEXT_SUBDIR {
                    return Err(PageSplitError::Config {
                        message: format!("Size label '{}' is reserved for extracted text", label),
                    });
                }

                if !geometry_re.is_match(geometry) {
                    return Err(PageSplitError::Config {
                        message: format!(
                            "Invalid geometry '{}' for size '{}'",
                            geometry, label
                        ),
                    });
                }
            }
        }

        if let Some(ref text) = self.text {
            if !name_re.is_match(&text.to) {
                return Err(PageSplitError::Config {
                    message: format!("Invalid text field name: '{}'", text.to),
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ExtractionConfigBuilder {
    images: Option<ImageExtraction>,
    text: Option<TextExtraction>,
}

impl ExtractionConfigBuilder {
    pub fn images<S: Into<String>>(mut self, to: S) -> Self {
        let to = to.into();
        match self.images {
            Some(ref mut images) => images.to = to,
            None => {
                self.images = Some(ImageExtraction {
                    to,
                    format: ImageFormat::default(),
                    sizes: BTreeMap::new(),
                })
            }
        }
        self
    }

    pub fn size<L: Into<String>, G: Into<String>>(mut self, label: L, geometry: G) -> Self {
        if self.images.is_none() {
            self = self.images("images");
        }
        if let Some(ref mut images) = self.images {
            images.sizes.insert(label.into(), geometry.into());
        }
        self
    }

    pub fn sizes<I, L, G>(mut self, sizes: I) -> Self
    where
        I: IntoIterator<Item = (L, G)>,
        L: Into<String>,
        G: Into<String>,
    {
        for (label, geometry) in sizes {
            self = self.size(label, geometry);
        }
        self
    }

    pub fn format(mut self, format: ImageFormat) -> Self {
        if self.images.is_none() {
            self = self.images("images");
        }
        if let Some(ref mut images) = self.images {
            images.format = format;
        }
        self
    }

    pub fn text<S: Into<String>>(mut self, to: S) -> Self {
        self.text = Some(TextExtraction { to: to.into() });
        self
    }

    pub fn build(self) -> Result<ExtractionConfig> {
        let config = ExtractionConfig {
            images: self.images,
            text: self.text,
        };
        config.validate()?;
        Ok(config)
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| PageSplitError::Config {
        message: format!("Invalid pattern {}: {}", pattern, e),
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            converter: ConverterConfig::default(),
            extract: ExtractionConfig {
                images: Some(ImageExtraction {
                    to: "pages".to_string(),
                    format: ImageFormat::Png,
                    sizes: BTreeMap::from([
                        ("large".to_string(), "1000x".to_string()),
                        ("small".to_string(), "180x".to_string()),
                    ]),
                }),
                text: None,
            },
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_dir: std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("uploads"),
        }
    }
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: "docsplit".to_string(),
            timeout: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(PageSplitError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| PageSplitError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| PageSplitError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["pagesplit.toml", ".pagesplit.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref store_dir) = cli_args.store_dir {
            self.storage.store_dir = store_dir.clone();
        }

        if let Some(ref program) = cli_args.program {
            self.converter.program = program.clone();
        }

        if let Some(timeout) = cli_args.timeout {
            self.converter.timeout = Some(timeout);
        }

        // Sizes given on the command line replace the configured set
        if !cli_args.sizes.is_empty() {
            let images = self.extract.images.get_or_insert_with(|| ImageExtraction {
                to: "pages".to_string(),
                format: ImageFormat::default(),
                sizes: BTreeMap::new(),
            });
            images.sizes = cli_args.sizes.iter().cloned().collect();
        }

        if let Some(ref images_to) = cli_args.images_to {
            match self.extract.images {
                Some(ref mut images) => images.to = images_to.clone(),
                None => {
                    self.extract.images = Some(ImageExtraction {
                        to: images_to.clone(),
                        format: ImageFormat::default(),
                        sizes: BTreeMap::new(),
                    })
                }
            }
        }

        if let Some(format) = cli_args.format {
            if let Some(ref mut images) = self.extract.images {
                images.format = format;
            }
        }

        if cli_args.no_images {
            self.extract.images = None;
        }

        if let Some(ref text_to) = cli_args.text_to {
            self.extract.text = Some(TextExtraction {
                to: text_to.clone(),
            });
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| PageSplitError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| PageSplitError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.converter.program.trim().is_empty() {
            return Err(PageSplitError::Config {
                message: "Converter program must not be empty".to_string(),
            });
        }

        if self.converter.timeout == Some(0) {
            return Err(PageSplitError::Config {
                message: "Converter timeout must be greater than 0".to_string(),
            });
        }

        if self.extract.is_empty() {
            return Err(PageSplitError::Config {
                message: "At least one of image or text extraction must be configured"
                    .to_string(),
            });
        }

        self.extract.validate()
    }

    pub fn converter_timeout(&self) -> Option<Duration> {
        self.converter.timeout.map(Duration::from_secs)
    }

    pub fn create_sample_config() -> String {
        let mut sample_config = Self::default();
        sample_config.extract.text = Some(TextExtraction {
            to: "body".to_string(),
        });
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub store_dir: Option<PathBuf>,
    pub program: Option<String>,
    pub timeout: Option<u64>,
    pub sizes: Vec<(String, String)>,
    pub images_to: Option<String>,
    pub format: Option<ImageFormat>,
    pub no_images: bool,
    pub text_to: Option<String>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store_dir(mut self, store_dir: Option<PathBuf>) -> Self {
        self.store_dir = store_dir;
        self
    }

    pub fn with_program(mut self, program: Option<String>) -> Self {
        self.program = program;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<u64>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_sizes(mut self, sizes: Vec<(String, String)>) -> Self {
        self.sizes = sizes;
        self
    }

    pub fn with_images_to(mut self, images_to: Option<String>) -> Self {
        self.images_to = images_to;
        self
    }

    pub fn with_format(mut self, format: Option<ImageFormat>) -> Self {
        self.format = format;
        self
    }

    pub fn with_no_images(mut self, no_images: bool) -> Self {
        self.no_images = no_images;
        self
    }

    pub fn with_text_to(mut self, text_to: Option<String>) -> Self {
        self.text_to = text_to;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.converter.program, "docsplit");
        assert!(config.converter.timeout.is_none());

        let images = config.extract.images.as_ref().unwrap();
        assert_eq!(images.to, "pages");
        assert!(images.sizes.contains_key("large"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_declares_both_kinds() {
        let config = ExtractionConfig::builder()
            .images("thumbs")
            .size("large", "300x")
            .size("medium", "500x")
            .text("tail")
            .build()
            .unwrap();

        let images = config.images.unwrap();
        assert_eq!(images.to, "thumbs");
        assert_eq!(images.sizes.len(), 2);
        assert_eq!(images.sizes["medium"], "500x");
        assert_eq!(config.text.unwrap().to, "tail");
    }

    #[test]
    fn test_geometry_validation() {
        for geometry in ["300x", "x200", "300x200", "640", "50%", "1000x>"] {
            assert!(
                ExtractionConfig::builder().size("s", geometry).build().is_ok(),
                "Should accept: {}",
                geometry
            );
        }

        for geometry in ["", "x", "big", "300y200", "-5x", " 300x", "300x\n"] {
            assert!(
                ExtractionConfig::builder().size("s", geometry).build().is_err(),
                "Should reject: {}",
                geometry
            );
        }
    }

    #[test]
    fn test_label_validation() {
        assert!(ExtractionConfig::builder().size("../up", "300x").build().is_err());
        assert!(ExtractionConfig::builder().size("a/b", "300x").build().is_err());
        assert!(ExtractionConfig::builder().size("text", "300x").build().is_err());
        assert!(ExtractionConfig::builder().text("").build().is_err());
    }

    #[test]
    fn test_size_entries_without_sizes() {
        let config = ExtractionConfig::builder().images("thumbs").build().unwrap();
        let entries = config.images.unwrap().size_entries();
        assert_eq!(entries, vec![(ORIGINAL_SIZE_LABEL.to_string(), None)]);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.converter.timeout = Some(0);
        assert!(config.validate().is_err());

        config.converter.timeout = None;
        config.extract = ExtractionConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_operations() {
        let mut config = Config::default();
        config.converter.timeout = Some(90);
        let temp_file = NamedTempFile::new().unwrap();

        config.save_to_file(temp_file.path()).unwrap();

        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded_config.converter.timeout, Some(90));
        assert_eq!(loaded_config.extract, config.extract);
    }

    #[test]
    fn test_partial_config_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut temp_file,
            b"[extract.text]\nto = \"body\"\n",
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(config.converter.program, "docsplit");
        assert!(config.extract.images.is_none());
        assert_eq!(config.extract.text.unwrap().to, "body");
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();

        let overrides = CliOverrides::new()
            .with_timeout(Some(600))
            .with_program(Some("/opt/bin/docsplit".to_string()))
            .with_sizes(vec![("thumb".to_string(), "60x".to_string())])
            .with_format(Some(ImageFormat::Gif))
            .with_text_to(Some("body".to_string()));

        config.merge_with_cli_args(&overrides);

        assert_eq!(config.converter.timeout, Some(600));
        assert_eq!(config.converter.program, "/opt/bin/docsplit");

        let images = config.extract.images.as_ref().unwrap();
        assert_eq!(images.to, "pages");
        assert_eq!(images.format, ImageFormat::Gif);
        assert_eq!(images.sizes.len(), 1);
        assert_eq!(images.sizes["thumb"], "60x");
        assert_eq!(config.extract.text.as_ref().unwrap().to, "body");
    }

    #[test]
    fn test_cli_overrides_disable_images() {
        let mut config = Config::default();
        let overrides = CliOverrides::new()
            .with_no_images(true)
            .with_text_to(Some("body".to_string()));

        config.merge_with_cli_args(&overrides);

        assert!(config.extract.images.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sample_config_generation() {
        let sample = Config::create_sample_config();
        assert!(!sample.is_empty());
        assert!(sample.contains("[storage]"));
        assert!(sample.contains("[converter]"));
        assert!(sample.contains("docsplit"));
    }
}
