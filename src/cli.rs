use crate::config::{CliOverrides, Config, ImageFormat};
use crate::error::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pagesplit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Split stored documents into page images and text")]
#[command(
    long_about = "PageSplit stores a document in an upload directory and runs docsplit on it, \
                  writing page images per size and extracted text next to the upload."
)]
#[command(after_help = "EXAMPLES:\n  \
    pagesplit w9.pdf --size large=300x --size medium=500x\n  \
    pagesplit w9.pdf --no-images --text=body --output-format json\n  \
    pagesplit w9.pdf --retrieve --store-dir uploads\n  \
    pagesplit --generate-config --config pagesplit.toml")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Document to store and split
    #[arg(required_unless_present = "generate_config")]
    pub file: Option<PathBuf>,

    /// Directory uploads are stored in
    #[arg(short = 'd', long)]
    pub store_dir: Option<PathBuf>,

    /// Image size as LABEL=GEOMETRY (repeatable)
    #[arg(short, long = "size", value_parser = parse_size_arg)]
    pub sizes: Vec<(String, String)>,

    /// Accessor name for the page images
    #[arg(long)]
    pub images_to: Option<String>,

    /// Skip page image extraction
    #[arg(long)]
    pub no_images: bool,

    /// Extract text, optionally naming the field it is assigned to
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "text")]
    pub text: Option<String>,

    /// Page image format
    #[arg(long, value_enum)]
    pub format: Option<ImageFormat>,

    /// Converter executable
    #[arg(long, env = "PAGESPLIT_CONVERTER")]
    pub program: Option<String>,

    /// Converter timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Treat FILE as an identifier already in the store instead of copying it
    #[arg(long)]
    pub retrieve: bool,

    /// Remove earlier output for this document before extracting
    #[arg(long)]
    pub force: bool,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_store_dir(self.store_dir.clone())
            .with_program(self.program.clone())
            .with_timeout(self.timeout)
            .with_sizes(self.sizes.clone())
            .with_images_to(self.images_to.clone())
            .with_format(self.format)
            .with_no_images(self.no_images)
            .with_text_to(self.text.clone())
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

pub fn parse_size_arg(s: &str) -> std::result::Result<(String, String), String> {
    let (label, geometry) = s
        .split_once('=')
        .ok_or_else(|| format!("Expected LABEL=GEOMETRY, got '{}'", s))?;

    let label = label.trim();
    let geometry = geometry.trim();

    if label.is_empty() || geometry.is_empty() {
        return Err(format!("Expected LABEL=GEOMETRY, got '{}'", s));
    }

    Ok((label.to_string(), geometry.to_string()))
}
