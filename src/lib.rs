pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod mount;
pub mod storage;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{
    CliOverrides, Config, ConverterConfig, ExtractionConfig, ImageExtraction, ImageFormat,
    StorageConfig, TextExtraction,
};
pub use error::{PageSplitError, Result, UserFriendlyError};

// Core functionality re-exports
pub use extractor::{
    ConversionEvent, ConversionRequest, Converter, DocsplitConverter, ExtractionKind,
    ExtractionReport, ExtractionResult, OutputLayout, Uploader,
};
pub use mount::{ExtractionObserver, Mount, TextField};
pub use storage::{FileStorage, Storage};
pub use ui::{OutputFormatter, OutputMode, ProgressManager};

use std::fs;
use std::path::Path;
use tracing::info;

/// Main library interface for the command line front end.
pub struct PageSplit {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
}

impl PageSplit {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);

        Self {
            config,
            output_formatter,
            progress_manager,
        }
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        };

        Ok(Self::new(
            config,
            output_mode,
            cli_args.verbose,
            cli_args.quiet,
        ))
    }

    /// Stores `document` (or binds to it when `retrieve` is set) and runs
    /// every configured extraction.
    pub fn extract_document(
        &self,
        document: &Path,
        retrieve: bool,
        force: bool,
    ) -> Result<ExtractionReport> {
        self.output_formatter
            .start_operation(&format!("Splitting {}", document.display()));

        let layout = OutputLayout::for_file(&self.config.storage.store_dir, document)?;
        if force && layout.root().exists() {
            info!("Removing earlier output in {}", layout.root().display());
            self.output_formatter
                .warning(&format!("Removing earlier output in {}", layout.root().display()));
            fs::remove_dir_all(layout.root())?;
        }

        if retrieve {
            self.output_formatter
                .info(&format!("Using stored file {}", document.display()));
        }

        let spinner = self.progress_manager.create_spinner("Preparing document");
        let uploader = Uploader::from_config(&self.config).with_progress({
            let pb = spinner.clone();
            move |event: &ConversionEvent| ui::progress::update_conversion_progress(&pb, event)
        });

        let mut mount = Mount::new(uploader);
        let outcome = if retrieve {
            let identifier = document.to_string_lossy();
            mount
                .uploader_mut()
                .retrieve_from_store(&identifier)
                .and_then(|_| mount.uploader().extract_all())
        } else {
            mount
                .assign(document)
                .and_then(|_| mount.uploader().extract_all())
        };

        let report = match outcome {
            Ok(report) => report,
            Err(e) => {
                spinner.finish_and_clear();
                return Err(e);
            }
        };

        ui::progress::finish_progress_with_summary(&spinner, "Extraction finished", report.duration);
        self.output_formatter.success(&format!(
            "Split {} into {}",
            document.display(),
            layout.root().display()
        ));

        if let (Some(field), Some(text)) = (mount.field_name(), mount.text_field().get()) {
            self.output_formatter
                .debug(&format!("Assigned {} characters to '{}'", text.chars().count(), field));
        }
        self.output_formatter.debug(&report.display_summary());

        Ok(report)
    }

    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn handle_error(&self, error: &PageSplitError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
