use clap::Parser;
use pagesplit::{Cli, OutputFormatter, OutputMode, PageSplit, PageSplitError, UserFriendlyError};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();

    setup_logging(&cli);

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let pagesplit = match PageSplit::from_cli(&cli) {
        Ok(pagesplit) => pagesplit,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for(&e);
        }
    };

    let Some(ref document) = cli.file else {
        pagesplit
            .output_formatter()
            .error("No document given");
        return 2;
    };

    match pagesplit.extract_document(document, cli.retrieve, cli.force) {
        Ok(report) => {
            pagesplit.output_formatter().print_extraction_report(&report);
            0
        }
        Err(e) => {
            pagesplit.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(error: &PageSplitError) -> i32 {
    match error {
        PageSplitError::Config { .. } => 2,
        PageSplitError::ConverterUnavailable { .. } => 3,
        PageSplitError::ConversionFailed { .. } | PageSplitError::NoOutput { .. } => 4,
        PageSplitError::Timeout { .. } => 5,
        PageSplitError::NoTargetForExtraction { .. } => 6,
        _ => 1,
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "pagesplit.toml".to_string());

    match PageSplit::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  pagesplit <document> --config {}", config_path);
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn print_startup_error(error: &PageSplitError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

fn setup_logging(cli: &Cli) {
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pagesplit={}", default_level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
