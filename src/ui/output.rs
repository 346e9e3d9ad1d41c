use crate::error::{PageSplitError, UserFriendlyError};
use crate::extractor::ExtractionReport;
use console::{style, Emoji, Term};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

static DONE: Emoji = Emoji("✅ ", "✓ ");
static FAILED: Emoji = Emoji("❌ ", "✗ ");

/// Kinds of status line, ordered by how much verbosity they need.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Level {
    Error,
    Status,
    Success,
    Warning,
    Info,
    Debug,
}

impl Level {
    fn min_verbosity(self) -> u8 {
        match self {
            Level::Error | Level::Status | Level::Success | Level::Warning => 0,
            Level::Info => 1,
            Level::Debug => 2,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Level::Error => "error",
            Level::Status => "status",
            Level::Success => "success",
            Level::Warning => "warning",
            Level::Info => "info",
            Level::Debug => "debug",
        }
    }
}

/// Prints status lines and the extraction report in the selected mode.
pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let use_colors =
            mode == OutputMode::Human && !quiet && Term::stdout().features().colors_supported();

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn start_operation(&self, message: &str) {
        self.line(Level::Status, message);
    }

    pub fn success(&self, message: &str) {
        self.line(Level::Success, message);
    }

    pub fn warning(&self, message: &str) {
        self.line(Level::Warning, message);
    }

    pub fn info(&self, message: &str) {
        self.line(Level::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.line(Level::Debug, message);
    }

    /// Errors are printed even in quiet mode.
    pub fn error(&self, message: &str) {
        self.line(Level::Error, message);
    }

    pub fn print_user_friendly_error(&self, error: &PageSplitError) {
        self.error(&error.user_message());

        let Some(suggestion) = error.suggestion() else {
            return;
        };
        match self.mode {
            OutputMode::Json => println!(
                "{}",
                serde_json::json!({ "type": "suggestion", "message": suggestion })
            ),
            OutputMode::Human if self.use_colors => {
                eprintln!("{}", style(format!("Suggestion: {}", suggestion)).cyan())
            }
            _ => eprintln!("Suggestion: {}", suggestion),
        }
    }

    pub fn print_extraction_report(&self, report: &ExtractionReport) {
        match self.mode {
            OutputMode::Json => match serde_json::to_string_pretty(report) {
                Ok(json) => println!("{}", json),
                Err(e) => self.error(&format!("Could not serialize report: {}", e)),
            },
            OutputMode::Plain => self.print_plain_report(report),
            OutputMode::Human if !self.quiet => self.print_human_report(report),
            OutputMode::Human => {}
        }
    }

    fn shows(&self, level: Level) -> bool {
        level == Level::Error || (!self.quiet && self.verbose_level >= level.min_verbosity())
    }

    fn line(&self, level: Level, message: &str) {
        if !self.shows(level) {
            return;
        }

        match self.mode {
            OutputMode::Json => println!(
                "{}",
                serde_json::json!({
                    "type": "message",
                    "level": level.tag(),
                    "message": message,
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                })
            ),
            OutputMode::Plain => {
                let text = format!("{}: {}", level.tag().to_uppercase(), message);
                if level == Level::Error {
                    eprintln!("{}", text);
                } else {
                    println!("{}", text);
                }
            }
            OutputMode::Human => {
                let text = if self.use_colors {
                    match level {
                        Level::Error => format!("{}{}", FAILED, style(message).red().bold()),
                        Level::Success => format!("{}{}", DONE, style(message).green()),
                        Level::Warning => style(message).yellow().to_string(),
                        Level::Status => style(message).bold().to_string(),
                        Level::Info => style(message).cyan().to_string(),
                        Level::Debug => format!("  {}", style(message).dim()),
                    }
                } else {
                    format!("{}: {}", level.tag(), message)
                };

                if level == Level::Error {
                    eprintln!("{}", text);
                } else {
                    println!("{}", text);
                }
            }
        }
    }

    fn print_human_report(&self, report: &ExtractionReport) {
        if !report.has_file() {
            println!("No document stored");
            return;
        }

        if let Some(ref output_path) = report.output_path {
            let output = output_path.display().to_string();
            let output = if self.use_colors {
                style(output).bold().to_string()
            } else {
                output
            };
            println!("Output in {}", output);
        }

        for (label, pages) in report.images.iter().flatten() {
            println!("  {:<12} {} page(s)", label, pages.len());
            if self.verbose_level >= 2 {
                for page in pages {
                    println!("      {}", page.display());
                }
            }
        }

        if let Some(length) = report.text_length() {
            println!("  {:<12} {} characters", "text", length);
        }

        println!(
            "Finished {} in {}",
            report.extracted_at.format("%Y-%m-%d %H:%M UTC"),
            format_duration(report.duration)
        );
    }

    fn print_plain_report(&self, report: &ExtractionReport) {
        if let Some(ref source) = report.source {
            println!("Document: {}", source.display());
        }
        if let Some(ref output_path) = report.output_path {
            println!("Output: {}", output_path.display());
        }
        for (label, count) in report.page_counts() {
            println!("Pages[{}]: {}", label, count);
        }
        if let Some(length) = report.text_length() {
            println!("Text: {} characters", length);
        }
        println!("Duration: {}", format_duration(report.duration));
    }
}

pub(crate) fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}
