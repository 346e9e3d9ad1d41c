use crate::extractor::ExtractionKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PageSplitError {
    #[error("No target bound to receive {kind} extraction")]
    NoTargetForExtraction { kind: ExtractionKind },

    #[error("Converter '{program}' could not be started")]
    ConverterUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Converter '{program}' failed with status {status}: {stderr}")]
    ConversionFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Converter produced no output in {path}")]
    NoOutput { path: String },

    #[error("Conversion timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },

    #[error("Source file not found: {path}")]
    MissingSourceFile { path: String },
}

impl PageSplitError {
    /// True for every way the external converter can let us down.
    pub fn is_conversion_failure(&self) -> bool {
        matches!(
            self,
            PageSplitError::ConverterUnavailable { .. }
                | PageSplitError::ConversionFailed { .. }
                | PageSplitError::NoOutput { .. }
                | PageSplitError::Timeout { .. }
        )
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for PageSplitError {
    fn user_message(&self) -> String {
        match self {
            PageSplitError::NoTargetForExtraction { kind } => {
                format!("Nothing is bound to receive the extracted {}", kind)
            }
            PageSplitError::ConverterUnavailable { program, source } => {
                format!("Could not run converter '{}': {}", program, source)
            }
            PageSplitError::ConversionFailed {
                program,
                status,
                stderr,
            } => {
                let stderr = stderr.trim();
                if stderr.is_empty() {
                    format!("Converter '{}' exited with {}", program, status)
                } else {
                    format!("Converter '{}' exited with {}: {}", program, status, stderr)
                }
            }
            PageSplitError::NoOutput { path } => {
                format!("Converter finished but wrote nothing to {}", path)
            }
            PageSplitError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            PageSplitError::MissingSourceFile { path } => {
                format!("Document not found: {}", path)
            }
            PageSplitError::InvalidPath { path } => {
                format!("Invalid file path: {}", path)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            PageSplitError::NoTargetForExtraction { .. } => Some(
                "Mount the uploader on a record, or bind a text field before enacting text extraction.".to_string()
            ),
            PageSplitError::ConverterUnavailable { .. } => Some(
                "Install docsplit (gem install docsplit) or point --program at the converter executable.".to_string()
            ),
            PageSplitError::ConversionFailed { .. } => Some(
                "Check that the document opens correctly and that the converter's own dependencies (GraphicsMagick, poppler) are installed.".to_string()
            ),
            PageSplitError::NoOutput { .. } => Some(
                "Remove the output directory and try again; the converter may not support this document type.".to_string()
            ),
            PageSplitError::Timeout { .. } => Some(
                "Large documents take a while. Increase the limit with --timeout.".to_string()
            ),
            PageSplitError::Config { .. } => Some(
                "Check your configuration file syntax and ensure sizes look like 300x, x200, 300x200 or 50%.".to_string()
            ),
            PageSplitError::MissingSourceFile { .. } => Some(
                "Make sure the document path exists and is readable.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for PageSplitError {
    fn from(error: toml::de::Error) -> Self {
        PageSplitError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PageSplitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_friendly_messages() {
        let error = PageSplitError::NoTargetForExtraction {
            kind: ExtractionKind::Text,
        };
        assert!(error.user_message().contains("extracted text"));
        assert!(error.suggestion().is_some());
    }

    #[test]
    fn test_conversion_failure_classification() {
        let failed = PageSplitError::ConversionFailed {
            program: "docsplit".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "boom".to_string(),
        };
        assert!(failed.is_conversion_failure());
        assert!(failed.user_message().contains("boom"));

        assert!(PageSplitError::Timeout { seconds: 5 }.is_conversion_failure());
        assert!(!PageSplitError::NoTargetForExtraction {
            kind: ExtractionKind::Text
        }
        .is_conversion_failure());
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_error = toml::from_str::<toml::Value>("not = = toml").unwrap_err();
        let error = PageSplitError::from(toml_error);
        assert!(matches!(error, PageSplitError::Config { .. }));
    }
}
