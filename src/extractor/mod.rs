pub mod converter;
pub mod layout;
pub mod orchestrator;
pub mod report;

pub use converter::{ConversionRequest, Converter, DocsplitConverter};
pub use layout::OutputLayout;
pub use orchestrator::{ConversionEvent, Uploader};
pub use report::ExtractionReport;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionKind {
    Images,
    Text,
}

impl ExtractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionKind::Images => "images",
            ExtractionKind::Text => "text",
        }
    }
}

impl std::fmt::Display for ExtractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived artifacts for one extraction kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionResult {
    /// Size label to page image paths, in page order.
    Images(BTreeMap<String, Vec<PathBuf>>),
    Text(Option<String>),
}

impl ExtractionResult {
    pub fn kind(&self) -> ExtractionKind {
        match self {
            ExtractionResult::Images(_) => ExtractionKind::Images,
            ExtractionResult::Text(_) => ExtractionKind::Text,
        }
    }

    pub fn as_images(&self) -> Option<&BTreeMap<String, Vec<PathBuf>>> {
        match self {
            ExtractionResult::Images(images) => Some(images),
            ExtractionResult::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ExtractionResult::Text(text) => text.as_deref(),
            ExtractionResult::Images(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ExtractionResult::Images(images) => images.is_empty(),
            ExtractionResult::Text(text) => text.is_none(),
        }
    }
}
