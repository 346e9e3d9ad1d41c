use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub source: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<BTreeMap<String, Vec<PathBuf>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub extracted_at: DateTime<Utc>,
    pub duration: Duration,
}

impl ExtractionReport {
    pub fn page_counts(&self) -> BTreeMap<String, usize> {
        self.images
            .as_ref()
            .map(|images| {
                images
                    .iter()
                    .map(|(label, pages)| (label.clone(), pages.len()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn text_length(&self) -> Option<usize> {
        self.text.as_ref().map(|t| t.chars().count())
    }

    pub fn has_file(&self) -> bool {
        self.source.is_some()
    }

    pub fn display_summary(&self) -> String {
        let mut lines = Vec::new();

        match self.source {
            Some(ref source) => lines.push(format!("Source: {}", source.display())),
            None => lines.push("Source: (no file stored)".to_string()),
        }

        if let Some(ref output_path) = self.output_path {
            lines.push(format!("Output: {}", output_path.display()));
        }

        for (label, count) in self.page_counts() {
            lines.push(format!("  {}: {} page(s)", label, count));
        }

        if let Some(length) = self.text_length() {
            lines.push(format!("  text: {} characters", length));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ExtractionReport {
        ExtractionReport {
            source: Some(PathBuf::from("/u/w9.pdf")),
            output_path: Some(PathBuf::from("/u/w9")),
            images: Some(BTreeMap::from([
                (
                    "large".to_string(),
                    vec![PathBuf::from("/u/w9/large/w9_1.png")],
                ),
                ("medium".to_string(), Vec::new()),
            ])),
            text: Some("Form W-9".to_string()),
            extracted_at: Utc::now(),
            duration: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_page_counts() {
        let counts = report().page_counts();
        assert_eq!(counts["large"], 1);
        assert_eq!(counts["medium"], 0);
    }

    #[test]
    fn test_report_without_file() {
        let empty = ExtractionReport {
            source: None,
            output_path: None,
            images: Some(BTreeMap::new()),
            text: None,
            extracted_at: Utc::now(),
            duration: Duration::ZERO,
        };
        assert!(!empty.has_file());
        assert!(empty.page_counts().is_empty());
        assert!(empty.display_summary().contains("(no file stored)"));
    }

    #[test]
    fn test_summary_lists_sizes_and_text() {
        let summary = report().display_summary();
        assert!(summary.contains("Source: /u/w9.pdf"));
        assert!(summary.contains("large: 1 page(s)"));
        assert!(summary.contains("text: 8 characters"));
    }

    #[test]
    fn test_json_serialization() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["output_path"], "/u/w9");
        assert!(json["images"]["large"].is_array());
    }
}
