use crate::extractor::{ConversionEvent, ExtractionKind};
use crate::ui::output::format_duration;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct ProgressManager {
    enabled: bool,
}

impl ProgressManager {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn create_spinner(&self, message: &str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        pb.set_message(message.to_string());
        pb
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new(true)
    }
}

pub fn update_conversion_progress(pb: &ProgressBar, event: &ConversionEvent) {
    match event {
        ConversionEvent::Started { kind, label } => {
            pb.set_message(format!("Converting {}...", describe(*kind, label)));
        }
        ConversionEvent::Skipped { kind, label } => {
            pb.println(format!("  reusing existing {}", describe(*kind, label)));
        }
        ConversionEvent::Finished { kind, label } => {
            pb.println(format!("  converted {}", describe(*kind, label)));
        }
    }
}

fn describe(kind: ExtractionKind, label: &Option<String>) -> String {
    match label {
        Some(label) => format!("{} ({})", kind, label),
        None => kind.to_string(),
    }
}

pub fn finish_progress_with_summary(pb: &ProgressBar, message: &str, duration: Duration) {
    let final_message = format!("{} (completed in {})", message, format_duration(duration));
    pb.finish_with_message(final_message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_manager_creation() {
        assert!(ProgressManager::new(true).is_enabled());
        assert!(!ProgressManager::new(false).is_enabled());
    }

    #[test]
    fn test_disabled_spinner_is_hidden() {
        let manager = ProgressManager::new(false);
        assert!(manager.create_spinner("test").is_hidden());
    }

    #[test]
    fn test_conversion_events_update_message() {
        let pb = ProgressBar::hidden();
        update_conversion_progress(
            &pb,
            &ConversionEvent::Started {
                kind: ExtractionKind::Images,
                label: Some("large".to_string()),
            },
        );
        assert_eq!(pb.message(), "Converting images (large)...");

        update_conversion_progress(
            &pb,
            &ConversionEvent::Started {
                kind: ExtractionKind::Text,
                label: None,
            },
        );
        assert_eq!(pb.message(), "Converting text...");
    }
}
