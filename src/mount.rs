use crate::error::Result;
use crate::extractor::Uploader;
use crate::storage::{FileStorage, Storage};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Receives extracted text on behalf of a companion record.
pub trait ExtractionObserver: Send + Sync {
    fn on_text_extracted(&self, field: &str, text: &str) -> Result<()>;
}

impl<F> ExtractionObserver for F
where
    F: Fn(&str, &str) -> Result<()> + Send + Sync,
{
    fn on_text_extracted(&self, field: &str, text: &str) -> Result<()> {
        self(field, text)
    }
}

/// A shared string slot a companion exposes as one of its fields.
#[derive(Debug, Clone, Default)]
pub struct TextField {
    value: Arc<Mutex<Option<String>>>,
}

impl TextField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        match self.value.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set<S: Into<String>>(&self, value: S) {
        let value = Some(value.into());
        match self.value.lock() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }

    pub fn clear(&self) {
        match self.value.lock() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

impl ExtractionObserver for TextField {
    fn on_text_extracted(&self, _field: &str, text: &str) -> Result<()> {
        self.set(text);
        Ok(())
    }
}

/// An uploader mounted on a companion record, together with the record's
/// text field.
///
/// Assigning a file stores it, and the uploader fills the text field as a
/// side effect when text extraction is declared.
pub struct Mount<S: Storage = FileStorage> {
    uploader: Uploader<S>,
    text: TextField,
}

impl<S: Storage> Mount<S> {
    pub fn new(uploader: Uploader<S>) -> Self {
        Self::with_field(uploader, TextField::new())
    }

    pub fn with_field(mut uploader: Uploader<S>, text: TextField) -> Self {
        uploader.bind(Arc::new(text.clone()));
        Self { uploader, text }
    }

    pub fn assign(&mut self, source: &Path) -> Result<PathBuf> {
        self.uploader.store(source)
    }

    pub fn uploader(&self) -> &Uploader<S> {
        &self.uploader
    }

    pub fn uploader_mut(&mut self) -> &mut Uploader<S> {
        &mut self.uploader
    }

    pub fn text_field(&self) -> &TextField {
        &self.text
    }

    /// Name of the companion field the text is written to.
    pub fn field_name(&self) -> Option<&str> {
        self.uploader.bound_field()
    }
}
