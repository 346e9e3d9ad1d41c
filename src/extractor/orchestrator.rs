use crate::config::{Config, ExtractionConfig};
use crate::error::{PageSplitError, Result};
use crate::extractor::converter::{ConversionRequest, Converter, DocsplitConverter};
use crate::extractor::layout::{self, OutputLayout};
use crate::extractor::report::ExtractionReport;
use crate::extractor::{ExtractionKind, ExtractionResult};
use crate::mount::ExtractionObserver;
use crate::storage::{FileStorage, Storage};
use chrono::Utc;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Progress notifications emitted around each converter run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionEvent {
    Started {
        kind: ExtractionKind,
        label: Option<String>,
    },
    Skipped {
        kind: ExtractionKind,
        label: Option<String>,
    },
    Finished {
        kind: ExtractionKind,
        label: Option<String>,
    },
}

struct Binding {
    field: String,
    observer: Arc<dyn ExtractionObserver>,
}

/// An uploader bound to one stored file, with lazily extracted artifacts.
pub struct Uploader<S: Storage = FileStorage> {
    storage: S,
    config: Arc<ExtractionConfig>,
    converter: Arc<dyn Converter>,
    images: RefCell<Option<BTreeMap<String, Vec<PathBuf>>>>,
    text: RefCell<Option<Option<String>>>,
    binding: Option<Binding>,
    progress_callback: Option<Box<dyn Fn(&ConversionEvent)>>,
}

impl Uploader<FileStorage> {
    /// Filesystem storage and the docsplit converter, both taken from `config`.
    pub fn from_config(config: &Config) -> Self {
        let converter = DocsplitConverter::new()
            .with_program(config.converter.program.clone())
            .with_timeout(config.converter_timeout());

        Self::new(
            FileStorage::new(config.storage.store_dir.clone()),
            Arc::new(config.extract.clone()),
            Arc::new(converter),
        )
    }
}

impl<S: Storage> Uploader<S> {
    pub fn new(storage: S, config: Arc<ExtractionConfig>, converter: Arc<dyn Converter>) -> Self {
        Self {
            storage,
            config,
            converter,
            images: RefCell::new(None),
            text: RefCell::new(None),
            binding: None,
            progress_callback: None,
        }
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ConversionEvent) + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.storage.current_path()
    }

    /// `<store_dir>/<stem>` for the stored file, or `None` before any upload.
    pub fn output_path(&self) -> Option<PathBuf> {
        self.layout()
            .ok()
            .flatten()
            .map(|layout| layout.root().to_path_buf())
    }

    /// Registers the companion field that receives extracted text, under the
    /// field name declared in the text extraction config.
    pub fn bind(&mut self, observer: Arc<dyn ExtractionObserver>) {
        let field = self
            .config
            .text
            .as_ref()
            .map(|text| text.to.clone())
            .unwrap_or_else(|| ExtractionKind::Text.to_string());
        self.bind_field(observer, field);
    }

    pub fn bind_field<F: Into<String>>(&mut self, observer: Arc<dyn ExtractionObserver>, field: F) {
        self.binding = Some(Binding {
            field: field.into(),
            observer,
        });
    }

    pub fn unbind(&mut self) {
        self.binding = None;
    }

    pub fn bound_field(&self) -> Option<&str> {
        self.binding.as_ref().map(|b| b.field.as_str())
    }

    /// Stores a new file, then pushes its text into the bound field when
    /// text extraction is configured.
    pub fn store(&mut self, source: &Path) -> Result<PathBuf> {
        let stored = self.storage.store(source)?;
        self.reset();

        if self.config.text.is_some() && self.binding.is_some() {
            self.enact_text_extraction()?;
        }

        Ok(stored)
    }

    pub fn retrieve_from_store(&mut self, identifier: &str) -> Result<PathBuf> {
        let path = self.storage.retrieve_from_store(identifier)?;
        self.reset();
        Ok(path)
    }

    /// Memoized result for `kind`, extracting on first access.
    pub fn get(&self, kind: ExtractionKind) -> Result<ExtractionResult> {
        match kind {
            ExtractionKind::Images => self.images().map(ExtractionResult::Images),
            ExtractionKind::Text => self.text().map(ExtractionResult::Text),
        }
    }

    /// Looks a result up by the accessor name it was declared under.
    pub fn accessor(&self, name: &str) -> Result<Option<ExtractionResult>> {
        if self.config.images.as_ref().is_some_and(|i| i.to == name) {
            return self.get(ExtractionKind::Images).map(Some);
        }
        if self.config.text.as_ref().is_some_and(|t| t.to == name) {
            return self.get(ExtractionKind::Text).map(Some);
        }
        Ok(None)
    }

    pub fn images(&self) -> Result<BTreeMap<String, Vec<PathBuf>>> {
        if let Some(ref cached) = *self.images.borrow() {
            return Ok(cached.clone());
        }

        let Some(layout) = self.layout()? else {
            return Ok(BTreeMap::new());
        };

        let images = self.extract_images(&layout)?;
        *self.images.borrow_mut() = Some(images.clone());
        Ok(images)
    }

    pub fn text(&self) -> Result<Option<String>> {
        if let Some(ref cached) = *self.text.borrow() {
            return Ok(cached.clone());
        }

        let Some(layout) = self.layout()? else {
            return Ok(None);
        };

        let text = self.extract_text(&layout)?;
        *self.text.borrow_mut() = Some(text.clone());
        Ok(text)
    }

    /// Extracts text and writes it into the bound companion field.
    ///
    /// Fails with [`PageSplitError::NoTargetForExtraction`] when text
    /// extraction is not declared or no field is bound.
    pub fn enact_text_extraction(&self) -> Result<Option<String>> {
        let binding = match (&self.config.text, &self.binding) {
            (Some(_), Some(binding)) => binding,
            _ => {
                return Err(PageSplitError::NoTargetForExtraction {
                    kind: ExtractionKind::Text,
                })
            }
        };

        let text = self.text()?;
        if let Some(ref text) = text {
            debug!("Assigning {} bytes of text to '{}'", text.len(), binding.field);
            binding.observer.on_text_extracted(&binding.field, text)?;
        }

        Ok(text)
    }

    /// Runs every declared extraction.
    pub fn extract_all(&self) -> Result<ExtractionReport> {
        let start = Instant::now();

        let images = match self.config.images {
            Some(_) => Some(self.images()?),
            None => None,
        };

        let text = match self.config.text {
            Some(_) => self.text()?,
            None => None,
        };

        Ok(ExtractionReport {
            source: self.current_path().map(Path::to_path_buf),
            output_path: self.output_path(),
            images,
            text,
            extracted_at: Utc::now(),
            duration: start.elapsed(),
        })
    }

    fn reset(&self) {
        self.images.borrow_mut().take();
        self.text.borrow_mut().take();
    }

    fn layout(&self) -> Result<Option<OutputLayout>> {
        match self.storage.current_path() {
            Some(path) => OutputLayout::for_file(self.storage.store_dir(), path).map(Some),
            None => Ok(None),
        }
    }

    fn extract_images(&self, layout: &OutputLayout) -> Result<BTreeMap<String, Vec<PathBuf>>> {
        let Some(ref images) = self.config.images else {
            return Err(PageSplitError::Config {
                message: "Image extraction is not configured".to_string(),
            });
        };

        let input = self.require_source()?;
        let mut results = BTreeMap::new();

        for (label, geometry) in images.size_entries() {
            let output_dir = layout.images_dir(&label)?;

            if layout::has_artifacts(&output_dir) {
                debug!("Reusing existing {} pages in {}", label, output_dir.display());
                self.notify(ConversionEvent::Skipped {
                    kind: ExtractionKind::Images,
                    label: Some(label.clone()),
                });
            } else {
                self.notify(ConversionEvent::Started {
                    kind: ExtractionKind::Images,
                    label: Some(label.clone()),
                });

                self.converter.convert(&ConversionRequest {
                    input: input.clone(),
                    kind: ExtractionKind::Images,
                    output_dir: output_dir.clone(),
                    geometry,
                    format: images.format,
                })?;

                self.notify(ConversionEvent::Finished {
                    kind: ExtractionKind::Images,
                    label: Some(label.clone()),
                });
            }

            let pages = layout::scan_pages(&output_dir)?;
            if pages.is_empty() {
                return Err(PageSplitError::NoOutput {
                    path: output_dir.display().to_string(),
                });
            }

            info!("{} page(s) at size '{}'", pages.len(), label);
            results.insert(label, pages);
        }

        Ok(results)
    }

    fn extract_text(&self, layout: &OutputLayout) -> Result<Option<String>> {
        if self.config.text.is_none() {
            return Err(PageSplitError::Config {
                message: "Text extraction is not configured".to_string(),
            });
        }

        let output_dir = layout.text_dir();

        if layout::has_artifacts(&output_dir) {
            debug!("Reusing existing text in {}", output_dir.display());
            self.notify(ConversionEvent::Skipped {
                kind: ExtractionKind::Text,
                label: None,
            });
        } else {
            let input = self.require_source()?;
            self.notify(ConversionEvent::Started {
                kind: ExtractionKind::Text,
                label: None,
            });

            self.converter.convert(&ConversionRequest {
                input,
                kind: ExtractionKind::Text,
                output_dir: output_dir.clone(),
                geometry: None,
                format: Default::default(),
            })?;

            self.notify(ConversionEvent::Finished {
                kind: ExtractionKind::Text,
                label: None,
            });
        }

        match layout::read_text(layout)? {
            Some(text) => Ok(Some(text)),
            None => Err(PageSplitError::NoOutput {
                path: output_dir.display().to_string(),
            }),
        }
    }

    fn require_source(&self) -> Result<PathBuf> {
        self.storage
            .current_path()
            .map(Path::to_path_buf)
            .ok_or_else(|| PageSplitError::InvalidPath {
                path: "no stored file".to_string(),
            })
    }

    fn notify(&self, event: ConversionEvent) {
        if let Some(ref callback) = self.progress_callback {
            callback(&event);
        }
    }
}
