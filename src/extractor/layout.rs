use crate::error::{PageSplitError, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Subdirectory the text output is written to.
pub const TEXT_SUBDIR: &str = "text";

/// Where extraction output for one stored file lives.
///
/// `<store_dir>/<stem>/<size-label>/*` for page images and
/// `<store_dir>/<stem>/text/<stem>.txt` for text. Derived only from the
/// store directory and the stored file name, so an earlier run's output can
/// be found again without invoking the converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
    stem: String,
}

impl OutputLayout {
    pub fn for_file(store_dir: &Path, stored: &Path) -> Result<Self> {
        let stem = stored
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PageSplitError::InvalidPath {
                path: format!("{} has no usable file name", stored.display()),
            })?
            .to_string();

        // Without an extension the output directory would be the stored file itself
        if stored.file_name().and_then(|s| s.to_str()) == Some(stem.as_str()) {
            return Err(PageSplitError::InvalidPath {
                path: format!(
                    "{} has no file extension, so its output directory would collide with it",
                    stored.display()
                ),
            });
        }

        Ok(Self {
            root: store_dir.join(&stem),
            stem,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Output directory for one size label. The label must be a single
    /// plain path component so the pages stay under [`Self::root`].
    pub fn images_dir(&self, label: &str) -> Result<PathBuf> {
        let mut components = Path::new(label).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(label)),
            _ => Err(PageSplitError::InvalidPath {
                path: format!("size label '{}' is not a plain directory name", label),
            }),
        }
    }

    pub fn text_dir(&self) -> PathBuf {
        self.root.join(TEXT_SUBDIR)
    }

    pub fn text_file(&self) -> PathBuf {
        self.text_dir().join(format!("{}.txt", self.stem))
    }
}

/// True when `dir` holds at least one file [`scan_pages`] would return.
///
/// This is the whole "already extracted" check: a run that died halfway
/// looks the same as a finished one.
pub fn has_artifacts(dir: &Path) -> bool {
    match fs::read_dir(dir) {
        Ok(entries) => entries.flatten().any(|entry| {
            entry.file_type().is_ok_and(|t| t.is_file()) && !is_hidden(&entry.file_name())
        }),
        Err(_) => false,
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Files directly inside `dir`, sorted by file name.
///
/// Page order is recovered from the sort, which only holds while the
/// converter zero-pads page numbers.
pub fn scan_pages(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut pages = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| PageSplitError::Io(e.into()))?;

        if !entry.file_type().is_file() {
            continue;
        }

        if is_hidden(entry.file_name()) {
            continue;
        }

        pages.push(entry.into_path());
    }

    pages.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!("Found {} page files in {}", pages.len(), dir.display());

    Ok(pages)
}

/// Reads the text output, preferring `<stem>.txt` and falling back to the
/// first `.txt` file in the text directory.
pub fn read_text(layout: &OutputLayout) -> Result<Option<String>> {
    let expected = layout.text_file();
    if expected.is_file() {
        return read_text_file(&expected).map(Some);
    }

    let fallback = scan_pages(&layout.text_dir())?
        .into_iter()
        .find(|p| p.extension().is_some_and(|ext| ext == "txt"));

    match fallback {
        Some(path) => {
            debug!("Using {} as text output", path.display());
            read_text_file(&path).map(Some)
        }
        None => Ok(None),
    }
}

/// Converter text is taken as-is; invalid UTF-8 is replaced rather than
/// failing the extraction.
fn read_text_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            warn!("{} is not valid UTF-8, replacing invalid bytes", path.display());
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}
