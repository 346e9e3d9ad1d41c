use crate::error::{PageSplitError, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Persists the original upload and reports where it lives.
pub trait Storage {
    /// Directory uploads are stored in; extraction output lives beneath it.
    fn store_dir(&self) -> &Path;

    /// Absolute path of the currently stored file, if any.
    fn current_path(&self) -> Option<&Path>;

    /// Copies `source` into the store and makes it the current file.
    fn store(&mut self, source: &Path) -> Result<PathBuf>;

    /// Binds to a file that was stored earlier, without copying anything.
    fn retrieve_from_store(&mut self, identifier: &str) -> Result<PathBuf>;
}

/// Local-filesystem storage rooted at a single directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    store_dir: PathBuf,
    current: Option<PathBuf>,
}

impl FileStorage {
    pub fn new<P: Into<PathBuf>>(store_dir: P) -> Self {
        let store_dir = store_dir.into();
        let store_dir = if store_dir.is_absolute() {
            store_dir
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&store_dir))
                .unwrap_or(store_dir)
        };

        Self {
            store_dir,
            current: None,
        }
    }

    fn resolve_identifier(&self, identifier: &str) -> Result<PathBuf> {
        let candidate = Path::new(identifier);

        if identifier.trim().is_empty() {
            return Err(PageSplitError::InvalidPath {
                path: "empty identifier".to_string(),
            });
        }

        if candidate.is_absolute() {
            return Ok(candidate.to_path_buf());
        }

        if candidate
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(PageSplitError::InvalidPath {
                path: format!("{} escapes the store directory", identifier),
            });
        }

        Ok(self.store_dir.join(candidate))
    }
}

impl Storage for FileStorage {
    fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    fn current_path(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    fn store(&mut self, source: &Path) -> Result<PathBuf> {
        if !source.is_file() {
            return Err(PageSplitError::MissingSourceFile {
                path: source.display().to_string(),
            });
        }

        let file_name = source.file_name().ok_or_else(|| PageSplitError::InvalidPath {
            path: source.display().to_string(),
        })?;

        fs::create_dir_all(&self.store_dir)?;
        let destination = self.store_dir.join(file_name);

        let same_file = match (source.canonicalize(), destination.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };

        if same_file {
            debug!("{} is already in the store", destination.display());
        } else {
            fs::copy(source, &destination)?;
            debug!("Stored {} at {}", source.display(), destination.display());
        }

        self.current = Some(destination.clone());
        Ok(destination)
    }

    fn retrieve_from_store(&mut self, identifier: &str) -> Result<PathBuf> {
        let path = self.resolve_identifier(identifier)?;
        self.current = Some(path.clone());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_storage_has_no_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().join("uploads"));

        assert!(storage.current_path().is_none());
        assert!(storage.store_dir().is_absolute());
    }

    #[test]
    fn test_store_copies_into_store_dir() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("w9.pdf");
        fs::write(&source, b"%PDF-1.4").unwrap();

        let mut storage = FileStorage::new(temp_dir.path().join("uploads"));
        let stored = storage.store(&source).unwrap();

        assert_eq!(stored, temp_dir.path().join("uploads").join("w9.pdf"));
        assert_eq!(fs::read(&stored).unwrap(), b"%PDF-1.4");
        assert_eq!(storage.current_path(), Some(stored.as_path()));
    }

    #[test]
    fn test_store_file_already_in_store() {
        let temp_dir = TempDir::new().unwrap();
        let store_dir = temp_dir.path().join("uploads");
        fs::create_dir_all(&store_dir).unwrap();
        let source = store_dir.join("w9.pdf");
        fs::write(&source, b"%PDF-1.4").unwrap();

        let mut storage = FileStorage::new(&store_dir);
        let stored = storage.store(&source).unwrap();

        assert_eq!(fs::read(&stored).unwrap(), b"%PDF-1.4");
    }

    #[test]
    fn test_store_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = FileStorage::new(temp_dir.path());

        let result = storage.store(&temp_dir.path().join("nope.pdf"));
        assert!(matches!(result, Err(PageSplitError::MissingSourceFile { .. })));
        assert!(storage.current_path().is_none());
    }

    #[test]
    fn test_retrieve_from_store() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = FileStorage::new(temp_dir.path());

        let path = storage.retrieve_from_store("w9.pdf").unwrap();
        assert_eq!(path, temp_dir.path().join("w9.pdf"));
        assert_eq!(storage.current_path(), Some(path.as_path()));

        let absolute = temp_dir.path().join("elsewhere").join("doc.pdf");
        let path = storage
            .retrieve_from_store(absolute.to_str().unwrap())
            .unwrap();
        assert_eq!(path, absolute);
    }

    #[test]
    fn test_retrieve_rejects_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = FileStorage::new(temp_dir.path());

        assert!(storage.retrieve_from_store("../secret.pdf").is_err());
        assert!(storage.retrieve_from_store("  ").is_err());
    }
}
