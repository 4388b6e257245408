use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("File not found: {0}")]
    NotFound(String),
}

/// Where uploaded document bytes live. Paths returned by `store` are opaque keys.
#[async_trait]
pub trait DocumentStorage: Send + Sync + std::fmt::Debug {
    async fn store(&self, bytes: &[u8], suggested_name: &str) -> Result<String, StorageError>;

    async fn retrieve(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}

fn unsafe_chars() -> &'static Regex {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]").expect("static regex"))
}

/// Strips directory parts and anything outside `[A-Za-z0-9._-]`.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned = unsafe_chars().replace_all(base, "_");
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Guesses a content type from the file extension.
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalDiskStorage { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(StorageError::InvalidPath(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl DocumentStorage for LocalDiskStorage {
    async fn store(&self, bytes: &[u8], suggested_name: &str) -> Result<String, StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let key = format!("{}_{}", Uuid::new_v4().simple(), secure_filename(suggested_name));
        tokio::fs::write(self.root.join(&key), bytes).await?;
        tracing::debug!("Stored {} bytes as {}", bytes.len(), key);
        Ok(key)
    }

    async fn retrieve(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub mod testing {
    use std::collections::HashMap;

    use tokio::sync::Mutex;

    use super::*;

    /// Keeps document bytes in memory; `fail_writes` simulates a full disk.
    #[derive(Debug, Default)]
    pub struct MemoryStorage {
        pub files: Mutex<HashMap<String, Vec<u8>>>,
        pub fail_writes: bool,
    }

    #[async_trait]
    impl DocumentStorage for MemoryStorage {
        async fn store(&self, bytes: &[u8], suggested_name: &str) -> Result<String, StorageError> {
            if self.fail_writes {
                return Err(StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
            let key = format!("{}_{}", Uuid::new_v4().simple(), secure_filename(suggested_name));
            self.files.lock().await.insert(key.clone(), bytes.to_vec());
            Ok(key)
        }

        async fn retrieve(&self, path: &str) -> Result<Vec<u8>, StorageError> {
            self.files
                .lock()
                .await
                .get(path)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(path.to_string()))
        }

        async fn delete(&self, path: &str) -> Result<(), StorageError> {
            self.files.lock().await.remove(path);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_are_sanitised() {
        assert_eq!(secure_filename("../../etc/passwd"), "passwd");
        assert_eq!(secure_filename("my scan (1).pdf"), "my_scan__1_.pdf");
        assert_eq!(secure_filename("C:\\docs\\id.png"), "id.png");
        assert_eq!(secure_filename(".."), "upload");
    }

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(content_type_for("id.PDF"), "application/pdf");
        assert_eq!(content_type_for("photo.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("blob"), "application/octet-stream");
    }

    #[tokio::test]
    async fn stores_and_reads_back_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalDiskStorage::new(dir.path());

        let key = storage.store(b"%PDF-1.4", "degree.pdf").await.unwrap();
        assert!(key.ends_with("_degree.pdf"));
        assert_eq!(storage.retrieve(&key).await.unwrap(), b"%PDF-1.4");

        storage.delete(&key).await.unwrap();
        assert!(matches!(
            storage.retrieve(&key).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn refuses_paths_outside_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalDiskStorage::new(dir.path());
        assert!(matches!(
            storage.retrieve("../secret").await,
            Err(StorageError::InvalidPath(_))
        ));
    }
}
