//! File storage abstraction for generated export files.

use std::path::PathBuf;

use crate::config::StorageSettings;
use crate::{AppError, AppResult};

/// Stored file metadata.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Storage key (path or object key).
    pub key: String,
    /// Public URL to access the file.
    pub url: String,
    /// File size in bytes.
    pub size: u64,
    /// MIME content type.
    pub content_type: String,
    /// MD5 hash of the file.
    pub md5: String,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short provider name recorded on completed exports (e.g. `local`).
    fn provider(&self) -> &'static str;

    /// Upload a file.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str)
    -> AppResult<UploadedFile>;

    /// Get the public URL for a key.
    fn public_url(&self, key: &str) -> String;
}

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self {
            base_path,
            base_url,
        }
    }

    /// Create a local storage backend from configuration.
    #[must_use]
    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self::new(settings.base_path.clone(), settings.base_url.clone())
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    fn provider(&self) -> &'static str {
        "local"
    }

    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<UploadedFile> {
        let path = self.base_path.join(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))?;

        let md5 = format!("{:x}", md5::compute(data));

        Ok(UploadedFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            md5,
        })
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

/// File name with path separators replaced and leading dots stripped.
///
/// Returns `None` when nothing usable is left (e.g. `..`).
#[must_use]
pub fn safe_file_name(name: &str) -> Option<String> {
    let replaced: String = name
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    let safe = replaced.trim_start_matches('.');

    if safe.is_empty() {
        None
    } else {
        Some(safe.to_string())
    }
}

/// Storage key for an export file.
///
/// The file name is passed through [`safe_file_name`] so a caller-supplied name
/// cannot escape the job directory.
#[must_use]
pub fn export_storage_key(resource: &str, job_id: &str, file_name: &str) -> String {
    let safe_name = safe_file_name(file_name).unwrap_or_else(|| "export".to_string());
    format!("exports/{resource}/{job_id}/{safe_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_storage_key() {
        let key = export_storage_key("products", "01hx", "products-export.csv");
        assert_eq!(key, "exports/products/01hx/products-export.csv");
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name(" report.csv ").as_deref(), Some("report.csv"));
        assert_eq!(safe_file_name("a/b.csv").as_deref(), Some("a_b.csv"));
        assert_eq!(safe_file_name(".."), None);
        assert_eq!(safe_file_name("..."), None);
        assert_eq!(safe_file_name("  "), None);
    }

    #[test]
    fn test_export_storage_key_never_ends_in_directory() {
        assert_eq!(export_storage_key("users", "01hx", ".."), "exports/users/01hx/export");
    }

    #[test]
    fn test_export_storage_key_strips_traversal() {
        let key = export_storage_key("users", "01hx", "../../etc/passwd");
        assert_eq!(key, "exports/users/01hx/_.._etc_passwd");
    }

    #[tokio::test]
    async fn test_local_storage_upload_reports_size_and_url() {
        let dir = std::env::temp_dir().join(format!("emporium-storage-{}", crate::IdGenerator::new().generate()));
        let storage = LocalStorage::new(dir.clone(), "https://cdn.example.com/files/".to_string());

        let uploaded = storage
            .upload("exports/a/b/out.csv", b"id\n1\n", "text/csv")
            .await
            .unwrap();

        assert_eq!(uploaded.size, 5);
        assert_eq!(uploaded.url, "https://cdn.example.com/files/exports/a/b/out.csv");
        let written = tokio::fs::read(dir.join("exports/a/b/out.csv")).await.unwrap();
        assert_eq!(written, b"id\n1\n");

        let _ = tokio::fs::remove_dir_all(dir).await;
    }
}
