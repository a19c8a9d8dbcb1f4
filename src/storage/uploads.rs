//! Upload storage on local disk
//!
//! Uploaded images land under `<DATA_DIR>/uploads/` and are served
//! publicly from `/uploads/`. Files are immutable once written and are
//! never deleted by this system.

use std::path::PathBuf;

use chrono::Utc;

use crate::error::AppError;

/// Upload file-size ceiling (8 MB)
pub const MAX_UPLOAD_BYTES: usize = 8 * 1024 * 1024;

/// Upload storage service
///
/// Persists uploads to disk and returns public URLs.
pub struct UploadStorage {
    /// Directory uploads are written to
    uploads_dir: PathBuf,
}

impl UploadStorage {
    /// Create a new upload storage over the given directory
    pub fn new(uploads_dir: PathBuf) -> Self {
        Self { uploads_dir }
    }

    /// Persist an uploaded file
    ///
    /// # Arguments
    /// * `original_name` - Client-supplied filename, sanitized before use
    /// * `data` - File contents
    ///
    /// # Returns
    /// Public URL path for the stored file, e.g.
    /// `/uploads/1712345678901-3fa9c1d2-logo.png`
    pub async fn store(&self, original_name: &str, data: Vec<u8>) -> Result<String, AppError> {
        let file_name = generate_file_name(original_name);
        let target = self.uploads_dir.join(&file_name);

        tokio::fs::create_dir_all(&self.uploads_dir)
            .await
            .map_err(|error| {
                AppError::Storage(format!(
                    "Failed to create {}: {}",
                    self.uploads_dir.display(),
                    error
                ))
            })?;

        tokio::fs::write(&target, data).await.map_err(|error| {
            AppError::Storage(format!("Failed to write {}: {}", target.display(), error))
        })?;

        tracing::info!(file = %file_name, "Upload stored");
        Ok(format!("/uploads/{}", file_name))
    }

    /// Directory uploads are served from
    pub fn dir(&self) -> &PathBuf {
        &self.uploads_dir
    }
}

/// Build the stored filename: `<epoch-ms>-<random-hex>-<sanitized-original>`
fn generate_file_name(original_name: &str) -> String {
    use rand::RngCore;

    let mut bytes = [0_u8; 4];
    rand::thread_rng().fill_bytes(&mut bytes);
    let suffix: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();

    format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        suffix,
        sanitize_file_name(original_name)
    )
}

/// Reduce a client-supplied filename to a safe basename.
///
/// Path separators and anything outside `[A-Za-z0-9._-]` collapse to `_`;
/// leading dots are stripped so the result cannot be a hidden file or a
/// traversal component.
pub fn sanitize_file_name(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sanitize_keeps_simple_names() {
        assert_eq!(sanitize_file_name("logo.png"), "logo.png");
        assert_eq!(sanitize_file_name("hero-image_2.webp"), "hero-image_2.webp");
    }

    #[test]
    fn sanitize_strips_paths_and_odd_characters() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("..\\..\\boot.ini"), "boot.ini");
        assert_eq!(sanitize_file_name("my photo (1).jpg"), "my_photo__1_.jpg");
        assert_eq!(sanitize_file_name("düsseldorf.png"), "d_sseldorf.png");
    }

    #[test]
    fn sanitize_never_returns_empty_or_hidden() {
        assert_eq!(sanitize_file_name(""), "upload");
        assert_eq!(sanitize_file_name("..."), "upload");
        assert_eq!(sanitize_file_name(".htaccess"), "htaccess");
    }

    #[tokio::test]
    async fn store_writes_file_and_returns_public_url() {
        let dir = TempDir::new().unwrap();
        let storage = UploadStorage::new(dir.path().join("uploads"));

        let url = storage
            .store("logo.png", b"png-bytes".to_vec())
            .await
            .unwrap();

        let file_name = url.strip_prefix("/uploads/").expect("public prefix");
        assert!(file_name.ends_with("-logo.png"));

        let stored = tokio::fs::read(dir.path().join("uploads").join(file_name))
            .await
            .unwrap();
        assert_eq!(stored, b"png-bytes");
    }

    #[tokio::test]
    async fn stored_names_are_unique_per_upload() {
        let dir = TempDir::new().unwrap();
        let storage = UploadStorage::new(dir.path().join("uploads"));

        let first = storage.store("a.png", vec![1]).await.unwrap();
        let second = storage.store("a.png", vec![2]).await.unwrap();
        assert_ne!(first, second);
    }
}
