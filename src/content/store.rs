//! Site document persistence
//!
//! One JSON object on disk, replaced wholesale on every write. The write
//! path publishes through a temp file in the same directory followed by a
//! rename, so a concurrent reader sees either the old or the new document,
//! never a torn one. Writers are not serialized: last writer wins.

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::metrics::{CONTENT_READS_TOTAL, CONTENT_WRITES_TOTAL};

/// Default ceiling for the serialized site document (~18 MB)
pub const MAX_DOCUMENT_BYTES: usize = 18 * 1024 * 1024;

/// Content store owning the single persisted site document
pub struct ContentStore {
    /// Path of the persisted document
    document_path: PathBuf,
    /// Serialized-size ceiling for incoming documents
    max_bytes: usize,
}

impl ContentStore {
    /// Create a store over the given document path
    pub fn new(document_path: PathBuf) -> Self {
        Self::with_max_bytes(document_path, MAX_DOCUMENT_BYTES)
    }

    /// Create a store with an explicit size ceiling
    pub fn with_max_bytes(document_path: PathBuf, max_bytes: usize) -> Self {
        Self {
            document_path,
            max_bytes,
        }
    }

    /// Read the current site document
    ///
    /// # Returns
    /// - `Ok(Some(object))` - the persisted document
    /// - `Ok(None)` - no document yet: the file is missing, empty, fails to
    ///   parse, or does not contain a JSON object
    /// - `Err(Storage)` - the file exists but could not be read
    ///
    /// Callers treat `None` as "no content yet", not as an error; the
    /// public site must keep serving when the document is absent.
    pub async fn read(&self) -> Result<Option<Map<String, Value>>, AppError> {
        let bytes = match tokio::fs::read(&self.document_path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                CONTENT_READS_TOTAL.with_label_values(&["absent"]).inc();
                return Ok(None);
            }
            Err(error) => {
                CONTENT_READS_TOTAL.with_label_values(&["error"]).inc();
                return Err(AppError::Storage(format!(
                    "Failed to read {}: {}",
                    self.document_path.display(),
                    error
                )));
            }
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(document)) => {
                CONTENT_READS_TOTAL.with_label_values(&["ok"]).inc();
                Ok(Some(document))
            }
            Ok(other) => {
                tracing::warn!(
                    path = %self.document_path.display(),
                    found = other_type_name(&other),
                    "Site document is not a JSON object; treating as absent"
                );
                CONTENT_READS_TOTAL.with_label_values(&["absent"]).inc();
                Ok(None)
            }
            Err(error) => {
                tracing::warn!(
                    path = %self.document_path.display(),
                    %error,
                    "Site document failed to parse; treating as absent"
                );
                CONTENT_READS_TOTAL.with_label_values(&["absent"]).inc();
                Ok(None)
            }
        }
    }

    /// Replace the persisted site document
    ///
    /// # Steps
    /// 1. Reject candidates whose serialization exceeds the ceiling (413)
    /// 2. Merge the save timestamp into `_meta.savedAt`
    /// 3. Create the data directory if needed
    /// 4. Write to a temp file beside the target and rename over it
    ///
    /// # Returns
    /// The stored document including the injected timestamp
    pub async fn write(
        &self,
        candidate: Map<String, Value>,
    ) -> Result<Map<String, Value>, AppError> {
        let candidate_len = serde_json::to_vec(&Value::Object(candidate.clone()))
            .map_err(|e| AppError::Internal(e.into()))?
            .len();
        if candidate_len > self.max_bytes {
            CONTENT_WRITES_TOTAL.with_label_values(&["rejected"]).inc();
            return Err(AppError::PayloadTooLarge(format!(
                "site document is {} bytes, ceiling is {} bytes",
                candidate_len, self.max_bytes
            )));
        }

        let document = stamp_saved_at(candidate);
        let serialized = serde_json::to_vec(&Value::Object(document.clone()))
            .map_err(|e| AppError::Internal(e.into()))?;

        if let Some(parent) = self.document_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|error| {
                AppError::Storage(format!(
                    "Failed to create {}: {}",
                    parent.display(),
                    error
                ))
            })?;
        }

        let temp_path = self.temp_path();
        let write_result = self.publish(&temp_path, &serialized).await;
        if write_result.is_err() {
            // The rename never happened; drop the orphan.
            let _ = tokio::fs::remove_file(&temp_path).await;
            CONTENT_WRITES_TOTAL.with_label_values(&["error"]).inc();
            return write_result.map(|_| document);
        }

        CONTENT_WRITES_TOTAL.with_label_values(&["ok"]).inc();
        tracing::info!(
            path = %self.document_path.display(),
            bytes = serialized.len(),
            "Site document saved"
        );
        Ok(document)
    }

    async fn publish(&self, temp_path: &Path, serialized: &[u8]) -> Result<(), AppError> {
        tokio::fs::write(temp_path, serialized)
            .await
            .map_err(|error| {
                AppError::Storage(format!(
                    "Failed to write {}: {}",
                    temp_path.display(),
                    error
                ))
            })?;

        tokio::fs::rename(temp_path, &self.document_path)
            .await
            .map_err(|error| {
                AppError::Storage(format!(
                    "Failed to publish {}: {}",
                    self.document_path.display(),
                    error
                ))
            })
    }

    /// Temp-file sibling of the document, random-suffixed so two writers
    /// racing each other cannot truncate one another mid-write.
    fn temp_path(&self) -> PathBuf {
        use rand::RngCore;

        let mut bytes = [0_u8; 8];
        rand::thread_rng().fill_bytes(&mut bytes);
        let suffix: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();

        let file_name = self
            .document_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "site-data.json".to_string());
        self.document_path
            .with_file_name(format!(".{}.tmp-{}", file_name, suffix))
    }
}

/// Merge `_meta.savedAt` into the document, preserving other `_meta` keys.
fn stamp_saved_at(mut document: Map<String, Value>) -> Map<String, Value> {
    let saved_at = Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));

    match document.get_mut("_meta") {
        Some(Value::Object(meta)) => {
            meta.insert("savedAt".to_string(), saved_at);
        }
        _ => {
            let mut meta = Map::new();
            meta.insert("savedAt".to_string(), saved_at);
            document.insert("_meta".to_string(), Value::Object(meta));
        }
    }

    document
}

fn other_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
