// Uploaded file storage on local disk, served back under /uploads

use std::path::PathBuf;

use tokio::fs;
use uuid::Uuid;

use crate::error::{AppError, Result};

pub const FOLDERS: &[&str] = &["avatars", "documents", "photos", "logos"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Path relative to the storage root, e.g. `photos/<uuid>-facade.jpg`.
    pub key: String,
    pub url: String,
}

#[derive(Clone)]
pub struct StorageService {
    base_path: PathBuf,
    public_base_url: String,
}

impl StorageService {
    pub fn new(base_path: &str, public_base_url: &str) -> Self {
        Self {
            base_path: PathBuf::from(base_path),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn init(&self) -> Result<()> {
        for folder in FOLDERS {
            fs::create_dir_all(self.base_path.join(folder))
                .await
                .map_err(|e| AppError::Internal(format!("Failed to create storage directory: {e}")))?;
        }
        Ok(())
    }

    pub fn root(&self) -> &PathBuf {
        &self.base_path
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/uploads/{key}", self.public_base_url)
    }

    /// Stores `bytes` under `folder` and returns its key and public URL.
    pub async fn upload(&self, bytes: &[u8], folder: &str, filename: &str) -> Result<StoredObject> {
        if !FOLDERS.contains(&folder) {
            return Err(AppError::Validation(format!("Unknown upload folder: {folder}")));
        }
        if bytes.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }

        let key = format!("{folder}/{}-{}", Uuid::new_v4(), sanitize_filename(filename));
        let path = self.base_path.join(&key);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to create directories: {e}")))?;
        }

        fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write file: {e}")))?;

        tracing::debug!(%key, size = bytes.len(), "stored upload");

        Ok(StoredObject {
            url: self.public_url(&key),
            key,
        })
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        if key.contains("..") {
            return Err(AppError::Validation("Invalid storage key".to_string()));
        }
        let path = self.base_path.join(key);
        if path.exists() {
            fs::remove_file(&path)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to delete file: {e}")))?;
        }
        Ok(())
    }

    /// Best-effort removal of an object whose row was never written.
    pub async fn discard(&self, key: &str) {
        if let Err(e) = self.delete(key).await {
            tracing::warn!(%key, error = %e, "failed to remove orphaned upload");
        }
    }
}

fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(&['/', '\\'][..]).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}
