//! Object storage collaborator
//!
//! Manuscript files live with an external provider as private assets; the
//! database only keeps the opaque `StoredObject` pair. Read endpoints
//! re-derive access URLs from the asset id: unsigned transform URLs for
//! page-1 previews, signed time-limited URLs for the file bytes themselves.

use crate::config::StorageConfig;
use crate::db::models::FileKind;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Permanent reference returned by the provider after an upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    /// Provider content identifier, used to re-derive access URLs
    pub asset_id: String,

    /// Permanent content-addressed URL
    pub url: String,
}

/// Parameters for a derived URL.
///
/// One derivation covers every read-endpoint variant: listing and detail
/// previews differ only in dimensions, signed access and forced download
/// differ only in expiry and the attachment flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeriveOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,

    /// Unix timestamp the URL stops resolving at; presence makes the URL signed
    pub expires_at: Option<i64>,

    pub force_download: bool,
}

impl DeriveOptions {
    /// Page-1 thumbnail of the given dimensions
    pub fn preview(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    /// Time-limited signed access to the raw file
    pub fn signed(expires_at: i64) -> Self {
        Self {
            expires_at: Some(expires_at),
            ..Self::default()
        }
    }

    /// Signed variant that forces a download
    pub fn download(expires_at: i64) -> Self {
        Self {
            expires_at: Some(expires_at),
            force_download: true,
            ..Self::default()
        }
    }
}

/// Narrow interface over the storage provider
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload bytes as a private asset under the configured folder namespace
    async fn upload(&self, bytes: Vec<u8>, filename: &str, kind: FileKind) -> Result<StoredObject>;

    /// Remove an asset. Callers on the deletion path treat failures as
    /// best-effort; the error is still reported so they can log it.
    async fn delete(&self, asset_id: &str) -> Result<()>;

    /// Pure derivation of an access URL from a stored asset id
    fn derive_url(&self, asset_id: &str, opts: &DeriveOptions) -> String;
}

/// Derive an access URL from a stored asset id.
///
/// Preview URLs are deterministic page-1 transforms. Signed URLs embed the
/// expiry and a signature over the sorted query parameters, so the same
/// asset id and expiry always produce the same URL while the permanent URL
/// never appears in responses.
pub fn derive_url(config: &StorageConfig, asset_id: &str, opts: &DeriveOptions) -> String {
    if let (Some(width), Some(height)) = (opts.width, opts.height) {
        return format!(
            "{}/{}/image/c_fill,h_{},pg_1,q_auto,w_{}/{}.jpg",
            config.delivery_base, config.cloud_name, height, width, asset_id
        );
    }

    let base = format!(
        "{}/{}/raw/{}",
        config.delivery_base, config.cloud_name, asset_id
    );

    let mut query: Vec<(String, String)> = Vec::new();
    if opts.force_download {
        query.push(("attachment".to_string(), "true".to_string()));
    }
    if let Some(expires_at) = opts.expires_at {
        query.push(("expires_at".to_string(), expires_at.to_string()));
    }

    if query.is_empty() {
        return base;
    }

    query.sort();
    let canonical = query
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    let signature = sign(&canonical, &config.api_secret);

    format!("{}?{}&signature={}", base, canonical, signature)
}

fn sign(payload: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// REST client for the storage provider
pub struct HttpObjectStore {
    client: reqwest::Client,
    config: StorageConfig,
}

#[derive(Deserialize)]
struct UploadResponse {
    asset_id: String,
    url: String,
}

impl HttpObjectStore {
    /// Create a client with the configured upload timeout
    pub fn new(config: StorageConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upload_timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to build storage client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    /// Signature over the sorted request parameters plus the API secret
    fn request_signature(&self, params: &[(&str, &str)]) -> String {
        let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
        sorted.sort();
        let canonical = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        sign(&canonical, &self.config.api_secret)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn upload(&self, bytes: Vec<u8>, filename: &str, kind: FileKind) -> Result<StoredObject> {
        let url = format!(
            "{}/v1/{}/assets",
            self.config.api_base, self.config.cloud_name
        );
        let timestamp = chrono::Utc::now().timestamp().to_string();

        let signature = self.request_signature(&[
            ("access", "private"),
            ("folder", &self.config.upload_folder),
            ("timestamp", &timestamp),
        ]);

        let file_part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(kind.mime_type())
            .map_err(|e| AppError::Storage {
                message: format!("Invalid upload part: {}", e),
            })?;

        let form = reqwest::multipart::Form::new()
            .text("access", "private")
            .text("folder", self.config.upload_folder.clone())
            .text("timestamp", timestamp)
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .part("file", file_part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Storage {
                message: format!("Upload request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Storage {
                message: format!("Provider error {}: {}", status, body),
            });
        }

        let uploaded: UploadResponse =
            response.json().await.map_err(|e| AppError::Storage {
                message: format!("Failed to parse upload response: {}", e),
            })?;

        Ok(StoredObject {
            asset_id: uploaded.asset_id,
            url: uploaded.url,
        })
    }

    async fn delete(&self, asset_id: &str) -> Result<()> {
        let url = format!(
            "{}/v1/{}/assets/{}",
            self.config.api_base, self.config.cloud_name, asset_id
        );
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature =
            self.request_signature(&[("asset_id", asset_id), ("timestamp", &timestamp)]);

        let response = self
            .client
            .delete(&url)
            .query(&[
                ("api_key", self.config.api_key.as_str()),
                ("timestamp", &timestamp),
                ("signature", &signature),
            ])
            .send()
            .await
            .map_err(|e| AppError::Storage {
                message: format!("Delete request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Storage {
                message: format!("Provider error {}: {}", status, body),
            });
        }

        Ok(())
    }

    fn derive_url(&self, asset_id: &str, opts: &DeriveOptions) -> String {
        derive_url(&self.config, asset_id, opts)
    }
}

/// In-memory store for tests
pub struct MemoryObjectStore {
    config: StorageConfig,
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    uploads: u64,
    deletes: u64,
    objects: HashMap<String, usize>,
}

impl MemoryObjectStore {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            state: Mutex::new(MemoryState::default()),
        }
    }

    pub fn upload_count(&self) -> u64 {
        self.state.lock().unwrap().uploads
    }

    pub fn delete_count(&self) -> u64 {
        self.state.lock().unwrap().deletes
    }

    pub fn contains(&self, asset_id: &str) -> bool {
        self.state.lock().unwrap().objects.contains_key(asset_id)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        _filename: &str,
        _kind: FileKind,
    ) -> Result<StoredObject> {
        let mut state = self.state.lock().unwrap();
        state.uploads += 1;

        let asset_id = format!("{}/asset-{}", self.config.upload_folder, state.uploads);
        let url = format!(
            "{}/{}/raw/{}",
            self.config.delivery_base, self.config.cloud_name, asset_id
        );
        state.objects.insert(asset_id.clone(), bytes.len());

        Ok(StoredObject { asset_id, url })
    }

    async fn delete(&self, asset_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.deletes += 1;

        match state.objects.remove(asset_id) {
            Some(_) => Ok(()),
            None => Err(AppError::Storage {
                message: format!("No such asset: {}", asset_id),
            }),
        }
    }

    fn derive_url(&self, asset_id: &str, opts: &DeriveOptions) -> String {
        derive_url(&self.config, asset_id, opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn storage_config() -> StorageConfig {
        let mut config = AppConfig::default().storage;
        config.api_secret = "storage_test_secret".to_string();
        config
    }

    #[test]
    fn test_preview_url_is_a_page_one_transform() {
        let config = storage_config();
        let url = derive_url(&config, "journals/paper-1", &DeriveOptions::preview(300, 400));

        assert!(url.contains("/image/"));
        assert!(url.contains("pg_1"));
        assert!(url.contains("w_300"));
        assert!(url.contains("h_400"));
        assert!(url.ends_with("journals/paper-1.jpg"));
        assert!(!url.contains("signature="));
    }

    #[test]
    fn test_signed_url_is_deterministic_for_same_expiry() {
        let config = storage_config();
        let first = derive_url(&config, "journals/paper-1", &DeriveOptions::signed(1_900_000_000));
        let second = derive_url(&config, "journals/paper-1", &DeriveOptions::signed(1_900_000_000));

        assert_eq!(first, second);
        assert!(first.contains("expires_at=1900000000"));
        assert!(first.contains("signature="));
    }

    #[test]
    fn test_signed_url_changes_with_expiry_and_download_flag() {
        let config = storage_config();
        let signed = derive_url(&config, "journals/paper-1", &DeriveOptions::signed(1_900_000_000));
        let later = derive_url(&config, "journals/paper-1", &DeriveOptions::signed(1_900_000_060));
        let download =
            derive_url(&config, "journals/paper-1", &DeriveOptions::download(1_900_000_000));

        assert_ne!(signed, later);
        assert_ne!(signed, download);
        assert!(download.contains("attachment=true"));
    }

    #[test]
    fn test_signed_url_differs_from_permanent_url() {
        let config = storage_config();
        let permanent = format!(
            "{}/{}/raw/journals/paper-1",
            config.delivery_base, config.cloud_name
        );
        let signed = derive_url(&config, "journals/paper-1", &DeriveOptions::signed(1_900_000_000));

        assert_ne!(signed, permanent);
        assert!(signed.starts_with(&permanent));
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryObjectStore::new(storage_config());

        let stored = store
            .upload(vec![1, 2, 3], "paper.pdf", FileKind::Pdf)
            .await
            .unwrap();
        assert!(store.contains(&stored.asset_id));
        assert_eq!(store.upload_count(), 1);

        store.delete(&stored.asset_id).await.unwrap();
        assert!(!store.contains(&stored.asset_id));

        assert!(store.delete(&stored.asset_id).await.is_err());
        assert_eq!(store.delete_count(), 2);
    }
}
