//! Object (blob) storage behind a trait, with an in-memory implementation.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::config::StorageConfig;
use crate::error::AppError;
use crate::models::generate_ulid;

/// Result of storing a blob.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Public URL of the stored object.
    pub url: String,
    /// The unique name the object was stored under.
    pub stored_name: String,
}

/// Blob storage for image payloads.
///
/// Uploads store under a generated unique name so repeated uploads of the
/// same file never collide. Deletes are idempotent; reads of absent objects
/// fail with [`AppError::ObjectNotFound`].
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        name: &str,
        content_type: &str,
    ) -> Result<StoredObject, AppError>;

    async fn download(&self, stored_name: &str) -> Result<Vec<u8>, AppError>;

    async fn delete(&self, stored_name: &str) -> Result<(), AppError>;

    async fn exists(&self, stored_name: &str) -> Result<bool, AppError>;

    async fn url(&self, stored_name: &str) -> Result<String, AppError>;
}

struct StoredBlob {
    bytes: Vec<u8>,
    #[allow(dead_code)]
    content_type: String,
}

/// Map-backed storage for tests and the demo binary.
pub struct InMemoryObjectStorage {
    base_url: String,
    bucket: String,
    objects: RwLock<HashMap<String, StoredBlob>>,
}

impl InMemoryObjectStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    fn object_url(&self, stored_name: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.bucket, stored_name)
    }

    // A poisoned lock is this backend's "backend failure": surfaced as an
    // error like any other storage outage, never a panic.
    fn objects_read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, StoredBlob>>, AppError> {
        self.objects
            .read()
            .map_err(|_| AppError::ObjectStorage("storage lock poisoned".into()))
    }

    fn objects_write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, StoredBlob>>, AppError> {
        self.objects
            .write()
            .map_err(|_| AppError::ObjectStorage("storage lock poisoned".into()))
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        name: &str,
        content_type: &str,
    ) -> Result<StoredObject, AppError> {
        let stored_name = format!("{}_{}", generate_ulid(), name);
        self.objects_write()?.insert(
            stored_name.clone(),
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(StoredObject {
            url: self.object_url(&stored_name),
            stored_name,
        })
    }

    async fn download(&self, stored_name: &str) -> Result<Vec<u8>, AppError> {
        self.objects_read()?
            .get(stored_name)
            .map(|blob| blob.bytes.clone())
            .ok_or_else(|| AppError::ObjectNotFound(stored_name.to_string()))
    }

    async fn delete(&self, stored_name: &str) -> Result<(), AppError> {
        self.objects_write()?.remove(stored_name);
        Ok(())
    }

    async fn exists(&self, stored_name: &str) -> Result<bool, AppError> {
        Ok(self.objects_read()?.contains_key(stored_name))
    }

    async fn url(&self, stored_name: &str) -> Result<String, AppError> {
        if !self.exists(stored_name).await? {
            return Err(AppError::ObjectNotFound(stored_name.to_string()));
        }
        Ok(self.object_url(stored_name))
    }
}
