//! Opaque content storage for document revisions.
//!
//! Revisions reference content by key; keys are minted by the service and
//! never reused, so an existing key can never be overwritten.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key`. Fails if the key already exists.
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// Fetch the blob stored under `key`, `NotFound` if absent.
    async fn get(&self, key: &str) -> Result<Bytes>;
}

/// One file per key under a spool directory.
pub struct FsBlobStore {
    dir: PathBuf,
}

impl FsBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path(key))
            .await
            .map_err(|err| match err.kind() {
                ErrorKind::AlreadyExists => {
                    Error::InvalidArgument(format!("blob key '{key}' already exists"))
                }
                _ => Error::Internal(err.to_string()),
            })?;
        file.write_all(&data).await?;
        file.flush().await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        match tokio::fs::read(self.path(key)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(Error::NotFound("blob")),
            Err(err) => Err(Error::Internal(err.to_string())),
        }
    }
}

/// In-memory store for tests and embedders.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Bytes>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let mut blobs = self.blobs.write();
        if blobs.contains_key(key) {
            return Err(Error::InvalidArgument(format!(
                "blob key '{key}' already exists"
            )));
        }
        blobs.insert(key.to_string(), data);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        self.blobs
            .read()
            .get(key)
            .cloned()
            .ok_or(Error::NotFound("blob"))
    }
}
