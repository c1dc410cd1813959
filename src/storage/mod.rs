//! Document cache and debug artifacts on top of the `object_store` crate.
//!
//! Valid documents live at `{court}/{doc_id}.pdf`. Anything that came back
//! instead of a PDF is kept at `{court}/{doc_id}.html` for inspection and is
//! never served as a cache hit.

use bytes::Bytes;
use object_store::{ObjectStore, local::LocalFileSystem, path::Path as StoragePath};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub const PDF_SIGNATURE: &[u8] = b"%PDF-";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Refusing to cache non-PDF payload at {0}")]
    NotAPdf(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_SIGNATURE)
}

pub fn pdf_key(court: &str, doc_id: &str) -> String {
    format!("{}/{}.pdf", court, doc_id)
}

pub fn debug_key(court: &str, doc_id: &str) -> String {
    format!("{}/{}.html", court, doc_id)
}

/// Storage client wrapping object_store
#[derive(Clone)]
pub struct DocumentStore {
    store: Arc<dyn ObjectStore>,
}

impl DocumentStore {
    /// Create new storage client with any object_store backend
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Create in-memory storage for testing/development
    pub fn in_memory() -> Self {
        Self::new(Arc::new(object_store::memory::InMemory::new()))
    }

    /// Files under `root` on the local disk
    pub fn local(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let fs = LocalFileSystem::new_with_prefix(root)?;
        Ok(Self::new(Arc::new(fs)))
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let path = StoragePath::from(key);
        let size = data.len();
        self.store.put(&path, data.into()).await?;
        tracing::info!(key, size, "Uploaded to storage");
        Ok(())
    }

    /// Download from storage, `None` if the key is absent
    pub async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let path = StoragePath::from(key);
        match self.store.get(&path).await {
            Ok(result) => Ok(Some(result.bytes().await?)),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if key exists
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let path = StoragePath::from(key);

        match self.store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// A cached document, only if it still carries the PDF signature.
    pub async fn cached_pdf(&self, court: &str, doc_id: &str) -> Result<Option<Bytes>> {
        let key = pdf_key(court, doc_id);
        match self.get(&key).await? {
            Some(bytes) if is_pdf(&bytes) => Ok(Some(bytes)),
            Some(_) => {
                tracing::warn!(key, "Cached file is not a PDF, ignoring");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub async fn save_pdf(&self, court: &str, doc_id: &str, data: Bytes) -> Result<String> {
        let key = pdf_key(court, doc_id);
        if !is_pdf(&data) {
            return Err(StorageError::NotAPdf(key));
        }
        self.put(&key, data).await?;
        Ok(key)
    }

    /// Keep a non-PDF response for later inspection.
    pub async fn save_debug(&self, court: &str, doc_id: &str, data: Bytes) -> Result<String> {
        let key = debug_key(court, doc_id);
        self.put(&key, data).await?;
        Ok(key)
    }
}
