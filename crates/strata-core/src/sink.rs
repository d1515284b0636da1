//! Artifact sink abstraction: durable object storage addressed by key.
//!
//! The sink accepts a structured artifact and owns its serialization. Puts
//! are unconditional overwrites: the key is a pure function of
//! (owner, entity, window), so reprocessing a window after a partial failure
//! rewrites the same object instead of duplicating it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use object_store::{path::Path as ObjectPath, ObjectStore, PutPayload};

use crate::artifact::CompiledArtifact;
use crate::error::{Error, Result};
use crate::keys::ArtifactKey;

/// Destination for compiled artifacts.
///
/// Implementations must be safe to call from many concurrent window tasks.
#[async_trait]
pub trait ArtifactSink: Send + Sync + 'static {
    /// Persists one artifact under the given key, overwriting any existing
    /// object at that key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Sink`] on storage failure and
    /// [`Error::Serialization`] if the artifact cannot be encoded.
    async fn put(&self, key: &ArtifactKey, artifact: &CompiledArtifact) -> Result<()>;
}

/// In-memory artifact sink for testing.
///
/// Thread-safe via `RwLock`. Not suitable for production.
#[derive(Debug, Default)]
pub struct MemorySink {
    objects: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemorySink {
    /// Creates a new empty memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the serialized object stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if the lock is poisoned.
    pub fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let objects = self
            .objects
            .read()
            .map_err(|_| Error::internal("memory sink lock poisoned"))?;
        Ok(objects.get(key).cloned())
    }

    /// Returns every stored key, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if the lock is poisoned.
    pub fn keys(&self) -> Result<Vec<String>> {
        let objects = self
            .objects
            .read()
            .map_err(|_| Error::internal("memory sink lock poisoned"))?;
        let mut keys: Vec<String> = objects.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    /// Returns the number of stored objects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if the lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        let objects = self
            .objects
            .read()
            .map_err(|_| Error::internal("memory sink lock poisoned"))?;
        Ok(objects.len())
    }

    /// Returns true if no objects are stored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl ArtifactSink for MemorySink {
    async fn put(&self, key: &ArtifactKey, artifact: &CompiledArtifact) -> Result<()> {
        let bytes = Bytes::from(artifact.to_json_pretty()?);
        let mut objects = self
            .objects
            .write()
            .map_err(|_| Error::internal("memory sink lock poisoned"))?;
        objects.insert(key.as_ref().to_string(), bytes);
        Ok(())
    }
}

/// Artifact sink backed by an [`ObjectStore`] implementation.
///
/// Works against any `object_store` backend (local filesystem, in-memory,
/// cloud object stores). Artifacts are written as pretty-printed JSON.
#[derive(Debug, Clone)]
pub struct ObjectStoreSink {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreSink {
    /// Creates a sink over the given object store.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ArtifactSink for ObjectStoreSink {
    async fn put(&self, key: &ArtifactKey, artifact: &CompiledArtifact) -> Result<()> {
        let bytes = Bytes::from(artifact.to_json_pretty()?);
        let path = ObjectPath::from(key.as_ref());
        self.store
            .put(&path, PutPayload::from(bytes))
            .await
            .map_err(|e| Error::sink_with(format!("put failed for {key}"), e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ArtifactEntry, CompiledArtifact};
    use chrono::{DateTime, Utc};

    fn artifact(start: &str) -> CompiledArtifact {
        let window_start: DateTime<Utc> = start.parse().expect("timestamp");
        CompiledArtifact {
            entity_id: "m1".to_string(),
            owner_id: "org-1".to_string(),
            window_start,
            entries: vec![ArtifactEntry {
                timestamp: window_start,
                values: serde_json::Map::new(),
            }],
        }
    }

    #[tokio::test]
    async fn memory_sink_stores_serialized_artifact() {
        let sink = MemorySink::new();
        let artifact = artifact("2026-03-01T10:00:00Z");
        let key = ArtifactKey::derive("org-1", "m1", artifact.window_start);

        sink.put(&key, &artifact).await.expect("put");

        let stored = sink.get(key.as_ref()).expect("get").expect("present");
        let decoded: CompiledArtifact = serde_json::from_slice(&stored).expect("decode");
        assert_eq!(decoded, artifact);
    }

    #[tokio::test]
    async fn repeated_put_overwrites_same_key() {
        let sink = MemorySink::new();
        let artifact = artifact("2026-03-01T10:00:00Z");
        let key = ArtifactKey::derive("org-1", "m1", artifact.window_start);

        sink.put(&key, &artifact).await.expect("first put");
        sink.put(&key, &artifact).await.expect("second put");

        assert_eq!(sink.len().expect("len"), 1);
    }

    #[tokio::test]
    async fn object_store_sink_writes_through() {
        let store = Arc::new(object_store::memory::InMemory::new());
        let sink = ObjectStoreSink::new(store.clone());
        let artifact = artifact("2026-03-01T10:00:00Z");
        let key = ArtifactKey::derive("org-1", "m1", artifact.window_start);

        sink.put(&key, &artifact).await.expect("put");

        let path = ObjectPath::from(key.as_ref());
        let fetched = store.get(&path).await.expect("get");
        let bytes = fetched.bytes().await.expect("bytes");
        let decoded: CompiledArtifact = serde_json::from_slice(&bytes).expect("decode");
        assert_eq!(decoded, artifact);
    }
}
