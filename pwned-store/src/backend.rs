use std::collections::HashMap;
use std::io::{self, Cursor};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::AsyncRead;

use crate::path::shard_path;
use crate::record::SHARD_EXTENSION;

/// Raw shard bytes handed out by a [`Backend`].
pub type ShardReader = Box<dyn AsyncRead + Send + Unpin>;

/// Source of raw shard bytes for a key.
///
/// Backends are shared by every in-flight lookup, so implementations must be
/// safe to call concurrently. `Ok(None)` means there is no shard for the key,
/// which is the normal outcome for a prefix that never appeared in the corpus.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn read(&self, key: &str) -> io::Result<Option<ShardReader>>;
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for Arc<B> {
    async fn read(&self, key: &str) -> io::Result<Option<ShardReader>> {
        (**self).read(key).await
    }
}

/// Reads shards from a directory tree laid out by [`shard_path`].
#[derive(Debug, Clone)]
pub struct LocalBackend {
    dir: PathBuf,
}

impl LocalBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Full path of the shard file for `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(shard_path(key, SHARD_EXTENSION))
    }
}

#[async_trait]
impl Backend for LocalBackend {
    #[tracing::instrument(name = "LocalBackend::read", level = "debug", skip(self))]
    async fn read(&self, key: &str) -> io::Result<Option<ShardReader>> {
        // Keys become path components, anything else could leave `dir`.
        if key.is_empty() || !key.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("shard key {key:?} is not alphanumeric"),
            ));
        }

        match File::open(self.path_for(key)).await {
            Ok(file) => Ok(Some(Box::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Keeps shards in memory, keyed by prefix.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    shards: HashMap<String, Bytes>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, shard: impl Into<Bytes>) {
        self.shards.insert(key.into(), shard.into());
    }

    pub fn with_shard(mut self, key: impl Into<String>, shard: impl Into<Bytes>) -> Self {
        self.insert(key, shard);
        self
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn read(&self, key: &str) -> io::Result<Option<ShardReader>> {
        Ok(self
            .shards
            .get(key)
            .map(|shard| Box::new(Cursor::new(shard.clone())) as ShardReader))
    }
}
