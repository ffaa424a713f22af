use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncReadExt;

use crate::backend::Backend;
use crate::error::StorageError;
use crate::path::shard_path;
use crate::record::{SHARD_EXTENSION, decode_records};

/// Access to the hash records stored under a key.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Returns every record stored for `key`, in storage order. A key with no
    /// shard yields an empty list.
    async fn get(&self, key: &str) -> Result<Vec<Bytes>, StorageError>;
}

#[async_trait]
impl<S: Storage + ?Sized> Storage for Arc<S> {
    async fn get(&self, key: &str) -> Result<Vec<Bytes>, StorageError> {
        (**self).get(key).await
    }
}

/// Decodes 20-byte hash records from shards served by a [`Backend`].
#[derive(Debug, Clone)]
pub struct ShardStore<B> {
    backend: B,
}

impl<B: Backend> ShardStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl<B: Backend> Storage for ShardStore<B> {
    #[tracing::instrument(
        name = "ShardStore::get",
        skip(self),
        fields(shard = %shard_path(key, SHARD_EXTENSION).display(), records = tracing::field::Empty)
    )]
    async fn get(&self, key: &str) -> Result<Vec<Bytes>, StorageError> {
        let read_error = |source| StorageError::Read { key: key.to_owned(), source };

        let Some(mut reader) = self.backend.read(key).await.map_err(read_error)? else {
            tracing::debug!("no shard for key");
            return Ok(Vec::new());
        };

        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.map_err(read_error)?;

        let records = decode_records(Bytes::from(buf))
            .map_err(|source| StorageError::Corrupt { key: key.to_owned(), source })?;

        tracing::Span::current().record("records", records.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Arc;

    use super::*;
    use crate::backend::{LocalBackend, MemoryBackend, ShardReader};
    use crate::record::{CorruptShard, RECORD_SIZE};

    struct FailingBackend;

    #[async_trait]
    impl Backend for FailingBackend {
        async fn read(&self, _key: &str) -> io::Result<Option<ShardReader>> {
            Err(io::Error::other("disk on fire"))
        }
    }

    fn shard(records: &[[u8; RECORD_SIZE]]) -> Bytes {
        records.concat().into()
    }

    #[tokio::test]
    async fn test_get_decodes_records_in_order() {
        let first = [0x11; RECORD_SIZE];
        let second = [0x01; RECORD_SIZE];
        let backend = MemoryBackend::new().with_shard("aaaaa", shard(&[first, second]));
        let store = ShardStore::new(backend);

        let records = store.get("aaaaa").await.unwrap();

        assert_eq!(records, vec![Bytes::copy_from_slice(&first), Bytes::copy_from_slice(&second)]);
    }

    #[tokio::test]
    async fn test_missing_shard_is_empty() {
        let store = ShardStore::new(MemoryBackend::new());
        assert!(store.get("zzzzz").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_shard() {
        let backend = MemoryBackend::new().with_shard("aaaaa", vec![0u8; RECORD_SIZE + 1]);
        let store = ShardStore::new(backend);

        let err = store.get("aaaaa").await.unwrap_err();

        assert!(err.is_corruption());
        assert!(matches!(
            err,
            StorageError::Corrupt { ref key, source: CorruptShard { len: 21 } } if key == "aaaaa"
        ));
    }

    #[tokio::test]
    async fn test_backend_failure_is_read_error() {
        let store = ShardStore::new(FailingBackend);

        let err = store.get("aaaaa").await.unwrap_err();

        assert!(!err.is_corruption());
        assert!(matches!(err, StorageError::Read { .. }));
        assert!(err.to_string().contains("disk on fire"));
    }

    #[tokio::test]
    async fn test_local_store_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let record = [0xCB; RECORD_SIZE];
        std::fs::create_dir_all(dir.path().join("cbf")).unwrap();
        std::fs::write(dir.path().join("cbf").join("da.bin"), record).unwrap();

        let store = ShardStore::new(Arc::new(LocalBackend::new(dir.path())));

        assert_eq!(store.get("cbfda").await.unwrap(), vec![Bytes::copy_from_slice(&record)]);
        assert!(store.get("cbfdb").await.unwrap().is_empty());
    }
}
