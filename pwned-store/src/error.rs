use std::io;

use crate::record::CorruptShard;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("reading shard {key} failed: {source}")]
    Read {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("shard {key} is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: CorruptShard,
    },
}

impl StorageError {
    /// True when the shard exists but its contents are damaged, as opposed
    /// to the shard being unreadable.
    pub fn is_corruption(&self) -> bool {
        matches!(self, StorageError::Corrupt { .. })
    }
}
