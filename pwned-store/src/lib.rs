//! Prefix-sharded storage for SHA1 password hashes.
//!
//! The corpus is split into one shard file per 5-character hash prefix. Shard
//! paths nest the prefix in 3-character directory segments so no single
//! directory fans out to more than 4096 entries:
//!
//! ```text
//! cbfda -> cbf/da.bin
//! ```
//!
//! Each shard is a flat concatenation of 20-byte SHA1 digests with no header,
//! no count and no ordering guarantee. A shard whose length is not a multiple
//! of [`RECORD_SIZE`] is corrupt.
//!
//! Reading is split in two layers: a [`Backend`] hands out raw shard bytes for
//! a key, and [`ShardStore`] turns those bytes into records. Swapping the
//! physical storage means writing a new backend, never touching the decoder.

pub mod backend;
pub mod error;
pub mod path;
pub mod record;
pub mod storage;

pub use backend::{Backend, LocalBackend, MemoryBackend, ShardReader};
pub use error::StorageError;
pub use path::{PATH_SEGMENT_LEN, shard_path};
pub use record::{CorruptShard, RECORD_SIZE, SHARD_EXTENSION, decode_records};
pub use storage::{ShardStore, Storage};
