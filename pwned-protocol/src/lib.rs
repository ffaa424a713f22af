//! Wire contract shared by the lookup server and the password checker.
//!
//! A client never sends its password or full hash. It sends the first
//! [`PREFIX_LEN`] hex characters of the SHA1 digest and receives every stored
//! hash with that prefix as a stream of messages, then compares locally.
//!
//! Which bytes each message carries is a protocol version decision, see
//! [`ResponseShape`].

pub mod error;
pub mod hash;
pub mod stream;
pub mod wire;

pub use error::{Code, Status};
pub use hash::{HEX_CHARS, PasswordHash, Prefix, to_hex};
pub use stream::{CallError, HashSink, HashStream, LookupTransport, SendError};
pub use wire::{ParseShapeError, ResponseShape};

/// Length of a SHA1 digest in bytes.
pub const HASH_LEN: usize = 20;

/// Number of hex characters of the digest sent as the lookup key.
pub const PREFIX_LEN: usize = 5;

/// Leading digest bytes touched by the prefix (5 hex chars cover 2.5 bytes).
pub const PREFIX_BYTES: usize = PREFIX_LEN.div_ceil(2);
