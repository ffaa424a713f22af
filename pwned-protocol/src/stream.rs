//! Transport-independent seams of the streaming lookup call.

use std::error::Error as StdError;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Status;
use crate::wire::ResponseShape;

/// The receiving side of a server stream is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("stream receiver is gone")]
pub struct SendError;

/// Server half of a lookup stream.
#[async_trait]
pub trait HashSink: Send {
    /// Delivers one message. Waits while the receiver is not keeping up.
    async fn send(&mut self, message: Bytes) -> Result<(), SendError>;
}

/// A lookup call failed. Never a negative answer.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("call failed with status {0}")]
    Status(#[from] Status),

    #[error("transport failed: {0}")]
    Transport(#[source] Box<dyn StdError + Send + Sync>),

    #[error("server streams {actual} messages, expected {expected}")]
    ShapeMismatch {
        expected: ResponseShape,
        actual: ResponseShape,
    },

    #[error("server did not advertise a response shape")]
    MissingShape,
}

impl CallError {
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        CallError::Transport(err.into())
    }

    pub fn status(&self) -> Option<&Status> {
        match self {
            CallError::Status(status) => Some(status),
            _ => None,
        }
    }
}

/// Client half of a lookup stream.
///
/// Dropping the stream cancels the call.
#[async_trait]
pub trait HashStream: Send {
    /// Shape the server advertised for this stream.
    fn shape(&self) -> ResponseShape;

    /// Next message, or `None` once the server ended the stream.
    async fn message(&mut self) -> Result<Option<Bytes>, CallError>;
}

/// Opens lookup calls.
#[async_trait]
pub trait LookupTransport: Send + Sync {
    type Stream: HashStream;

    async fn list_hashes_for_prefix(&self, prefix: &str) -> Result<Self::Stream, CallError>;
}
