//! HTTP binding of the lookup call.
//!
//! ```text
//! GET /range/{prefix}
//!
//! 200 OK
//! pwned-response-shape: full-hash
//!
//! [u32 BE length][record] [u32 BE length][record] ...
//! ```
//!
//! Errors known before the first record become the response status
//! (`400` invalid argument, `500` internal) with the status message as a
//! plain-text body. An error after the first record aborts the body.

use std::fmt;
use std::str::FromStr;

use tokio_util::codec::LengthDelimitedCodec;

use crate::hash::PasswordHash;
use crate::{HASH_LEN, PREFIX_BYTES};

/// Route prefix of the lookup call. The hash prefix follows it.
pub const RANGE_PATH: &str = "/range/";

/// Response header advertising the [`ResponseShape`] of the stream.
pub const SHAPE_HEADER: &str = "pwned-response-shape";

/// Upper bound for one message frame. Records are at most [`HASH_LEN`] bytes.
pub const MAX_FRAME_LEN: usize = 1024;

pub fn range_path(prefix: &str) -> String {
    format!("{RANGE_PATH}{prefix}")
}

/// Framing of response messages on an HTTP body.
pub fn frame_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .max_frame_length(MAX_FRAME_LEN)
        .new_codec()
}

/// Bytes carried by each response message.
///
/// Both shapes have been deployed and they are not interchangeable: a client
/// comparing full digests against suffixes never matches anything. Server
/// and client each pick one, the server advertises its choice and the client
/// refuses a stream of the other shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ResponseShape {
    /// The full 20-byte digest.
    #[default]
    FullHash,
    /// The digest with the [`PREFIX_BYTES`] prefix-covered bytes dropped.
    Suffix,
}

impl ResponseShape {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseShape::FullHash => "full-hash",
            ResponseShape::Suffix => "suffix",
        }
    }

    /// Length of one message of this shape.
    pub fn message_len(self) -> usize {
        match self {
            ResponseShape::FullHash => HASH_LEN,
            ResponseShape::Suffix => HASH_LEN - PREFIX_BYTES,
        }
    }

    /// Bytes of a stored record sent for this shape.
    ///
    /// Returns `None` for a record too short to carry a suffix.
    pub fn project(self, record: &[u8]) -> Option<&[u8]> {
        match self {
            ResponseShape::FullHash => Some(record),
            ResponseShape::Suffix => record.get(PREFIX_BYTES..),
        }
    }

    /// Bytes of the local digest a message of this shape is compared with.
    pub fn expected(self, hash: &PasswordHash) -> &[u8] {
        match self {
            ResponseShape::FullHash => hash.as_bytes(),
            ResponseShape::Suffix => hash.suffix(),
        }
    }
}

impl fmt::Display for ResponseShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown response shape {0:?}, expected \"full-hash\" or \"suffix\"")]
pub struct ParseShapeError(pub String);

impl FromStr for ResponseShape {
    type Err = ParseShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full-hash" => Ok(ResponseShape::FullHash),
            "suffix" => Ok(ResponseShape::Suffix),
            other => Err(ParseShapeError(other.to_owned())),
        }
    }
}
