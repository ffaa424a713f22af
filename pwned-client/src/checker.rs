use std::fmt;

use pwned_protocol::{CallError, HashStream, LookupTransport, PasswordHash, ResponseShape, Status};
use subtle::Choice;

use crate::compare::constant_time_eq;

/// Result of a completed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub pwned: bool,
    /// Number of records compared, always every record the server sent.
    pub compared: usize,
}

/// Where a failed check stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Opening,
    Receiving,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Opening => f.write_str("opening the lookup"),
            Stage::Receiving => f.write_str("receiving hashes"),
        }
    }
}

/// A check that produced no answer. This is never the same as "not pwned".
#[derive(Debug, thiserror::Error)]
#[error("password check failed while {stage}: {source}")]
pub struct CheckError {
    stage: Stage,
    source: CallError,
}

impl CheckError {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Status the server answered with, if it answered at all.
    pub fn status(&self) -> Option<&Status> {
        self.source.status()
    }

    pub fn into_call_error(self) -> CallError {
        self.source
    }
}

/// Checks passwords against a lookup server without revealing them.
///
/// A check moves through `hash computed → stream open → receiving* →
/// drained → matched | not matched`; a failure at any point ends it with a
/// [`CheckError`] instead.
pub struct PasswordChecker<T> {
    transport: T,
    shape: ResponseShape,
}

impl<T: LookupTransport> PasswordChecker<T> {
    pub fn new(transport: T) -> Self {
        Self::with_shape(transport, ResponseShape::default())
    }

    /// Checker expecting the server to stream `shape` messages.
    pub fn with_shape(transport: T, shape: ResponseShape) -> Self {
        Self { transport, shape }
    }

    /// Returns whether `password` appears in the server's corpus.
    pub async fn is_password_pwned(&self, password: &str) -> Result<bool, CheckError> {
        Ok(self.check(password).await?.pwned)
    }

    #[tracing::instrument(
        name = "PasswordChecker::check",
        skip_all,
        fields(prefix = tracing::field::Empty)
    )]
    pub async fn check(&self, password: &str) -> Result<Verdict, CheckError> {
        let hash = PasswordHash::of(password);
        let prefix = hash.prefix();
        tracing::Span::current().record("prefix", prefix.as_str());

        let opening = |source| CheckError { stage: Stage::Opening, source };

        let mut stream =
            self.transport.list_hashes_for_prefix(prefix.as_str()).await.map_err(opening)?;

        if stream.shape() != self.shape {
            return Err(opening(CallError::ShapeMismatch {
                expected: self.shape,
                actual: stream.shape(),
            }));
        }

        let verdict = drain(&mut stream, self.shape.expected(&hash))
            .await
            .map_err(|source| CheckError { stage: Stage::Receiving, source })?;

        tracing::debug!(compared = verdict.compared, "stream drained");
        Ok(verdict)
    }
}

/// Compares every remaining message of `stream` with `expected`.
///
/// Reads until the server ends the stream, even after a match, and folds the
/// comparisons without branching on them. Stopping early would show in the
/// connection's duration and byte count.
pub async fn drain<S>(stream: &mut S, expected: &[u8]) -> Result<Verdict, CallError>
where
    S: HashStream + ?Sized,
{
    let mut matched = Choice::from(0);
    let mut compared = 0;

    while let Some(candidate) = stream.message().await? {
        matched |= constant_time_eq(&candidate, expected);
        compared += 1;
    }

    Ok(Verdict { pwned: matched.into(), compared })
}
