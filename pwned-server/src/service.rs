use bytes::Bytes;
use pwned_protocol::{HashSink, PREFIX_LEN, ResponseShape, SendError, Status};
use pwned_store::{Storage, StorageError};

/// Why a lookup call ended early.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("prefix length must be {PREFIX_LEN}, got {0}")]
    PrefixLength(usize),

    #[error("prefix must be alphanumeric")]
    PrefixCharacters,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("stored record of {len} bytes has no {shape} form")]
    RecordTooShort { len: usize, shape: ResponseShape },

    #[error("sending response failed: {0}")]
    Send(#[from] SendError),
}

impl LookupError {
    /// Status reported to the caller, or `None` when the caller is gone.
    ///
    /// Server-side failures collapse into one opaque internal status. The
    /// detailed error stays in this process's logs.
    pub fn to_status(&self) -> Option<Status> {
        match self {
            LookupError::PrefixLength(_) => Some(Status::invalid_argument(format!(
                "prefix length must be {PREFIX_LEN}"
            ))),
            LookupError::PrefixCharacters => {
                Some(Status::invalid_argument("prefix must be alphanumeric"))
            }
            LookupError::Storage(_) | LookupError::RecordTooShort { .. } => {
                Some(Status::internal())
            }
            LookupError::Send(_) => None,
        }
    }
}

/// Cheap, deterministic checks run before any storage access.
fn validate_prefix(prefix: &str) -> Result<(), LookupError> {
    if prefix.len() != PREFIX_LEN {
        return Err(LookupError::PrefixLength(prefix.len()));
    }
    if !prefix.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(LookupError::PrefixCharacters);
    }
    Ok(())
}

/// Streams every stored hash for a prefix.
///
/// The service keeps no per-call state, so one instance serves any number of
/// concurrent calls.
#[derive(Debug)]
pub struct LookupService<S> {
    storage: S,
    shape: ResponseShape,
}

impl<S: Storage> LookupService<S> {
    pub fn new(storage: S) -> Self {
        Self::with_shape(storage, ResponseShape::default())
    }

    pub fn with_shape(storage: S, shape: ResponseShape) -> Self {
        Self { storage, shape }
    }

    pub fn shape(&self) -> ResponseShape {
        self.shape
    }

    /// Sends every record stored under `prefix` to `sink`, in storage order.
    ///
    /// A prefix without a shard sends nothing and succeeds. A failed send
    /// ends the call; it is not retried.
    #[tracing::instrument(
        name = "LookupService::list_hashes_for_prefix",
        skip(self, sink),
        fields(shape = %self.shape, sent = tracing::field::Empty)
    )]
    pub async fn list_hashes_for_prefix<K>(
        &self,
        prefix: &str,
        sink: &mut K,
    ) -> Result<(), LookupError>
    where
        K: HashSink + ?Sized,
    {
        if let Err(err) = validate_prefix(prefix) {
            tracing::debug!(error = %err, "rejected prefix");
            return Err(err);
        }

        let records = self.storage.get(prefix).await.inspect_err(|err| {
            if err.is_corruption() {
                tracing::error!(corruption = true, error = %err, "corrupt shard");
            } else {
                tracing::error!(error = %err, "reading shard failed");
            }
        })?;

        let mut sent = 0usize;
        for record in records {
            let message = self.message_for(record)?;
            if let Err(err) = sink.send(message).await {
                tracing::debug!(sent, "receiver went away");
                return Err(err.into());
            }
            sent += 1;
        }

        tracing::Span::current().record("sent", sent);
        Ok(())
    }

    fn message_for(&self, record: Bytes) -> Result<Bytes, LookupError> {
        match self.shape.project(&record) {
            Some(message) => Ok(record.slice_ref(message)),
            None => {
                let err = LookupError::RecordTooShort { len: record.len(), shape: self.shape };
                tracing::error!(error = %err, "cannot shape record");
                Err(err)
            }
        }
    }
}
