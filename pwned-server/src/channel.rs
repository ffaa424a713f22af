//! Runs lookups on their own task behind a bounded channel.
//!
//! The channel is the backpressure point: the lookup task waits whenever the
//! receiver is [`CHANNEL_DEPTH`] messages behind, and stops at its next send
//! once the receiver is dropped.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use pwned_protocol::{
    CallError, HashSink, HashStream, LookupTransport, ResponseShape, SendError, Status,
};
use pwned_store::Storage;
use tokio::sync::mpsc;

use crate::service::LookupService;

/// Messages buffered between a lookup task and its receiver.
pub const CHANNEL_DEPTH: usize = 16;

/// One step of a lookup stream.
///
/// The stream only counts as complete after [`Event::Done`]; a channel that
/// closes without it means the lookup task died.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Message(Bytes),
    Done,
    Failed(Status),
}

struct ChannelSink {
    tx: mpsc::Sender<Event>,
}

#[async_trait]
impl HashSink for ChannelSink {
    async fn send(&mut self, message: Bytes) -> Result<(), SendError> {
        self.tx.send(Event::Message(message)).await.map_err(|_| SendError)
    }
}

/// Starts a lookup for `prefix` and returns its event stream.
pub fn spawn_lookup<S>(service: Arc<LookupService<S>>, prefix: String) -> mpsc::Receiver<Event>
where
    S: Storage + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);

    tokio::spawn(async move {
        let mut sink = ChannelSink { tx };
        let last = match service.list_hashes_for_prefix(&prefix, &mut sink).await {
            Ok(()) => Event::Done,
            Err(err) => match err.to_status() {
                Some(status) => Event::Failed(status),
                None => return,
            },
        };
        // The receiver may be gone by now, nothing left to tell it then.
        let _ = sink.tx.send(last).await;
    });

    rx
}

/// Calls a [`LookupService`] living in the same process.
pub struct InProcessTransport<S> {
    service: Arc<LookupService<S>>,
}

impl<S> InProcessTransport<S> {
    pub fn new(service: Arc<LookupService<S>>) -> Self {
        Self { service }
    }
}

impl<S> Clone for InProcessTransport<S> {
    fn clone(&self) -> Self {
        Self { service: Arc::clone(&self.service) }
    }
}

#[async_trait]
impl<S: Storage + 'static> LookupTransport for InProcessTransport<S> {
    type Stream = ChannelStream;

    async fn list_hashes_for_prefix(&self, prefix: &str) -> Result<ChannelStream, CallError> {
        Ok(ChannelStream {
            events: spawn_lookup(Arc::clone(&self.service), prefix.to_owned()),
            shape: self.service.shape(),
            done: false,
            failed: None,
        })
    }
}

/// Client end of an in-process lookup.
pub struct ChannelStream {
    events: mpsc::Receiver<Event>,
    shape: ResponseShape,
    done: bool,
    failed: Option<Status>,
}

#[async_trait]
impl HashStream for ChannelStream {
    fn shape(&self) -> ResponseShape {
        self.shape
    }

    async fn message(&mut self) -> Result<Option<Bytes>, CallError> {
        if self.done {
            return Ok(None);
        }
        if let Some(status) = &self.failed {
            return Err(status.clone().into());
        }

        match self.events.recv().await {
            Some(Event::Message(message)) => Ok(Some(message)),
            Some(Event::Done) => {
                self.done = true;
                Ok(None)
            }
            Some(Event::Failed(status)) => {
                self.failed = Some(status.clone());
                Err(status.into())
            }
            None => Err(CallError::transport("lookup ended without completing the stream")),
        }
    }
}

#[cfg(test)]
mod tests {
    use pwned_protocol::Code;
    use pwned_store::{MemoryBackend, ShardStore};

    use super::*;

    fn transport(backend: MemoryBackend) -> InProcessTransport<ShardStore<MemoryBackend>> {
        InProcessTransport::new(Arc::new(LookupService::new(ShardStore::new(backend))))
    }

    async fn drain(stream: &mut ChannelStream) -> Result<Vec<Bytes>, CallError> {
        let mut messages = Vec::new();
        while let Some(message) = stream.message().await? {
            messages.push(message);
        }
        Ok(messages)
    }

    #[tokio::test]
    async fn test_streams_more_records_than_channel_depth() {
        let records: Vec<u8> = (0..CHANNEL_DEPTH * 3).flat_map(|i| [i as u8; 20]).collect();
        let transport = transport(MemoryBackend::new().with_shard("aaaaa", records));

        let mut stream = transport.list_hashes_for_prefix("aaaaa").await.unwrap();
        let messages = drain(&mut stream).await.unwrap();

        assert_eq!(messages.len(), CHANNEL_DEPTH * 3);
        for (i, message) in messages.iter().enumerate() {
            assert_eq!(message.as_ref(), &[i as u8; 20]);
        }
        // End of stream is sticky.
        assert_eq!(stream.message().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_prefix_ends_immediately() {
        let transport = transport(MemoryBackend::new());

        let mut stream = transport.list_hashes_for_prefix("zzzzz").await.unwrap();

        assert_eq!(stream.shape(), ResponseShape::FullHash);
        assert_eq!(stream.message().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_status_surfaces_on_receive() {
        let transport = transport(MemoryBackend::new());

        let mut stream = transport.list_hashes_for_prefix("aa").await.unwrap();
        let err = stream.message().await.unwrap_err();

        assert_eq!(err.status().map(Status::code), Some(Code::InvalidArgument));
    }

    #[tokio::test]
    async fn test_failed_stream_keeps_its_status() {
        let transport = transport(MemoryBackend::new());

        let mut stream = transport.list_hashes_for_prefix("aa").await.unwrap();
        let first = stream.message().await.unwrap_err();
        let second = stream.message().await.unwrap_err();

        assert_eq!(first.status(), second.status());
        assert_eq!(second.status().map(Status::code), Some(Code::InvalidArgument));
    }

    #[tokio::test]
    async fn test_vanished_task_is_transport_error() {
        let (tx, events) = mpsc::channel(1);
        tx.send(Event::Message(Bytes::from_static(b"abc"))).await.unwrap();
        drop(tx);

        let mut stream = ChannelStream {
            events,
            shape: ResponseShape::FullHash,
            done: false,
            failed: None,
        };

        assert_eq!(stream.message().await.unwrap(), Some(Bytes::from_static(b"abc")));
        assert!(matches!(stream.message().await, Err(CallError::Transport(_))));
    }

    #[tokio::test]
    async fn test_dropped_receiver_stops_lookup() {
        let records: Vec<u8> = vec![7u8; 20 * (CHANNEL_DEPTH + 8)];
        let service = Arc::new(LookupService::new(ShardStore::new(
            MemoryBackend::new().with_shard("aaaaa", records),
        )));

        let mut events = spawn_lookup(Arc::clone(&service), "aaaaa".to_owned());
        assert!(matches!(events.recv().await, Some(Event::Message(_))));
        drop(events);

        // The task releases its handle on the service once its send fails.
        for _ in 0..100 {
            if Arc::strong_count(&service) == 1 {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("lookup task kept running after its receiver was dropped");
    }
}
