use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use pwned_client::{HttpTransport, PasswordChecker};
use pwned_protocol::{CallError, Code, HashStream, LookupTransport, PasswordHash, ResponseShape};
use pwned_server::{LookupService, ServeError, Server, ServerConfig, http, run};
use pwned_store::{LocalBackend, MemoryBackend, ShardStore, Storage, StorageError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Returns fixed records for "aaaaa" and nothing for any other key.
#[derive(Default)]
struct StubStorage {
    calls: AtomicUsize,
}

#[async_trait]
impl Storage for StubStorage {
    async fn get(&self, key: &str) -> Result<Vec<Bytes>, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match key {
            "aaaaa" => Ok(vec![Bytes::from_static(b"abcdef"), Bytes::from_static(b"123456")]),
            _ => Ok(Vec::new()),
        }
    }
}

struct FailingStorage;

#[async_trait]
impl Storage for FailingStorage {
    async fn get(&self, key: &str) -> Result<Vec<Bytes>, StorageError> {
        Err(StorageError::Read { key: key.to_owned(), source: io::Error::other("my error") })
    }
}

struct TestServer {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    serving: JoinHandle<Result<(), ServeError>>,
}

impl TestServer {
    async fn start<S: Storage + 'static>(service: LookupService<S>) -> Self {
        let service = Arc::new(service);
        let server = Server::bind("test", "127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = server.local_addr().unwrap();

        let (stop, stopped) = oneshot::channel::<()>();
        let serving = tokio::spawn(server.serve(
            move |req| http::handle(Arc::clone(&service), req),
            async move {
                let _ = stopped.await;
            },
        ));

        Self { addr, stop, serving }
    }

    fn transport(&self) -> HttpTransport {
        HttpTransport::new(&self.addr.to_string()).unwrap()
    }

    async fn stop(self) {
        self.stop.send(()).unwrap();
        self.serving.await.unwrap().unwrap();
    }
}

async fn collect<S: HashStream>(mut stream: S) -> Result<Vec<Bytes>, CallError> {
    let mut messages = Vec::new();
    while let Some(message) = stream.message().await? {
        messages.push(message);
    }
    Ok(messages)
}

#[tokio::test]
async fn test_streams_records_in_order() {
    let server = TestServer::start(LookupService::new(StubStorage::default())).await;

    let stream = server.transport().list_hashes_for_prefix("aaaaa").await.unwrap();
    assert_eq!(stream.shape(), ResponseShape::FullHash);

    let messages = collect(stream).await.unwrap();
    assert_eq!(messages, vec![Bytes::from_static(b"abcdef"), Bytes::from_static(b"123456")]);

    server.stop().await;
}

#[tokio::test]
async fn test_unknown_prefix_is_empty() {
    let server = TestServer::start(LookupService::new(StubStorage::default())).await;

    let stream = server.transport().list_hashes_for_prefix("zzzzz").await.unwrap();
    assert!(collect(stream).await.unwrap().is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_short_prefix_is_invalid_argument() {
    let storage = Arc::new(StubStorage::default());
    let server = TestServer::start(LookupService::new(Arc::clone(&storage))).await;

    let err = server.transport().list_hashes_for_prefix("aa").await.err().unwrap();

    let status = err.status().unwrap();
    assert_eq!(status.code(), Code::InvalidArgument);
    assert!(status.message().contains("prefix length must be 5"), "{status}");
    assert_eq!(storage.calls.load(Ordering::SeqCst), 0);

    server.stop().await;
}

#[tokio::test]
async fn test_storage_failure_is_opaque() {
    let server = TestServer::start(LookupService::new(FailingStorage)).await;

    let err = server.transport().list_hashes_for_prefix("aaaaa").await.err().unwrap();

    let status = err.status().unwrap();
    assert_eq!(status.code(), Code::Internal);
    assert!(!status.message().contains("my error"), "{status}");

    server.stop().await;
}

#[tokio::test]
async fn test_password_checker_over_http() {
    let hash = PasswordHash::of("password123");
    let mut shard = vec![0x11; 20];
    shard.extend_from_slice(hash.as_bytes());
    shard.extend_from_slice(&[0x22; 20]);

    let backend = MemoryBackend::new().with_shard("cbfda", shard);
    let server = TestServer::start(LookupService::new(ShardStore::new(backend))).await;

    let checker = PasswordChecker::new(server.transport());
    let verdict = checker.check("password123").await.unwrap();
    assert!(verdict.pwned);
    assert_eq!(verdict.compared, 3);

    assert!(!checker.is_password_pwned("correct horse battery staple").await.unwrap());

    server.stop().await;
}

#[tokio::test]
async fn test_suffix_server_and_client() {
    let hash = PasswordHash::of("password123");
    let backend = MemoryBackend::new().with_shard("cbfda", hash.as_bytes().to_vec());
    let service = LookupService::with_shape(ShardStore::new(backend), ResponseShape::Suffix);
    let server = TestServer::start(service).await;

    let stream = server.transport().list_hashes_for_prefix("cbfda").await.unwrap();
    assert_eq!(stream.shape(), ResponseShape::Suffix);
    assert_eq!(collect(stream).await.unwrap(), vec![Bytes::copy_from_slice(hash.suffix())]);

    let checker = PasswordChecker::with_shape(server.transport(), ResponseShape::Suffix);
    assert!(checker.is_password_pwned("password123").await.unwrap());

    server.stop().await;
}

#[tokio::test]
async fn test_shape_mismatch_is_refused() {
    let service = LookupService::with_shape(StubStorage::default(), ResponseShape::Suffix);
    let server = TestServer::start(service).await;

    let checker = PasswordChecker::new(server.transport());
    let err = checker.check("password123").await.unwrap_err();

    assert!(matches!(err.into_call_error(), CallError::ShapeMismatch { .. }));

    server.stop().await;
}

#[tokio::test]
async fn test_stopped_server_refuses_calls() {
    let server = TestServer::start(LookupService::new(StubStorage::default())).await;
    let transport = server.transport();

    server.stop().await;

    let err = transport.list_hashes_for_prefix("aaaaa").await.err().unwrap();
    assert!(matches!(err, CallError::Transport(_)));
}

#[tokio::test]
async fn test_serves_shards_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("cbf")).unwrap();
    std::fs::write(dir.path().join("cbf").join("da.bin"), PasswordHash::of("password123").as_bytes())
        .unwrap();

    let service = LookupService::new(ShardStore::new(LocalBackend::new(dir.path())));
    let server = TestServer::start(service).await;

    let checker = PasswordChecker::new(server.transport());
    assert!(checker.is_password_pwned("password123").await.unwrap());
    assert!(!checker.is_password_pwned("correct horse battery staple").await.unwrap());

    server.stop().await;
}

#[tokio::test]
async fn test_run_requires_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing");
    let config = ServerConfig::new("127.0.0.1:0".parse().unwrap(), &missing);

    let err = run(config, std::future::pending(), || {}).await.unwrap_err();

    assert!(matches!(err, ServeError::DataDir { path } if path == missing));
}
