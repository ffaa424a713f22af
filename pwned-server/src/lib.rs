//! Lookup server for k-anonymity password breach checks.
//!
//! The server answers `list_hashes_for_prefix` calls: it validates the
//! prefix, reads the prefix's shard and streams every stored hash back one
//! message at a time. It never learns which of those hashes the caller was
//! interested in.
//!
//! [`LookupService`] holds the call logic and is transport independent.
//! [`InProcessTransport`] runs it behind a bounded channel, and [`http`]
//! binds it to HTTP/1.1 for [`Server`].

pub mod channel;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod service;
pub mod telemetry;

use std::future::Future;
use std::sync::Arc;

use pwned_store::{LocalBackend, ShardStore};

pub use channel::{ChannelStream, Event, InProcessTransport, spawn_lookup};
pub use config::{ServerArgs, ServerConfig};
pub use lifecycle::{ServeError, Server};
pub use service::{LookupError, LookupService};

/// Serves the shards under `config.data_dir` until `shutdown` resolves.
///
/// `flush` runs once the server has stopped, after in-flight streams drained
/// or the grace period elapsed.
pub async fn run(
    config: ServerConfig,
    shutdown: impl Future<Output = ()>,
    flush: impl FnOnce() + Send + 'static,
) -> Result<(), ServeError> {
    if !config.data_dir.is_dir() {
        return Err(ServeError::DataDir { path: config.data_dir });
    }

    let storage = ShardStore::new(LocalBackend::new(&config.data_dir));
    let service = Arc::new(LookupService::with_shape(storage, config.shape));

    let server = Server::bind("pwned-server", config.listen_addr)
        .await?
        .with_grace_period(config.grace_period)
        .on_stop(flush);

    tracing::info!(
        addr = %server.local_addr()?,
        data_dir = %config.data_dir.display(),
        shape = %config.shape,
        "serving lookups"
    );

    server
        .serve(move |req| http::handle(Arc::clone(&service), req), shutdown)
        .await
}
