//! Process lifecycle of an HTTP server: bind, serve, stop gracefully, flush.

use std::convert::Infallible;
use std::error::Error as StdError;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use http::{Request, Response};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;

/// How long in-flight connections may keep running after shutdown starts.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Pause after a failed accept, so descriptor exhaustion does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("binding {addr} failed: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("data directory {path:?} does not exist")]
    DataDir { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

type FlushFn = Box<dyn FnOnce() + Send>;

/// A bound HTTP/1.1 server.
///
/// What the server does is decided by the handler passed to
/// [`Server::serve`]; this type only owns the listener and the
/// start/stop sequence around it.
pub struct Server {
    name: String,
    listener: TcpListener,
    grace_period: Duration,
    flushers: Vec<FlushFn>,
}

impl Server {
    pub async fn bind(name: impl Into<String>, addr: SocketAddr) -> Result<Self, ServeError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServeError::Bind { addr, source })?;

        Ok(Self {
            name: name.into(),
            listener,
            grace_period: DEFAULT_GRACE_PERIOD,
            flushers: Vec::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Registers a hook run after the server stopped, in registration order.
    pub fn on_stop(mut self, flush: impl FnOnce() + Send + 'static) -> Self {
        self.flushers.push(Box::new(flush));
        self
    }

    /// Serves connections with `handler` until `shutdown` resolves.
    ///
    /// On shutdown the listener closes, open connections get the grace
    /// period to finish, then the stop hooks run.
    pub async fn serve<H, Fut, B>(
        self,
        handler: H,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), ServeError>
    where
        H: Fn(Request<Incoming>) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = Result<Response<B>, Infallible>> + Send + 'static,
        B: Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let Server { name, listener, grace_period, flushers } = self;
        let graceful = GracefulShutdown::new();
        tokio::pin!(shutdown);

        tracing::info!(server = %name, "server started");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(err) => {
                            tracing::warn!(server = %name, error = %err, "accept failed");
                            tokio::time::sleep(ACCEPT_BACKOFF).await;
                            continue;
                        }
                    };

                    let handler = handler.clone();
                    let conn = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service_fn(move |req| handler(req)));
                    let conn = graceful.watch(conn);

                    tokio::spawn(async move {
                        if let Err(err) = conn.await {
                            tracing::debug!(%peer, error = %err, "connection ended with error");
                        }
                    });
                }
                _ = &mut shutdown => break,
            }
        }

        drop(listener);
        tracing::info!(server = %name, "stopping server");

        if tokio::time::timeout(grace_period, graceful.shutdown()).await.is_err() {
            tracing::warn!(
                server = %name,
                grace_period = ?grace_period,
                "grace period elapsed with connections still open"
            );
        }

        for flush in flushers {
            flush();
        }

        tracing::info!(server = %name, "server stopped");
        Ok(())
    }
}
