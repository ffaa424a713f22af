use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use pwned_protocol::ResponseShape;

use crate::lifecycle::DEFAULT_GRACE_PERIOD;

/// Environment variable naming the shard directory.
pub const DATA_DIR_ENV: &str = "PWNED_DATA_DIR";

/// Everything the server needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub shape: ResponseShape,
    pub log_level: tracing::Level,
    pub grace_period: Duration,
}

impl ServerConfig {
    pub fn new(listen_addr: SocketAddr, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            listen_addr,
            data_dir: data_dir.into(),
            shape: ResponseShape::default(),
            log_level: tracing::Level::INFO,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pwned-server")]
#[command(about = "Serve k-anonymity lookups over a sharded pwned password corpus")]
pub struct ServerArgs {
    /// Interface and port to listen on
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Directory holding the shard tree written by pwned-shard-builder
    #[arg(short, long, env = DATA_DIR_ENV)]
    pub data_dir: PathBuf,

    /// Bytes sent per record: "full-hash" or "suffix"
    #[arg(long, default_value = "full-hash")]
    pub shape: ResponseShape,

    /// Log level (error, warn, info, debug, trace), RUST_LOG overrides it
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    /// Seconds open streams may keep running after a shutdown signal
    #[arg(long, default_value_t = DEFAULT_GRACE_PERIOD.as_secs())]
    pub grace_period: u64,
}

impl From<ServerArgs> for ServerConfig {
    fn from(args: ServerArgs) -> Self {
        Self {
            listen_addr: args.listen,
            data_dir: args.data_dir,
            shape: args.shape,
            log_level: args.log_level,
            grace_period: Duration::from_secs(args.grace_period),
        }
    }
}
