//! Converts a password hash corpus into the shard layout read by
//! `pwned-server`.
//!
//! The input is the Have I Been Pwned export format, one `HEXHASH:count` line
//! per SHA1 digest. Each digest is written as 20 raw bytes to the shard of
//! its lowercase 5-character prefix:
//!
//! ```text
//! CBFDAC6008F9CAB4083784CBD1874F76618D2A97:2254650  ->  cbf/da.bin
//! ```
//!
//! Sorted input (as published) opens every shard once. Unsorted input is
//! still correct, it only reopens shards more often.
//!
//! # Usage
//!
//! ```sh
//! pwned-shard-builder pwned-passwords-sha1-ordered-by-hash.txt --output ./shards
//! ```

pub mod conversion;
pub mod error;
pub mod writer;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub use conversion::{decode_hash, hex_to_nibble, parse_line};
pub use error::Error;
pub use writer::{ShardWriter, Summary};

/// Makes `output` an empty directory to build into.
///
/// A directory with contents is only cleared when `force` is set.
pub async fn prepare_output(output: &Path, force: bool) -> Result<(), Error> {
    if is_non_empty_dir(output).await? {
        if !force {
            return Err(Error::FileExists { path: output.to_path_buf() });
        }
        fs::remove_dir_all(output).await?;
    }

    fs::create_dir_all(output).await?;
    Ok(())
}

async fn is_non_empty_dir(path: &Path) -> Result<bool, Error> {
    if !fs::try_exists(path).await? {
        return Ok(false);
    }

    let mut entries = fs::read_dir(path).await?;
    Ok(entries.next_entry().await?.is_some())
}

/// Reads every line of `input` and writes its hash below `output`.
///
/// `progress` is bumped once per line. Stops at the first malformed line,
/// leaving shards written so far in place.
pub async fn build_shards<R>(
    input: R,
    output: &Path,
    progress: Arc<AtomicU64>,
) -> Result<Summary, Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut writer = ShardWriter::new(output);
    let mut lines = input.lines();
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await.map_err(Error::Read)? {
        line_no += 1;
        progress.fetch_add(1, Ordering::Relaxed);

        if line.trim().is_empty() {
            continue;
        }

        let hash = parse_line(&line)
            .ok_or_else(|| Error::MalformedLine { line: line_no, content: line.clone() })?;
        writer.write(&hash).await?;
    }

    writer.finish().await
}
