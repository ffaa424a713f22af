use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use pwned_protocol::{PasswordHash, Prefix};
use pwned_store::{SHARD_EXTENSION, shard_path};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::Error;

/// Counts reported once a build finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub hashes: u64,
    pub shards: u64,
}

/// Appends hashes to the shard of their prefix.
///
/// Keeps one shard open at a time, so sorted input touches each file once.
/// A shard is truncated the first time its prefix shows up in this run and
/// appended to afterwards.
pub struct ShardWriter {
    dir: PathBuf,
    seen: HashSet<Prefix>,
    current: Option<(Prefix, PathBuf, BufWriter<File>)>,
    hashes: u64,
}

impl ShardWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), seen: HashSet::new(), current: None, hashes: 0 }
    }

    pub fn path_for(&self, prefix: &Prefix) -> PathBuf {
        self.dir.join(shard_path(prefix.as_str(), SHARD_EXTENSION))
    }

    pub async fn write(&mut self, hash: &PasswordHash) -> Result<(), Error> {
        let prefix = hash.prefix();

        if self.current.as_ref().is_none_or(|(open, _, _)| *open != prefix) {
            self.close_current().await?;
            let path = self.path_for(&prefix);
            let file = self.open(prefix, &path).await.map_err(|source| Error::Write {
                path: path.clone(),
                source,
            })?;
            self.current = Some((prefix, path, BufWriter::new(file)));
        }

        if let Some((_, path, writer)) = self.current.as_mut() {
            writer
                .write_all(hash.as_bytes())
                .await
                .map_err(|source| Error::Write { path: path.clone(), source })?;
        }

        self.hashes += 1;
        Ok(())
    }

    /// Flushes the open shard and returns the totals.
    pub async fn finish(mut self) -> Result<Summary, Error> {
        self.close_current().await?;
        Ok(Summary { hashes: self.hashes, shards: self.seen.len() as u64 })
    }

    async fn open(&mut self, prefix: Prefix, path: &Path) -> io::Result<File> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if self.seen.insert(prefix) {
            File::create(path).await
        } else {
            OpenOptions::new().append(true).open(path).await
        }
    }

    async fn close_current(&mut self) -> Result<(), Error> {
        if let Some((_, path, mut writer)) = self.current.take() {
            writer.shutdown().await.map_err(|source| Error::Write { path, source })?;
        }
        Ok(())
    }
}
