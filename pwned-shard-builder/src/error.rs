use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not read input: {0}")]
    Read(#[source] std::io::Error),

    #[error("unexpected line {line}: {content:?}")]
    MalformedLine { line: u64, content: String },

    #[error("could not write shard {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output directory {path:?} is not empty. Use --force to overwrite")]
    FileExists { path: PathBuf },

    #[error("invalid progress template: {0}")]
    ProgressTemplate(#[from] indicatif::style::TemplateError),
}
