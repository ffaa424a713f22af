use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pwned_shard_builder::{Error, build_shards, prepare_output};
use tokio::fs;
use tokio::io::{AsyncRead, BufReader};

#[derive(Parser, Debug)]
#[command(name = "pwned-shard-builder")]
#[command(about = "Convert a HASH:count password corpus into prefix shards for pwned-server")]
struct Args {
    /// Corpus file, or - for stdin
    input: PathBuf,

    /// Output directory for shard files
    #[arg(short, long)]
    output: PathBuf,

    /// Overwrite existing output directory
    #[arg(long)]
    force: bool,

    /// Disable progress spinner
    #[arg(long)]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    prepare_output(&args.output, args.force).await?;

    let input: Box<dyn AsyncRead + Send + Unpin> = if args.input.as_os_str() == "-" {
        Box::new(tokio::io::stdin())
    } else {
        Box::new(fs::File::open(&args.input).await.map_err(Error::Read)?)
    };

    let progress_counter = Arc::new(AtomicU64::new(0));

    let progress_bar = if !args.no_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {pos} lines ({per_sec}) {msg}")?,
        );
        Some(pb)
    } else {
        None
    };

    let progress_counter_clone = Arc::clone(&progress_counter);
    let progress_bar_clone = progress_bar.clone();
    let progress_task = tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if let Some(ref pb) = progress_bar_clone {
                pb.set_position(progress_counter_clone.load(Ordering::Relaxed));
            }
        }
    });

    let result = build_shards(BufReader::new(input), &args.output, progress_counter).await;

    progress_task.abort();
    if let Some(pb) = progress_bar {
        pb.finish_with_message(if result.is_ok() { "done" } else { "failed" });
    }

    let summary = result?;
    println!("Wrote {} hashes to {} shards in {:?}", summary.hashes, summary.shards, args.output);
    Ok(())
}
