use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pwned_client::{CheckError, HttpTransport, PasswordChecker};
use pwned_protocol::{CallError, HashStream, LookupTransport, ResponseShape, to_hex};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "pwned-check")]
#[command(about = "Check passwords against a pwned-server without revealing them")]
struct Args {
    /// Server address as host:port
    #[arg(short, long, env = "PWNED_SERVER_ADDR", default_value = "127.0.0.1:8080")]
    addr: String,

    /// Message shape the server is expected to stream
    #[arg(long, default_value_t = ResponseShape::FullHash)]
    shape: ResponseShape,

    /// Log level for diagnostics on stderr
    #[arg(long, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check one password. Exits with 1 if it has been pwned.
    Check {
        /// Password to check, read from stdin when omitted
        password: Option<String>,
    },
    /// Print every hash the server holds under a prefix
    List {
        /// Five hex characters
        prefix: String,
    },
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("invalid server address: {0}")]
    Address(#[from] http::uri::InvalidUri),

    #[error("could not read password from stdin: {0}")]
    Stdin(#[source] std::io::Error),

    #[error("no password given")]
    NoPassword,

    #[error(transparent)]
    Check(#[from] CheckError),

    #[error("call failed: {0}")]
    Call(#[from] CallError),
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(args.log_level)
        .compact()
        .init();

    let result = run(args).await;
    if let Err(err) = &result {
        eprintln!("{err}");
    }

    ExitCode::from(exit_code(&result))
}

/// What a successful run found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    NotPwned,
    Pwned,
    Listed,
}

/// 0 when not pwned (or listed), 1 when pwned, 2 when no answer was obtained.
fn exit_code(result: &Result<Outcome, Error>) -> u8 {
    match result {
        Ok(Outcome::Pwned) => 1,
        Ok(Outcome::NotPwned | Outcome::Listed) => 0,
        Err(_) => 2,
    }
}

async fn run(args: Args) -> Result<Outcome, Error> {
    let transport = HttpTransport::new(&args.addr)?;

    match args.command {
        Command::Check { password } => {
            let password = match password {
                Some(password) => password,
                None => read_password().await?,
            };

            let checker = PasswordChecker::with_shape(transport, args.shape);
            if checker.is_password_pwned(&password).await? {
                println!("The password has been pwned");
                Ok(Outcome::Pwned)
            } else {
                println!("The password has not been pwned yet");
                Ok(Outcome::NotPwned)
            }
        }
        Command::List { prefix } => {
            let mut stream = transport.list_hashes_for_prefix(&prefix).await?;
            if stream.shape() != args.shape {
                let actual = stream.shape();
                return Err(CallError::ShapeMismatch { expected: args.shape, actual }.into());
            }

            println!("Hashes:");
            while let Some(hash) = stream.message().await? {
                println!("{}", to_hex(&hash));
            }
            Ok(Outcome::Listed)
        }
    }
}

async fn read_password() -> Result<String, Error> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    lines.next_line().await.map_err(Error::Stdin)?.ok_or(Error::NoPassword)
}
