//! drydock CLI - Command line client for the checking daemon

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use drydock_core::config::default_socket_path;
use drydock_core::outcome::CheckOutcome;
use drydock_core::protocol::{self, CheckRequest, Request, Response, SubmittedFile};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

#[derive(Parser)]
#[command(name = "drydock")]
#[command(author, version, about = "Submit programs to the drydock checking daemon")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a program file
    Check {
        /// Program file to submit
        file: PathBuf,

        /// Entry file name inside the submission (defaults to the file name)
        #[arg(short, long)]
        main: Option<String>,

        /// Pass-through checker options, e.g. "-c C=3"
        #[arg(short, long)]
        options: Option<String>,

        /// Socket path (defaults to DRYDOCK_SOCKET env var or /run/drydock/drydock.sock)
        #[arg(short, long)]
        socket: Option<PathBuf>,
    },

    /// Get daemon queue status
    Status {
        /// Socket path (defaults to DRYDOCK_SOCKET env var or /run/drydock/drydock.sock)
        #[arg(short, long)]
        socket: Option<PathBuf>,
    },

    /// Ping the daemon
    Ping {
        /// Socket path (defaults to DRYDOCK_SOCKET env var or /run/drydock/drydock.sock)
        #[arg(short, long)]
        socket: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("drydock=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            file,
            main,
            options,
            socket,
        } => {
            let contents = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let main = main.unwrap_or_else(|| {
                file.file_name()
                    .map_or_else(|| String::from("main.ex"), |n| n.to_string_lossy().into_owned())
            });

            let request = Request::Check(CheckRequest {
                // The daemon expects web-ide mains as JSON segment arrays.
                main: serde_json::to_string(&vec![main.clone()])?,
                source: Some(String::from("web-ide")),
                version: None,
                files: vec![SubmittedFile {
                    path: main,
                    contents,
                }],
                options,
            });

            let response = roundtrip(&socket.unwrap_or_else(default_socket_path), &request).await?;
            match response {
                Response::Check(outcome) => print_outcome(&outcome)?,
                other => bail!("unexpected response: {other:?}"),
            }
        }

        Commands::Status { socket } => {
            let response =
                roundtrip(&socket.unwrap_or_else(default_socket_path), &Request::Status).await?;
            match response {
                Response::Status {
                    capacity,
                    in_flight,
                    queued,
                } => println!("capacity {capacity}, in flight {in_flight}, queued {queued}"),
                other => bail!("unexpected response: {other:?}"),
            }
        }

        Commands::Ping { socket } => {
            let response =
                roundtrip(&socket.unwrap_or_else(default_socket_path), &Request::Ping).await?;
            match response {
                Response::Pong => println!("pong"),
                other => bail!("unexpected response: {other:?}"),
            }
        }
    }

    Ok(())
}

/// Send one framed request and read one framed response
async fn roundtrip(socket: &Path, request: &Request) -> Result<Response> {
    let mut stream = UnixStream::connect(socket)
        .await
        .with_context(|| format!("failed to connect to daemon at {}", socket.display()))?;

    let request_bytes = protocol::encode(request)?;
    stream
        .write_all(&(request_bytes.len() as u32).to_be_bytes())
        .await?;
    stream.write_all(&request_bytes).await?;

    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await?;

    Ok(protocol::decode(&buf)?)
}

fn print_outcome(outcome: &CheckOutcome) -> Result<()> {
    match outcome {
        CheckOutcome::Violation { report, trace } => {
            println!("violation");
            println!("{}", serde_json::to_string_pretty(report)?);
            if let Some(trace) = trace {
                println!(
                    "trace: {} (kept for {}s)",
                    trace.location,
                    trace.ttl.as_secs()
                );
            }
        }
        CheckOutcome::Completed { output } => {
            println!("completed");
            if !output.is_empty() {
                println!("{output}");
            }
        }
        CheckOutcome::Error { message } => println!("error: {message}"),
        CheckOutcome::Timeout { message } => println!("timeout: {message}"),
        CheckOutcome::OutOfMemory { message } => println!("out of memory: {message}"),
        CheckOutcome::Internal { message } => println!("internal error: {message}"),
    }
    Ok(())
}
