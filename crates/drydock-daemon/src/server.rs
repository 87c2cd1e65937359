//! Unix socket server

use crate::queue::JobQueueRunner;
use crate::request;
use drydock_core::protocol::{self, CheckRequest, Request, Response, SubmittedFile};
use drydock_core::{CheckOutcome, CheckRunner, NamespaceAllocator, RunNamespace};
use std::sync::Arc;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{UnixListener, UnixStream},
    sync::oneshot,
};

/// Everything a connection needs to serve requests
pub struct ServerState {
    pub queue: JobQueueRunner,
    pub runner: Arc<CheckRunner>,
    pub allocator: NamespaceAllocator,
}

/// Run the daemon server
pub async fn run(
    listener: UnixListener,
    state: Arc<ServerState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    loop {
        let (stream, _) = listener.accept().await?;
        let state = Arc::clone(&state);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, state).await {
                tracing::error!(error = %e, "connection error");
            }
        });
    }
}

/// Handle a single client connection
async fn handle_connection(
    mut stream: UnixStream,
    state: Arc<ServerState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut buf = vec![0u8; 64 * 1024]; // 64KB buffer

    loop {
        // Read length prefix (4 bytes, big-endian)
        let mut len_buf = [0u8; 4];
        if stream.read_exact(&mut len_buf).await.is_err() {
            break; // Client disconnected
        }
        let len = u32::from_be_bytes(len_buf) as usize;

        if len > buf.len() {
            buf.resize(len, 0);
        }

        // Read message
        stream.read_exact(&mut buf[..len]).await?;

        // Decode request
        let request: Request = protocol::decode(&buf[..len])?;

        // Handle request
        let response = handle_request(request, &state).await;

        // Encode response
        let response_bytes = protocol::encode(&response)?;

        // Write length prefix + response
        let len_bytes = (response_bytes.len() as u32).to_be_bytes();
        stream.write_all(&len_bytes).await?;
        stream.write_all(&response_bytes).await?;
    }

    Ok(())
}

/// Handle a single request
async fn handle_request(request: Request, state: &Arc<ServerState>) -> Response {
    match request {
        Request::Check(req) => check(req, state).await,
        Request::Status => {
            let status = state.queue.status();
            Response::Status {
                capacity: status.capacity,
                in_flight: status.in_flight,
                queued: status.queued,
            }
        }
        Request::Ping => Response::Pong,
    }
}

/// Admit one submission: validate, allocate a namespace, stage the files,
/// queue the run, and relay the verdict back to this connection.
async fn check(req: CheckRequest, state: &Arc<ServerState>) -> Response {
    let submission = match request::parse_submission(&req) {
        Ok(submission) => submission,
        Err(e) => {
            tracing::error!(error = %e, "rejected submission");
            return Response::Check(CheckOutcome::Error {
                message: e.to_string(),
            });
        }
    };

    let namespace = match state.allocator.allocate(&submission.main_file).await {
        Ok(namespace) => namespace,
        Err(e) => {
            // May be a sign that the uploads directory is too big, or that
            // we were severely unlucky.
            tracing::error!(
                error = %e,
                main_file = %submission.main_file,
                "failed to allocate namespace"
            );
            return Response::Check(CheckOutcome::Error {
                message: String::from(
                    "your request could not be served at this time, please try again later",
                ),
            });
        }
    };
    tracing::info!(
        namespace = %namespace.id,
        source = ?submission.source,
        main_file = %submission.main_file,
        files = req.files.len(),
        "received submission"
    );

    if let Err(e) = stage_files(&namespace, &req.files).await {
        tracing::error!(namespace = %namespace.id, error = %e, "failed to stage submission");
        state.allocator.destroy(&namespace).await;
        return Response::Check(CheckOutcome::Error {
            message: String::from("failed to save the submitted files on the server"),
        });
    }

    let (tx, rx) = oneshot::channel();
    let runner = Arc::clone(&state.runner);
    let allocator = state.allocator.clone();
    let options = req.options;
    state.queue.register(async move {
        let outcome = runner.run(&namespace, options.as_deref()).await;
        // The workspace is reclaimed here, after the outcome is settled;
        // the orchestrator itself only removes the container.
        allocator.destroy(&namespace).await;
        tracing::info!(namespace = %namespace.id, outcome = outcome.label(), "check finished");
        let _ = tx.send(outcome);
    });

    match rx.await {
        Ok(outcome) => Response::Check(outcome),
        Err(_) => Response::Error {
            message: String::from("check job was dropped before completion"),
        },
    }
}

/// Write the submitted files into the workspace; paths were validated at
/// submission parsing.
async fn stage_files(
    namespace: &RunNamespace,
    files: &[SubmittedFile],
) -> std::io::Result<()> {
    for file in files {
        let target = namespace.directory.join(&file.path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &file.contents).await?;
    }
    Ok(())
}
