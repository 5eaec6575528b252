//! TCP server for the parsing service
//!
//! Reads newline-delimited JSON requests and answers each on the same
//! connection. Parses run on blocking workers, at most `workers` at a time;
//! further requests wait for a permit at the server.

use crate::dispatcher::Dispatcher;
use crate::health::HealthReporter;
use crate::protocol::{ParseDocumentResponse, Request, Response};
use anyhow::{Context, Result};
use docparse_core::{DocumentFormat, LabelSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

/// Server tuning, resolved from configuration and CLI flags
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub workers: usize,
    pub labels: LabelSet,
    pub parse_timeout: Option<Duration>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            workers: crate::config::DEFAULT_WORKERS,
            labels: LabelSet::default(),
            parse_timeout: None,
        }
    }
}

/// Shared state for connection handlers
struct ServerState {
    dispatcher: Dispatcher,
    health: HealthReporter,
    permits: Arc<Semaphore>,
}

pub struct Server {
    listener: TcpListener,
    state: Arc<ServerState>,
}

impl Server {
    /// Bind to `addr`, e.g. `0.0.0.0:50051` or `127.0.0.1:0`
    pub async fn bind(addr: &str, options: ServerOptions) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to {addr}"))?;
        let workers = options.workers.max(1);

        tracing::info!(
            "Listening on {} ({} workers)",
            listener.local_addr().context("Failed to read local address")?,
            workers
        );

        let state = Arc::new(ServerState {
            dispatcher: Dispatcher::new(options.labels, options.parse_timeout),
            health: HealthReporter,
            permits: Arc::new(Semaphore::new(workers)),
        });
        Ok(Self { listener, state })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to read local address")
    }

    /// Run the accept loop until the task is dropped
    pub async fn run(&self) -> Result<()> {
        tracing::info!("Server ready, accepting connections");

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, state).await {
                            tracing::error!("Client handler error ({peer}): {e}");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                }
            }
        }
    }
}

async fn handle_client(stream: TcpStream, state: Arc<ServerState>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => handle_request(request, &state).await,
            Err(e) => Response::Error(format!("Invalid request: {e}")),
        };

        let response_json = serde_json::to_string(&response)?;
        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }

    Ok(())
}

async fn handle_request(request: Request, state: &Arc<ServerState>) -> Response {
    match request {
        Request::HealthCheck { service } => Response::Health(state.health.check(&service)),
        Request::ParsePdf { file_path } => {
            Response::Document(run_parse(state, DocumentFormat::Pdf, file_path).await)
        }
        Request::ParseDocx { file_path } => {
            Response::Document(run_parse(state, DocumentFormat::Docx, file_path).await)
        }
    }
}

/// Run one parse on a blocking worker once a permit is free
async fn run_parse(
    state: &Arc<ServerState>,
    format: DocumentFormat,
    file_path: String,
) -> ParseDocumentResponse {
    let permit = match Arc::clone(&state.permits).acquire_owned().await {
        Ok(permit) => permit,
        Err(e) => {
            return ParseDocumentResponse::failure(format!("{format} parse failed: {e}"));
        }
    };

    let worker_state = Arc::clone(state);
    let joined = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        worker_state.dispatcher.dispatch(format, &file_path)
    })
    .await;

    match joined {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(%format, "Parse worker failed: {e}");
            ParseDocumentResponse::failure(format!("{format} parse failed: worker error: {e}"))
        }
    }
}
