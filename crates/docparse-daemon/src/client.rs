//! Client library for the parsing service
//!
//! A synchronous TCP client. Paths are made absolute before they are sent,
//! since the server resolves them against its own working directory.

use crate::protocol::{HealthCheckResponse, ParseDocumentResponse, Request, Response};
use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default timeout for client requests (30 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub struct Client {
    addr: String,
    timeout: Duration,
}

impl Client {
    /// Create a client for a server at `addr`, e.g. `localhost:50051`
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Set the connect, read and write timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check if the server answers a health check
    pub fn is_server_running(&self) -> bool {
        self.health_check("").is_ok_and(|h| h.healthy)
    }

    fn send_request(&self, request: &Request) -> Result<Response> {
        let addr = self
            .addr
            .to_socket_addrs()
            .with_context(|| format!("Invalid server address: {}", self.addr))?
            .next()
            .with_context(|| format!("No address resolved for {}", self.addr))?;

        let mut stream = TcpStream::connect_timeout(&addr, self.timeout)
            .with_context(|| format!("Failed to connect to server at {addr}"))?;
        stream
            .set_read_timeout(Some(self.timeout))
            .context("Failed to set read timeout")?;
        stream
            .set_write_timeout(Some(self.timeout))
            .context("Failed to set write timeout")?;

        let request_json = serde_json::to_string(request)?;
        stream.write_all(request_json.as_bytes())?;
        stream.write_all(b"\n")?;
        stream.flush()?;

        let mut reader = BufReader::new(stream);
        let mut response_line = String::new();
        reader.read_line(&mut response_line)?;

        let response: Response =
            serde_json::from_str(&response_line).context("Failed to parse server response")?;
        Ok(response)
    }

    pub fn parse_pdf(&self, path: &Path) -> Result<ParseDocumentResponse> {
        let request = Request::ParsePdf {
            file_path: wire_path(path)?,
        };
        self.parse(&request)
    }

    pub fn parse_docx(&self, path: &Path) -> Result<ParseDocumentResponse> {
        let request = Request::ParseDocx {
            file_path: wire_path(path)?,
        };
        self.parse(&request)
    }

    fn parse(&self, request: &Request) -> Result<ParseDocumentResponse> {
        match self.send_request(request)? {
            Response::Document(doc) => Ok(doc),
            Response::Error(e) => anyhow::bail!("Server error: {e}"),
            _ => anyhow::bail!("Unexpected response from server"),
        }
    }

    pub fn health_check(&self, service: &str) -> Result<HealthCheckResponse> {
        let request = Request::HealthCheck {
            service: service.to_string(),
        };
        match self.send_request(&request)? {
            Response::Health(health) => Ok(health),
            Response::Error(e) => anyhow::bail!("Server error: {e}"),
            _ => anyhow::bail!("Unexpected response from server"),
        }
    }
}

/// Absolute form of `path`. An empty path stays empty so the server rejects it.
fn wire_path(path: &Path) -> Result<String> {
    if path.as_os_str().is_empty() {
        return Ok(String::new());
    }
    let absolute: PathBuf = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("Failed to read current directory")?
            .join(path)
    };
    Ok(absolute.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = Client::new("localhost:50051");
        assert_eq!(client.addr, "localhost:50051");
        assert_eq!(client.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_client_with_timeout() {
        let client = Client::new("localhost:50051").with_timeout(Duration::from_secs(5));
        assert_eq!(client.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_wire_path() {
        assert_eq!(wire_path(Path::new("")).unwrap(), "");
        assert_eq!(wire_path(Path::new("/data/a.pdf")).unwrap(), "/data/a.pdf");

        let relative = wire_path(Path::new("docs/a.pdf")).unwrap();
        assert!(Path::new(&relative).is_absolute());
        assert!(relative.ends_with("docs/a.pdf"));
    }

    #[test]
    fn test_unreachable_server() {
        // port 9 (discard) is almost never served locally
        let client = Client::new("127.0.0.1:9").with_timeout(Duration::from_millis(200));
        assert!(!client.is_server_running());
    }
}
