//! docparse-daemon: document parsing service
//!
//! This crate provides:
//! - A TCP server answering newline-delimited JSON parse requests
//! - Request dispatch with validation and fault isolation
//! - A synchronous client library
//! - Configuration loading

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod health;
pub mod protocol;
pub mod server;

pub use client::Client;
pub use dispatcher::Dispatcher;
pub use health::{HealthReporter, VERSION};
pub use protocol::{HealthCheckResponse, ParseDocumentResponse, Request, Response};
pub use server::{Server, ServerOptions};
