//! Liveness reporting.
//!
//! Health means the process is up and answering requests. No trial parse is
//! run; parser health is checked externally by parsing a known fixture.

use crate::protocol::HealthCheckResponse;

/// Service version reported to health checks
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const HEALTHY_MESSAGE: &str = "document parser service is running";

#[derive(Debug, Default, Clone, Copy)]
pub struct HealthReporter;

impl HealthReporter {
    pub fn check(&self, service: &str) -> HealthCheckResponse {
        tracing::debug!(service, "Health check");
        HealthCheckResponse {
            healthy: true,
            message: HEALTHY_MESSAGE.to_string(),
            version: VERSION.to_string(),
        }
    }
}
