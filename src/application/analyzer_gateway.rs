// Gateway trait for the analyzer's embedded web interface
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Bad driver path or navigation failure. Fatal to the connection
    /// attempt; retryable by reconnecting from scratch.
    #[error("setup failed: {0}")]
    Setup(String),
    /// The status element did not appear within the bounded wait.
    #[error("timed out after {0:?} waiting for the status element")]
    Timeout(std::time::Duration),
    /// The underlying session dropped. Fatal to the current session.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Scripted-browser access to the analyzer page. The poller only ever sees
/// this trait; tests substitute a fake returning canned status lines.
#[async_trait]
pub trait AnalyzerGateway: Send + Sync {
    /// Navigate to the measurement page and enter its named sub-frame. The
    /// operator is expected to have completed the manual login first.
    async fn open(&self) -> Result<(), GatewayError>;

    /// Trimmed text of the status element, waiting up to the configured
    /// bound for it to become present.
    async fn fetch_status_line(&self) -> Result<String, GatewayError>;

    /// Release the underlying session and its driver process. Idempotent.
    async fn release(&self);
}
