pub mod http;

pub use http::HttpIngestClient;

use crate::event::LogEvent;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ingestion service returned error status {status}: {message}")]
    Service { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, IngestError>;

/// Everything a put-events call can come back with short of a transport or
/// unclassified service failure (those stay on the `Err` side).
///
/// The service enforces exactly-once-in-order submission through the
/// sequence token and reports divergence instead of silently accepting it,
/// so each rejection kind carries its own recovery obligation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutEventsOutcome {
    /// Events landed; the returned token must accompany the next call.
    Accepted { next_sequence_token: Option<String> },
    /// The submitted token is stale; the server says which one it expects.
    InvalidToken { expected_sequence_token: Option<String> },
    /// This exact batch was already ingested; do not resend.
    AlreadyAccepted { expected_sequence_token: Option<String> },
    /// The destination stream does not exist (yet).
    StreamNotFound,
    /// The batch violates the server's timestamp ordering rules.
    InvalidOrdering,
}

/// The remote ingestion API. Implemented by the bundled HTTP client and by
/// in-process doubles in tests.
#[async_trait]
pub trait LogIngest: Send + Sync {
    async fn put_events(
        &self,
        group_name: &str,
        stream_name: &str,
        sequence_token: Option<&str>,
        events: &[LogEvent],
    ) -> Result<PutEventsOutcome>;

    async fn create_stream(&self, group_name: &str, stream_name: &str) -> Result<()>;
}
