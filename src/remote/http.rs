use super::{IngestError, LogIngest, PutEventsOutcome, Result};
use crate::config::EndpointConfig;
use crate::event::LogEvent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// HTTP client for the log-ingestion service.
#[derive(Debug, Clone)]
pub struct HttpIngestClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpIngestClient {
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn events_url(&self, group_name: &str, stream_name: &str) -> String {
        format!(
            "{}/v1/groups/{}/streams/{}/events",
            self.base_url, group_name, stream_name
        )
    }

    fn stream_url(&self, group_name: &str, stream_name: &str) -> String {
        format!(
            "{}/v1/groups/{}/streams/{}",
            self.base_url, group_name, stream_name
        )
    }
}

#[async_trait]
impl LogIngest for HttpIngestClient {
    async fn put_events(
        &self,
        group_name: &str,
        stream_name: &str,
        sequence_token: Option<&str>,
        events: &[LogEvent],
    ) -> Result<PutEventsOutcome> {
        let url = self.events_url(group_name, stream_name);
        let request_body = PutEventsRequest {
            sequence_token,
            events,
        };

        let response = self.client.post(&url).json(&request_body).send().await?;
        let status = response.status();

        if status.is_success() {
            let body: PutEventsResponse = response.json().await?;
            return Ok(PutEventsOutcome::Accepted {
                next_sequence_token: body.next_sequence_token,
            });
        }

        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<RejectionBody>(&text) {
            Ok(rejection) => Ok(rejection.into_outcome()),
            Err(_) => Err(IngestError::Service {
                status: status.as_u16(),
                message: text,
            }),
        }
    }

    async fn create_stream(&self, group_name: &str, stream_name: &str) -> Result<()> {
        let url = self.stream_url(group_name, stream_name);
        let response = self.client.put(&url).send().await?;
        let status = response.status();

        // 409 means the stream already exists, which is fine: the caller
        // treats creation as idempotent.
        if status.is_success() || status.as_u16() == 409 {
            return Ok(());
        }

        Err(IngestError::Service {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        })
    }
}

// ===== Wire Types =====

#[derive(Debug, Serialize)]
struct PutEventsRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence_token: Option<&'a str>,
    events: &'a [LogEvent],
}

#[derive(Debug, Deserialize)]
struct PutEventsResponse {
    next_sequence_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RejectionBody {
    kind: RejectionKind,
    #[serde(default)]
    expected_sequence_token: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RejectionKind {
    InvalidToken,
    AlreadyAccepted,
    StreamNotFound,
    InvalidOrdering,
}

impl RejectionBody {
    fn into_outcome(self) -> PutEventsOutcome {
        match self.kind {
            RejectionKind::InvalidToken => PutEventsOutcome::InvalidToken {
                expected_sequence_token: self.expected_sequence_token,
            },
            RejectionKind::AlreadyAccepted => PutEventsOutcome::AlreadyAccepted {
                expected_sequence_token: self.expected_sequence_token,
            },
            RejectionKind::StreamNotFound => PutEventsOutcome::StreamNotFound,
            RejectionKind::InvalidOrdering => PutEventsOutcome::InvalidOrdering,
        }
    }
}
