use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::storage::token_store::{DEFAULT_GROUP_NAME, DEFAULT_STREAM_NAME};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipperConfig {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub destination: DestinationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub device: DeviceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URL of the ingestion service, e.g. "https://ingest.example.com".
    /// May be left empty when the caller supplies its own client.
    #[serde(default)]
    pub url: String,

    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            request_timeout: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    #[serde(default = "default_group_name")]
    pub group_name: String,
    #[serde(default = "default_stream_name")]
    pub stream_name: String,
}

fn default_group_name() -> String {
    DEFAULT_GROUP_NAME.to_string()
}

fn default_stream_name() -> String {
    DEFAULT_STREAM_NAME.to_string()
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            group_name: default_group_name(),
            stream_name: default_stream_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the pending-event log and uploader state files.
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
}

fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("logship")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_overflow")]
    pub overflow: OverflowStrategy,
}

fn default_queue_capacity() -> usize {
    10000
}

fn default_overflow() -> OverflowStrategy {
    OverflowStrategy::Block
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            overflow: default_overflow(),
        }
    }
}

/// What `log()` does when the append queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowStrategy {
    /// Surface a QueueFull error to the caller; no event is lost silently.
    Block,
    /// Discard the event with a warning.
    Drop,
}

/// Overrides for device metadata fields that cannot be detected on a
/// generic host. Empty fields stay empty in the formatted record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub os_version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_documented_destination() {
        let config = ShipperConfig::default();
        assert_eq!(config.destination.group_name, "default_log_group");
        assert_eq!(config.destination.stream_name, "default_log_stream");
    }

    #[test]
    fn test_default_pipeline_limits() {
        let config = ShipperConfig::default();
        assert_eq!(config.pipeline.queue_capacity, 10000);
        assert_eq!(config.pipeline.overflow, OverflowStrategy::Block);
    }

    #[test]
    fn test_request_timeout_parses_humantime() {
        let yaml = "url: https://ingest.example.com\nrequest_timeout: 5s\n";
        let endpoint: EndpointConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(endpoint.request_timeout, Duration::from_secs(5));
    }
}
