use logship::config::{load_config, ConfigError, OverflowStrategy};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_full_config_round_trip() {
    let file = write_config(
        r#"
endpoint:
  url: https://ingest.example.com
  request_timeout: 45s

destination:
  group_name: payments_group
  stream_name: payments_stream

storage:
  dir: /var/lib/logship

pipeline:
  queue_capacity: 2048
  overflow: drop

device:
  model: pixel-9
  manufacturer: google
  os_version: "15"
"#,
    );

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.endpoint.url, "https://ingest.example.com");
    assert_eq!(config.endpoint.request_timeout, Duration::from_secs(45));
    assert_eq!(config.destination.group_name, "payments_group");
    assert_eq!(config.destination.stream_name, "payments_stream");
    assert_eq!(config.storage.dir.to_str().unwrap(), "/var/lib/logship");
    assert_eq!(config.pipeline.queue_capacity, 2048);
    assert_eq!(config.pipeline.overflow, OverflowStrategy::Drop);
    assert_eq!(config.device.model, "pixel-9");
    assert_eq!(config.device.manufacturer, "google");
    assert_eq!(config.device.os_version, "15");
}

#[test]
fn test_minimal_config_uses_defaults() {
    let file = write_config("endpoint:\n  url: https://ingest.example.com\n");

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.endpoint.request_timeout, Duration::from_secs(30));
    assert_eq!(config.destination.group_name, "default_log_group");
    assert_eq!(config.destination.stream_name, "default_log_stream");
    assert_eq!(config.pipeline.queue_capacity, 10000);
    assert_eq!(config.pipeline.overflow, OverflowStrategy::Block);
    assert!(config.device.model.is_empty());
}

#[test]
fn test_validation_collects_every_failure() {
    let file = write_config(
        r#"
destination:
  group_name: ""
  stream_name: ""

pipeline:
  queue_capacity: 0
"#,
    );

    let err = load_config(file.path()).unwrap_err();
    match err {
        ConfigError::ValidationList(errors) => {
            assert_eq!(errors.len(), 4);
            assert!(errors.iter().any(|e| e.contains("endpoint.url")));
            assert!(errors.iter().any(|e| e.contains("group_name")));
            assert!(errors.iter().any(|e| e.contains("stream_name")));
            assert!(errors.iter().any(|e| e.contains("queue_capacity")));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_missing_file_is_an_io_error() {
    let err = load_config(std::path::Path::new("/nonexistent/logship.yml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}
