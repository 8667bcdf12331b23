use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single pending log record as stored on disk and shipped over the wire.
///
/// Events are ordered by `timestamp_millis`; multiple events may share a
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub message: String,
    pub timestamp_millis: i64,
}

impl LogEvent {
    pub fn new(message: impl Into<String>, timestamp_millis: i64) -> Self {
        Self {
            message: message.into(),
            timestamp_millis,
        }
    }

    /// Event stamped with the current wall-clock time.
    pub fn now(message: impl Into<String>) -> Self {
        Self::new(message, Utc::now().timestamp_millis())
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_round_trips_through_json() {
        let event = LogEvent::new("worker started", 1_700_000_000_000);
        let line = serde_json::to_string(&event).unwrap();
        let parsed: LogEvent = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_event_timestamp_conversion() {
        let event = LogEvent::new("x", 0);
        assert_eq!(event.timestamp().unwrap().timestamp_millis(), 0);
    }
}
