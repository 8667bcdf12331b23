use crate::config::DeviceConfig;
use crate::event::LogEvent;
use chrono::Local;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Static device identity fields included in every formatted record.
/// Fields a generic host cannot report stay empty rather than guessed.
#[derive(Debug, Clone, Default)]
pub struct DeviceMetadata {
    pub model: String,
    pub manufacturer: String,
    pub os_version: String,
    pub device_id: String,
}

impl DeviceMetadata {
    /// Detect what the platform exposes, letting config overrides win.
    pub fn detect(overrides: &DeviceConfig) -> Self {
        let device_id = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_default();

        let model = if overrides.model.is_empty() {
            std::env::consts::ARCH.to_string()
        } else {
            overrides.model.clone()
        };

        let os_version = if overrides.os_version.is_empty() {
            std::env::consts::OS.to_string()
        } else {
            overrides.os_version.clone()
        };

        Self {
            model,
            manufacturer: overrides.manufacturer.clone(),
            os_version,
            device_id,
        }
    }

    fn render(&self, app_version: &str) -> String {
        [
            self.model.as_str(),
            self.manufacturer.as_str(),
            self.os_version.as_str(),
            self.device_id.as_str(),
            app_version,
        ]
        .join("|")
    }
}

/// Builds one storable record from a raw message and optional context
/// fields. Pure and synchronous; the only ambient inputs are the clock and
/// the pre-detected device identity.
pub struct RecordFormatter {
    device: DeviceMetadata,
}

impl RecordFormatter {
    pub fn new(device: DeviceMetadata) -> Self {
        Self { device }
    }

    /// Message layout, pipe-separated in this fixed order:
    /// label? | device block | phase? | module? | local datetime | message
    pub fn format(
        &self,
        message: &str,
        label: Option<&str>,
        phase: Option<&str>,
        module: Option<&str>,
        app_version: &str,
    ) -> LogEvent {
        let now = Local::now();
        let mut parts: Vec<String> = Vec::new();

        if let Some(label) = label {
            parts.push(label.to_string());
        }
        parts.push(self.device.render(app_version));
        if let Some(phase) = phase {
            parts.push(phase.to_string());
        }
        if let Some(module) = module {
            parts.push(module.to_string());
        }
        parts.push(now.format(TIMESTAMP_FORMAT).to_string());
        parts.push(message.to_string());

        LogEvent::new(parts.join("|"), now.timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_device() -> DeviceMetadata {
        DeviceMetadata {
            model: "x86_64".to_string(),
            manufacturer: "acme".to_string(),
            os_version: "linux".to_string(),
            device_id: "host-7".to_string(),
        }
    }

    #[test]
    fn test_format_with_all_fields() {
        let formatter = RecordFormatter::new(test_device());
        let event = formatter.format("it broke", Some("ERROR"), Some("startup"), Some("net"), "1.2.3");

        let parts: Vec<&str> = event.message.split('|').collect();
        assert_eq!(
            &parts[..8],
            &["ERROR", "x86_64", "acme", "linux", "host-7", "1.2.3", "startup", "net"]
        );
        // Local datetime, then the raw message last.
        assert_eq!(parts.len(), 10);
        assert_eq!(parts[9], "it broke");
        assert_eq!(parts[8].len(), "2026-08-07 12:00:00".len());
    }

    #[test]
    fn test_format_without_optional_fields() {
        let formatter = RecordFormatter::new(test_device());
        let event = formatter.format("plain", None, None, None, "");

        let parts: Vec<&str> = event.message.split('|').collect();
        // device block (5 fields, empty app version) + datetime + message
        assert_eq!(parts.len(), 7);
        assert_eq!(parts[0], "x86_64");
        assert_eq!(parts[4], "");
        assert_eq!(parts[6], "plain");
    }

    #[test]
    fn test_format_stamps_current_time() {
        let formatter = RecordFormatter::new(test_device());
        let before = chrono::Utc::now().timestamp_millis();
        let event = formatter.format("x", None, None, None, "");
        let after = chrono::Utc::now().timestamp_millis();

        assert!(event.timestamp_millis >= before);
        assert!(event.timestamp_millis <= after);
    }

    #[test]
    fn test_unavailable_fields_render_empty() {
        let formatter = RecordFormatter::new(DeviceMetadata::default());
        let event = formatter.format("m", None, None, None, "");

        let parts: Vec<&str> = event.message.split('|').collect();
        assert_eq!(parts.len(), 7);
        for field in &parts[..5] {
            assert!(field.is_empty());
        }
    }
}
