//! Model: CaptureConfig.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for one capture run of the log tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Shell used to run the script (`<shell> -c "exec <script>"`).
    pub shell: String,
    /// Completed transactions buffered between producer and consumer.
    pub channel_capacity: usize,
    /// How long to wait for the process to exit once its output closes.
    pub exit_grace_ms: u64,
    /// Cap on captured stderr text reported with a process failure.
    pub max_stderr_bytes: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            channel_capacity: 1,
            exit_grace_ms: 1000,
            max_stderr_bytes: 64 * 1024,
        }
    }
}

impl CaptureConfig {
    pub fn exit_grace(&self) -> Duration {
        Duration::from_millis(self.exit_grace_ms)
    }

    /// Validate capture configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.shell.trim().is_empty() {
            return Err("capture.shell must not be empty".to_string());
        }
        if self.channel_capacity == 0 {
            return Err("capture.channel_capacity must be > 0".to_string());
        }
        if self.exit_grace_ms == 0 {
            return Err("capture.exit_grace_ms must be > 0".to_string());
        }
        if self.max_stderr_bytes == 0 {
            return Err("capture.max_stderr_bytes must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Defaults ─────────────────────────────────────────────────

    #[test]
    fn test_capture_config_defaults() {
        let cfg = CaptureConfig::default();
        assert_eq!(cfg.shell, "sh");
        assert_eq!(cfg.channel_capacity, 1);
        assert_eq!(cfg.exit_grace(), Duration::from_secs(1));
        assert_eq!(cfg.max_stderr_bytes, 65536);
    }

    // ── Validation ───────────────────────────────────────────────

    #[test]
    fn test_validate_default_passes() {
        assert!(CaptureConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let cfg = CaptureConfig {
            channel_capacity: 0,
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("channel_capacity"), "Error should mention channel_capacity: {}", err);
    }

    #[test]
    fn test_validate_rejects_blank_shell() {
        let cfg = CaptureConfig {
            shell: "  ".to_string(),
            ..Default::default()
        };
        assert!(cfg.validate().unwrap_err().contains("shell"));
    }

    #[test]
    fn test_validate_rejects_zero_grace_and_stderr_cap() {
        let cfg = CaptureConfig {
            exit_grace_ms: 0,
            ..Default::default()
        };
        assert!(cfg.validate().unwrap_err().contains("exit_grace_ms"));

        let cfg = CaptureConfig {
            max_stderr_bytes: 0,
            ..Default::default()
        };
        assert!(cfg.validate().unwrap_err().contains("max_stderr_bytes"));
    }

    // ── Serialization Round-trip ─────────────────────────────────

    #[test]
    fn test_capture_config_toml_round_trip() {
        let cfg = CaptureConfig::default();
        let toml_str = toml::to_string(&cfg).expect("Should serialize to TOML");
        let deserialized: CaptureConfig = toml::from_str(&toml_str).expect("Should deserialize from TOML");
        assert_eq!(deserialized, cfg);
    }

    #[test]
    fn test_capture_config_deserialize_partial_toml() {
        let toml_str = r#"shell = "bash""#;
        let cfg: CaptureConfig = toml::from_str(toml_str).expect("Should accept partial TOML");
        assert_eq!(cfg.shell, "bash");
        assert_eq!(cfg.channel_capacity, 1);
        assert_eq!(cfg.exit_grace_ms, 1000);
    }
}
