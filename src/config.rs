use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::models::Severity;

/// Configuration for the Vigil daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Input source configuration
    pub input: InputConfig,
    /// Detection configuration
    pub detection: DetectionConfig,
    /// Storage backend configuration
    pub storage: StorageConfig,
    /// Alert notification configuration
    pub alerting: AlertConfig,
    /// Output configuration
    pub output: OutputConfig,
}

/// Input source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Type of input source: "file" or "udp"
    pub source_type: String,
    /// Path to the auth log file (if source_type is "file")
    pub file_path: Option<PathBuf>,
    /// UDP bind address for JSON submissions (if source_type is "udp")
    pub udp_address: Option<String>,
}

/// Detection configuration
///
/// Severity thresholds are fixed semantics of the detection engine and are
/// deliberately not configurable here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Counting window in seconds. Absent means the full history is counted.
    pub count_window_secs: Option<u64>,
    /// Source prefixes classified as Internal; everything else is External.
    pub internal_prefixes: Vec<String>,
}

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend type: "sqlite" or "memory"
    pub backend: String,
    /// Database file path (if backend is "sqlite")
    pub db_path: Option<PathBuf>,
}

/// Alert notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Enable webhook notifications
    pub enabled: bool,
    /// Minimum severity to notify about
    pub min_severity: Severity,
    /// Slack notification config
    pub slack: Option<SlackConfig>,
    /// Generic webhook configs
    pub webhooks: Vec<WebhookConfig>,
}

/// Slack webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    pub webhook_url: String,
    pub channel: String,
    pub username: Option<String>,
}

/// Generic webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub name: String,
    pub url: String,
    /// HTTP method: "POST" (default) or "PUT"
    pub method: Option<String>,
    pub headers: Option<HashMap<String, String>>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format: "json", "jsonl", or "console"
    pub format: String,
    /// Output file path (if format is not "console")
    pub file_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input: InputConfig {
                source_type: "file".to_string(),
                file_path: Some(PathBuf::from("/var/log/auth.log")),
                udp_address: None,
            },
            detection: DetectionConfig {
                count_window_secs: None,
                internal_prefixes: vec![
                    "10.".to_string(),
                    "192.168.".to_string(),
                    "172.16.".to_string(),
                    "127.".to_string(),
                ],
            },
            storage: StorageConfig {
                backend: "sqlite".to_string(),
                db_path: Some(PathBuf::from("vigil.db")),
            },
            alerting: AlertConfig {
                enabled: false,
                min_severity: Severity::High,
                slack: None,
                webhooks: vec![],
            },
            output: OutputConfig {
                format: "jsonl".to_string(),
                file_path: Some(PathBuf::from("detections.jsonl")),
            },
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file(&self, path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_window_is_all_time() {
        let config = Config::default();
        assert!(config.detection.count_window_secs.is_none());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.storage.backend, "sqlite");
        assert_eq!(parsed.detection.internal_prefixes.len(), 4);
        assert_eq!(parsed.alerting.min_severity, Severity::High);
    }
}
