//! Operator-facing output
//!
//! Renders recent events, current alerts, and dashboard metrics, and
//! appends detection notifications to a log sink. Anonymization lives here
//! as a presentation transform; stored data is never masked.

use std::collections::hash_map::DefaultHasher;
use std::fs::OpenOptions;
use std::hash::{Hash, Hasher};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::models::{Alert, AlertNotification, AuthEvent, Metrics};

/// Errors that can occur while writing or rendering output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub enum OutputFormat {
    Json,
    Jsonl,
    Console,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "jsonl" => OutputFormat::Jsonl,
            "console" => OutputFormat::Console,
            _ => OutputFormat::Jsonl, // Default
        }
    }
}

fn format_time(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

/// Display row for one event. All fields are plain strings so the
/// anonymized variant can carry masked values.
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub time: String,
    pub source: String,
    pub username: String,
    pub event: String,
    pub status: String,
    pub geo: String,
}

impl EventView {
    pub fn plain(event: &AuthEvent) -> Self {
        EventView {
            time: format_time(event.timestamp),
            source: event.source.clone(),
            username: event.username.clone(),
            event: event.event_type.clone(),
            status: event.status.as_str().to_string(),
            geo: event.geo.as_str().to_string(),
        }
    }

    /// Masked variant. The username suffix is hash-derived rather than
    /// random so repeated renders of the same history are identical.
    pub fn anonymized(event: &AuthEvent) -> Self {
        let mut hasher = DefaultHasher::new();
        event.username.hash(&mut hasher);
        EventView {
            time: format_time(event.timestamp),
            source: "192.168.x.x".to_string(),
            username: format!("user_{:03}", hasher.finish() % 1000),
            event: event.event_type.clone(),
            status: event.status.as_str().to_string(),
            geo: "Hidden".to_string(),
        }
    }
}

/// Render events most-recent-first in the requested format.
pub fn render_events(
    events: &[AuthEvent],
    format: &OutputFormat,
    anonymize: bool,
) -> Result<String, OutputError> {
    let views: Vec<EventView> = events
        .iter()
        .map(|e| {
            if anonymize {
                EventView::anonymized(e)
            } else {
                EventView::plain(e)
            }
        })
        .collect();

    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&views)?),
        OutputFormat::Jsonl => {
            let mut out = String::new();
            for view in &views {
                out.push_str(&serde_json::to_string(view)?);
                out.push('\n');
            }
            Ok(out)
        }
        OutputFormat::Console => {
            let mut out = String::new();
            for view in &views {
                out.push_str(&format!(
                    "{} | {} | {} | {} | {} | {}\n",
                    view.time, view.source, view.username, view.event, view.status, view.geo
                ));
            }
            Ok(out)
        }
    }
}

/// Render alerts most-recently-updated-first in the requested format.
pub fn render_alerts(alerts: &[Alert], format: &OutputFormat) -> Result<String, OutputError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(alerts)?),
        OutputFormat::Jsonl => {
            let mut out = String::new();
            for alert in alerts {
                out.push_str(&serde_json::to_string(alert)?);
                out.push('\n');
            }
            Ok(out)
        }
        OutputFormat::Console => {
            let mut out = String::new();
            for alert in alerts {
                out.push_str(&format!(
                    "[{}] {} | risk {} | {} | updated {}\n",
                    alert.severity,
                    alert.source,
                    alert.risk_score,
                    alert.summary,
                    format_time(alert.updated_at)
                ));
            }
            Ok(out)
        }
    }
}

pub fn render_metrics(metrics: &Metrics, format: &OutputFormat) -> Result<String, OutputError> {
    match format {
        OutputFormat::Console => Ok(format!(
            "events: {} | alerts: {} | critical: {}\n",
            metrics.total_events, metrics.total_alerts, metrics.critical_alerts
        )),
        _ => Ok(format!("{}\n", serde_json::to_string(metrics)?)),
    }
}

/// Sink for detection notifications (the daemon's local audit trail)
pub struct OutputHandler {
    format: OutputFormat,
    writer: Option<Box<dyn Write + Send>>,
}

impl OutputHandler {
    /// Create a new output handler
    pub fn new(format: OutputFormat, file_path: Option<PathBuf>) -> Result<Self, OutputError> {
        let writer: Option<Box<dyn Write + Send>> = match (&format, file_path) {
            (OutputFormat::Console, _) => None,
            (_, Some(path)) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Some(Box::new(BufWriter::new(file)))
            }
            (_, None) => None,
        };

        Ok(OutputHandler { format, writer })
    }

    /// Write one detection notification
    pub fn write_notification(
        &mut self,
        notification: &AlertNotification,
    ) -> Result<(), OutputError> {
        match &self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(notification)?;
                self.write_output(&format!("{}\n", json))
            }
            OutputFormat::Jsonl => {
                let json = serde_json::to_string(notification)?;
                self.write_output(&format!("{}\n", json))
            }
            OutputFormat::Console => {
                let line = format!(
                    "[{}] {} | risk {} | {}\n",
                    notification.severity,
                    notification.source,
                    notification.risk_score,
                    notification.summary
                );
                self.write_output(&line)
            }
        }
    }

    fn write_output(&mut self, data: &str) -> Result<(), OutputError> {
        match &mut self.writer {
            Some(writer) => {
                writer.write_all(data.as_bytes())?;
                writer.flush()?;
            }
            None => {
                print!("{}", data);
                std::io::stdout().flush()?;
            }
        }
        Ok(())
    }

    /// Flush any buffered output
    pub fn flush(&mut self) -> Result<(), OutputError> {
        if let Some(writer) = &mut self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}
