//! Ingestion pipeline
//!
//! The single externally-callable write path: validate, classify, append to
//! the event history, then drive detection synchronously before
//! acknowledging. No other path mutates the event history or the alert
//! registry.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use thiserror::Error;

use crate::config::DetectionConfig;
use crate::detection::{Detection, DetectionEngine};
use crate::models::{Alert, AuthEvent, GeoClass, LoginStatus, Metrics, Severity};
use crate::store::{DetectionStore, StoreError};

/// Source used by the canned attack simulation.
pub const SIMULATION_SOURCE: &str = "45.33.22.11";

/// Submission rejected before any state mutation.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("username must not be empty")]
    MissingUsername,

    #[error("source identity must not be empty")]
    MissingSource,

    #[error("unrecognized login status: {0:?}")]
    UnknownStatus(String),
}

/// Submission failure taxonomy.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("invalid submission: {0}")]
    Validation(#[from] ValidationError),

    /// The event append itself failed; nothing was recorded.
    #[error("event append failed: {0}")]
    Storage(StoreError),

    /// The event was recorded but the detection step failed. The evidence is
    /// retained and the caller may retry detection by resubmitting reads.
    #[error("detection failed after append: {0}")]
    Detection(StoreError),
}

/// Acknowledgment for an accepted submission.
#[derive(Debug, Clone)]
pub struct Ack {
    pub event: AuthEvent,
    /// Present when the source's state qualified for alerting.
    pub detection: Option<Detection>,
}

const LOCK_SHARDS: usize = 64;

pub struct IngestionPipeline {
    store: Arc<dyn DetectionStore>,
    engine: DetectionEngine,
    detection: DetectionConfig,
    /// Per-source mutual exclusion: submissions for one source serialize on
    /// the shard its key hashes to, so fail counting and the alert upsert
    /// are observed as one unit. Distinct sources proceed in parallel.
    shards: Vec<Mutex<()>>,
}

impl IngestionPipeline {
    pub fn new(store: Arc<dyn DetectionStore>, detection: DetectionConfig) -> Self {
        IngestionPipeline {
            engine: DetectionEngine::new(store.clone()),
            store,
            detection,
            shards: (0..LOCK_SHARDS).map(|_| Mutex::new(())).collect(),
        }
    }

    fn shard_for(&self, source: &str) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % LOCK_SHARDS]
    }

    /// Classify a source against the configured private-prefix set.
    pub fn classify_geo(&self, source: &str) -> GeoClass {
        if self
            .detection
            .internal_prefixes
            .iter()
            .any(|prefix| source.starts_with(prefix.as_str()))
        {
            GeoClass::Internal
        } else {
            GeoClass::External
        }
    }

    fn validate(
        username: &str,
        source: &str,
        status: &str,
    ) -> Result<LoginStatus, ValidationError> {
        if username.trim().is_empty() {
            return Err(ValidationError::MissingUsername);
        }
        if source.trim().is_empty() {
            return Err(ValidationError::MissingSource);
        }
        status
            .parse()
            .map_err(|_| ValidationError::UnknownStatus(status.to_string()))
    }

    /// Submit one authentication event with the current time.
    pub fn submit(&self, username: &str, source: &str, status: &str) -> Result<Ack, SubmitError> {
        self.submit_at(username, source, status, Utc::now().timestamp())
    }

    /// Clock-injected variant of `submit`, used by tests and replays.
    pub fn submit_at(
        &self,
        username: &str,
        source: &str,
        status: &str,
        now: i64,
    ) -> Result<Ack, SubmitError> {
        let status = Self::validate(username, source, status)?;
        let geo = self.classify_geo(source);
        let event = AuthEvent::new(now, source.to_string(), username.to_string(), status, geo);
        let window_start = self
            .detection
            .count_window_secs
            .map(|window| now - window as i64);

        // Append and detection form one atomic unit for this source.
        let _guard = self.shard_for(source).lock().unwrap();
        self.store.append(&event).map_err(SubmitError::Storage)?;
        let detection = self
            .engine
            .evaluate(source, geo, window_start, now)
            .map_err(SubmitError::Detection)?;

        Ok(Ack { event, detection })
    }

    /// Most-recent-first events across all sources, for the operator view.
    pub fn recent_events(&self, limit: usize) -> Result<Vec<AuthEvent>, StoreError> {
        self.store.recent_events(limit)
    }

    /// Current alerts, most-recently-updated-first.
    pub fn list_alerts(&self) -> Result<Vec<Alert>, StoreError> {
        self.store.list_alerts()
    }

    /// The ordered event history an alert references as its timeline.
    pub fn timeline_for(&self, source: &str) -> Result<Vec<AuthEvent>, StoreError> {
        self.store.events_for(source)
    }

    pub fn metrics(&self) -> Result<Metrics, StoreError> {
        Ok(Metrics {
            total_events: self.store.count_events()?,
            total_alerts: self.store.count_alerts()?,
            critical_alerts: self.store.count_alerts_at_least(Severity::Critical)?,
        })
    }
}

/// Replay the canned attack fixture through the pipeline: five failures then
/// a success for one external source.
pub fn run_simulation(pipeline: &IngestionPipeline) -> Result<Vec<Ack>, SubmitError> {
    let mut acks = Vec::with_capacity(6);
    for _ in 0..5 {
        acks.push(pipeline.submit("admin", SIMULATION_SOURCE, "failed")?);
    }
    acks.push(pipeline.submit("admin", SIMULATION_SOURCE, "success")?);
    Ok(acks)
}
