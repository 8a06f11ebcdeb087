//! Storage backends for event history and the alert registry.
//!
//! The detection logic only ever sees these traits, so the in-memory and
//! SQLite backends are interchangeable behind one contract.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::models::{Alert, AlertDraft, AuthEvent, Severity};
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data in store: {0}")]
    InvalidData(String),
}

/// Result of an alert upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Ordered, append-only history of authentication events, queryable by
/// source identity.
pub trait EventStore: Send + Sync {
    /// Record an event. O(1) amortized; fails only on backend errors.
    fn append(&self, event: &AuthEvent) -> Result<(), StoreError>;

    /// Count of failed events for the source. `since` restricts counting to
    /// events with `timestamp >= since`; `None` counts the full history.
    fn fail_count_for(&self, source: &str, since: Option<i64>) -> Result<u64, StoreError>;

    /// True iff some success event for the source is preceded in arrival
    /// order by at least `n` failed events (not necessarily contiguously).
    fn has_success_after_failures(
        &self,
        source: &str,
        n: u64,
        since: Option<i64>,
    ) -> Result<bool, StoreError>;

    /// The source's complete history in arrival order. This is the alert
    /// timeline; alerts reference it by source key rather than copying it.
    fn events_for(&self, source: &str) -> Result<Vec<AuthEvent>, StoreError>;

    /// Most-recent-first across all sources, for the operator view.
    fn recent_events(&self, limit: usize) -> Result<Vec<AuthEvent>, StoreError>;

    fn count_events(&self) -> Result<u64, StoreError>;
}

/// Keyed registry holding at most one alert per source identity.
pub trait AlertRegistry: Send + Sync {
    /// Create the alert with `created_at = now` if none exists for the
    /// draft's source, otherwise update severity, risk score, reason,
    /// summary, investigation and `updated_at` in place. The source key and
    /// `created_at` never change after creation.
    fn upsert(&self, draft: &AlertDraft, now: i64) -> Result<UpsertOutcome, StoreError>;

    fn get_alert(&self, source: &str) -> Result<Option<Alert>, StoreError>;

    /// Most-recently-updated-first, for the operator view.
    fn list_alerts(&self) -> Result<Vec<Alert>, StoreError>;

    fn count_alerts(&self) -> Result<u64, StoreError>;

    /// Alerts with severity at or above `floor`.
    fn count_alerts_at_least(&self, floor: Severity) -> Result<u64, StoreError>;
}

/// Combined handle the ingestion pipeline and detection engine operate on.
pub trait DetectionStore: EventStore + AlertRegistry {}

impl<T: EventStore + AlertRegistry> DetectionStore for T {}
