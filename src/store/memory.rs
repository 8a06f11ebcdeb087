//! In-memory implementation of the store traits
//!
//! Keeps everything in process memory behind a single mutex. Used by unit
//! tests and by deployments that do not need history to survive restarts.

use std::sync::Mutex;

use super::{AlertRegistry, EventStore, StoreError, UpsertOutcome};
use crate::models::{Alert, AlertDraft, AuthEvent, Severity, DETECTION_RULE};

struct AlertRecord {
    alert: Alert,
    /// Monotonic upsert sequence; orders `list_alerts` without relying on
    /// wall-clock ties.
    touched: u64,
}

#[derive(Default)]
struct Inner {
    events: Vec<AuthEvent>,
    alerts: Vec<AlertRecord>,
    touch_seq: u64,
}

/// In-memory store. Cheap to construct, nothing survives drop.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl EventStore for MemoryStore {
    fn append(&self, event: &AuthEvent) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.events.push(event.clone());
        Ok(())
    }

    fn fail_count_for(&self, source: &str, since: Option<i64>) -> Result<u64, StoreError> {
        let inner = self.inner.lock().unwrap();
        let count = inner
            .events
            .iter()
            .filter(|e| e.source == source)
            .filter(|e| since.map_or(true, |s| e.timestamp >= s))
            .filter(|e| e.status == crate::models::LoginStatus::Failed)
            .count();
        Ok(count as u64)
    }

    fn has_success_after_failures(
        &self,
        source: &str,
        n: u64,
        since: Option<i64>,
    ) -> Result<bool, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut failures_seen = 0u64;
        for event in inner
            .events
            .iter()
            .filter(|e| e.source == source)
            .filter(|e| since.map_or(true, |s| e.timestamp >= s))
        {
            match event.status {
                crate::models::LoginStatus::Failed => failures_seen += 1,
                crate::models::LoginStatus::Success => {
                    if failures_seen >= n {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }

    fn events_for(&self, source: &str) -> Result<Vec<AuthEvent>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .events
            .iter()
            .filter(|e| e.source == source)
            .cloned()
            .collect())
    }

    fn recent_events(&self, limit: usize) -> Result<Vec<AuthEvent>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.events.iter().rev().take(limit).cloned().collect())
    }

    fn count_events(&self) -> Result<u64, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.events.len() as u64)
    }
}

impl AlertRegistry for MemoryStore {
    fn upsert(&self, draft: &AlertDraft, now: i64) -> Result<UpsertOutcome, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.touch_seq += 1;
        let seq = inner.touch_seq;

        if let Some(record) = inner.alerts.iter_mut().find(|r| r.alert.source == draft.source) {
            record.alert.severity = draft.severity;
            record.alert.risk_score = draft.risk_score;
            record.alert.reason = draft.reason.clone();
            record.alert.summary = draft.summary.clone();
            record.alert.investigation = draft.investigation.clone();
            record.alert.updated_at = now;
            record.touched = seq;
            return Ok(UpsertOutcome::Updated);
        }

        inner.alerts.push(AlertRecord {
            alert: Alert {
                source: draft.source.clone(),
                severity: draft.severity,
                risk_score: draft.risk_score,
                rule: DETECTION_RULE.to_string(),
                reason: draft.reason.clone(),
                summary: draft.summary.clone(),
                investigation: draft.investigation.clone(),
                created_at: now,
                updated_at: now,
            },
            touched: seq,
        });
        Ok(UpsertOutcome::Created)
    }

    fn get_alert(&self, source: &str) -> Result<Option<Alert>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .alerts
            .iter()
            .find(|r| r.alert.source == source)
            .map(|r| r.alert.clone()))
    }

    fn list_alerts(&self) -> Result<Vec<Alert>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut records: Vec<_> = inner
            .alerts
            .iter()
            .map(|r| (r.touched, r.alert.clone()))
            .collect();
        records.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(records.into_iter().map(|(_, alert)| alert).collect())
    }

    fn count_alerts(&self) -> Result<u64, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.alerts.len() as u64)
    }

    fn count_alerts_at_least(&self, floor: Severity) -> Result<u64, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .alerts
            .iter()
            .filter(|r| r.alert.severity >= floor)
            .count() as u64)
    }
}
