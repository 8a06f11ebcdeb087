//! SQLite implementation of the store traits

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use super::{AlertRegistry, EventStore, StoreError, UpsertOutcome};
use crate::models::{Alert, AlertDraft, AuthEvent, GeoClass, Investigation, LoginStatus, Severity};

/// SQLite-backed store
///
/// Events and alerts live in the two tables described in `schema.sql`,
/// giving the daemon durable history across restarts.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and initialize the schema.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        let store = SqliteStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory database (useful for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(())
    }

    /// Delete events older than `before_timestamp`. Operator maintenance
    /// hook; nothing in the detection path calls this.
    pub fn prune_events_before(&self, before_timestamp: i64) -> Result<usize, StoreError> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM events WHERE timestamp < ?",
            params![before_timestamp],
        )?;
        Ok(deleted)
    }

    fn parse_status(status: &str) -> Result<LoginStatus, StoreError> {
        status
            .parse()
            .map_err(|_| StoreError::InvalidData(format!("Invalid login status: {}", status)))
    }

    fn parse_geo(geo: &str) -> Result<GeoClass, StoreError> {
        geo.parse()
            .map_err(|_| StoreError::InvalidData(format!("Invalid geo class: {}", geo)))
    }

    fn parse_severity(severity: &str) -> Result<Severity, StoreError> {
        severity
            .parse()
            .map_err(|_| StoreError::InvalidData(format!("Invalid severity: {}", severity)))
    }

    fn event_from_row(row: RawEvent) -> Result<AuthEvent, StoreError> {
        Ok(AuthEvent {
            timestamp: row.timestamp,
            source: row.source,
            username: row.username,
            event_type: row.event_type,
            status: Self::parse_status(&row.status)?,
            geo: Self::parse_geo(&row.geo)?,
        })
    }

    fn alert_from_row(row: RawAlert) -> Result<Alert, StoreError> {
        Ok(Alert {
            source: row.source,
            severity: Self::parse_severity(&row.severity)?,
            risk_score: row.risk_score.clamp(0, 100) as u8,
            rule: row.rule,
            reason: row.reason,
            summary: row.summary,
            investigation: Investigation {
                geo: Self::parse_geo(&row.geo)?,
                reputation: row.reputation,
                blacklisted: row.blacklisted,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

struct RawEvent {
    timestamp: i64,
    source: String,
    username: String,
    event_type: String,
    status: String,
    geo: String,
}

struct RawAlert {
    source: String,
    severity: String,
    risk_score: i64,
    rule: String,
    reason: String,
    summary: String,
    geo: String,
    reputation: String,
    blacklisted: bool,
    created_at: i64,
    updated_at: i64,
}

const EVENT_COLUMNS: &str = "timestamp, source, username, event_type, status, geo";
const ALERT_COLUMNS: &str = "source, severity, risk_score, rule, reason, summary, \
                             geo, reputation, blacklisted, created_at, updated_at";

fn read_raw_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEvent> {
    Ok(RawEvent {
        timestamp: row.get(0)?,
        source: row.get(1)?,
        username: row.get(2)?,
        event_type: row.get(3)?,
        status: row.get(4)?,
        geo: row.get(5)?,
    })
}

fn read_raw_alert(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAlert> {
    Ok(RawAlert {
        source: row.get(0)?,
        severity: row.get(1)?,
        risk_score: row.get(2)?,
        rule: row.get(3)?,
        reason: row.get(4)?,
        summary: row.get(5)?,
        geo: row.get(6)?,
        reputation: row.get(7)?,
        blacklisted: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl EventStore for SqliteStore {
    fn append(&self, event: &AuthEvent) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO events (timestamp, source, username, event_type, status, geo)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                event.timestamp,
                event.source,
                event.username,
                event.event_type,
                event.status.as_str(),
                event.geo.as_str()
            ],
        )?;
        Ok(())
    }

    fn fail_count_for(&self, source: &str, since: Option<i64>) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = match since {
            Some(since) => conn.query_row(
                "SELECT COUNT(*) FROM events
                 WHERE source = ? AND status = 'failed' AND timestamp >= ?",
                params![source, since],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM events WHERE source = ? AND status = 'failed'",
                params![source],
                |row| row.get(0),
            )?,
        };
        Ok(count as u64)
    }

    fn has_success_after_failures(
        &self,
        source: &str,
        n: u64,
        since: Option<i64>,
    ) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let exists: bool = match since {
            Some(since) => conn.query_row(
                "SELECT EXISTS(
                     SELECT 1 FROM events s
                     WHERE s.source = ?1 AND s.status = 'success' AND s.timestamp >= ?3
                       AND (SELECT COUNT(*) FROM events f
                            WHERE f.source = ?1 AND f.status = 'failed'
                              AND f.timestamp >= ?3 AND f.id < s.id) >= ?2
                 )",
                params![source, n as i64, since],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT EXISTS(
                     SELECT 1 FROM events s
                     WHERE s.source = ?1 AND s.status = 'success'
                       AND (SELECT COUNT(*) FROM events f
                            WHERE f.source = ?1 AND f.status = 'failed'
                              AND f.id < s.id) >= ?2
                 )",
                params![source, n as i64],
                |row| row.get(0),
            )?,
        };
        Ok(exists)
    }

    fn events_for(&self, source: &str) -> Result<Vec<AuthEvent>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE source = ? ORDER BY id ASC"
        ))?;
        let rows = stmt
            .query_map(params![source], read_raw_event)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(Self::event_from_row).collect()
    }

    fn recent_events(&self, limit: usize) -> Result<Vec<AuthEvent>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY id DESC LIMIT ?"
        ))?;
        let rows = stmt
            .query_map(params![limit as i64], read_raw_event)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(Self::event_from_row).collect()
    }

    fn count_events(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl AlertRegistry for SqliteStore {
    fn upsert(&self, draft: &AlertDraft, now: i64) -> Result<UpsertOutcome, StoreError> {
        let conn = self.conn.lock().unwrap();

        // Two-step upsert so created_at survives updates. The pipeline's
        // per-source lock serializes writers for one source, so the check
        // cannot race with itself.
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM alerts WHERE source = ?",
                params![draft.source],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(_) => {
                conn.execute(
                    "UPDATE alerts
                     SET severity = ?, risk_score = ?, reason = ?, summary = ?,
                         geo = ?, reputation = ?, blacklisted = ?, updated_at = ?
                     WHERE source = ?",
                    params![
                        draft.severity.as_str(),
                        draft.risk_score,
                        draft.reason,
                        draft.summary,
                        draft.investigation.geo.as_str(),
                        draft.investigation.reputation,
                        draft.investigation.blacklisted,
                        now,
                        draft.source
                    ],
                )?;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                conn.execute(
                    &format!("INSERT INTO alerts ({ALERT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"),
                    params![
                        draft.source,
                        draft.severity.as_str(),
                        draft.risk_score,
                        crate::models::DETECTION_RULE,
                        draft.reason,
                        draft.summary,
                        draft.investigation.geo.as_str(),
                        draft.investigation.reputation,
                        draft.investigation.blacklisted,
                        now,
                        now
                    ],
                )?;
                Ok(UpsertOutcome::Created)
            }
        }
    }

    fn get_alert(&self, source: &str) -> Result<Option<Alert>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE source = ?"),
                params![source],
                read_raw_alert,
            )
            .optional()?;
        row.map(Self::alert_from_row).transpose()
    }

    fn list_alerts(&self) -> Result<Vec<Alert>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts ORDER BY updated_at DESC, id DESC"
        ))?;
        let rows = stmt
            .query_map([], read_raw_alert)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(Self::alert_from_row).collect()
    }

    fn count_alerts(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM alerts", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_alerts_at_least(&self, floor: Severity) -> Result<u64, StoreError> {
        let names: Vec<&str> = [
            Severity::Low,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ]
        .iter()
        .filter(|s| **s >= floor)
        .map(|s| s.as_str())
        .collect();

        let placeholders = vec!["?"; names.len()].join(", ");
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM alerts WHERE severity IN ({placeholders})"),
            params_from_iter(names),
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
