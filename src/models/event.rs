use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// All events ingested by the pipeline carry this type tag.
pub const EVENT_TYPE_AUTH: &str = "AUTH";

/// Outcome of an authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginStatus {
    Success,
    Failed,
}

impl LoginStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginStatus::Success => "success",
            LoginStatus::Failed => "failed",
        }
    }
}

impl FromStr for LoginStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(LoginStatus::Success),
            "failed" => Ok(LoginStatus::Failed),
            _ => Err(()),
        }
    }
}

impl fmt::Display for LoginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse origin classification derived from the configured private-prefix set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeoClass {
    Internal,
    External,
}

impl GeoClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeoClass::Internal => "Internal",
            GeoClass::External => "External",
        }
    }
}

impl FromStr for GeoClass {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Internal" => Ok(GeoClass::Internal),
            "External" => Ok(GeoClass::External),
            _ => Err(()),
        }
    }
}

impl fmt::Display for GeoClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable authentication event. Created once by the ingestion pipeline,
/// never mutated or deleted afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEvent {
    /// Unix seconds at ingestion time.
    pub timestamp: i64,
    /// Network address the attempt originated from; the correlation key.
    pub source: String,
    pub username: String,
    pub event_type: String,
    pub status: LoginStatus,
    pub geo: GeoClass,
}

impl AuthEvent {
    pub fn new(
        timestamp: i64,
        source: String,
        username: String,
        status: LoginStatus,
        geo: GeoClass,
    ) -> Self {
        AuthEvent {
            timestamp,
            source,
            username,
            event_type: EVENT_TYPE_AUTH.to_string(),
            status,
            geo,
        }
    }
}
