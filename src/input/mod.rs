//! Input sources feeding the ingestion pipeline
//!
//! Both sources produce raw [`Submission`]s; validation and status parsing
//! stay in the pipeline so no input path can bypass them.

pub mod file_tailer;
pub mod listener;

pub use file_tailer::AuthLogTailer;
pub use listener::UdpIngestListener;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while reading input sources
#[derive(Error, Debug)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid log pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Malformed submission: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One raw authentication submission on its way into the pipeline. Field
/// names match the JSON wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub username: String,
    pub ip: String,
    pub status: String,
}
