pub mod alerting;
pub mod config;
pub mod detection;
pub mod input;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod store;

// Re-export commonly used types
pub use alerting::{AlertQueue, NotificationDispatcher};
pub use detection::{Detection, DetectionEngine};
pub use models::{Alert, AlertNotification, AuthEvent, GeoClass, LoginStatus, Metrics, Severity};
pub use pipeline::{Ack, IngestionPipeline, SubmitError, ValidationError};
pub use store::{AlertRegistry, DetectionStore, EventStore, MemoryStore, SqliteStore, StoreError};
