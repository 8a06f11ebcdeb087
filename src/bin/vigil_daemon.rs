use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use vigil::alerting::{AlertQueue, NotificationDispatcher};
use vigil::config::Config;
use vigil::input::{AuthLogTailer, Submission, UdpIngestListener};
use vigil::output::{OutputFormat, OutputHandler};
use vigil::pipeline::{IngestionPipeline, SubmitError};
use vigil::store::{DetectionStore, MemoryStore, SqliteStore};

/// Main daemon entry point for the Vigil detection service
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Starting Vigil daemon...");

    // Load configuration
    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = if config_path.exists() {
        Config::from_file(&config_path)?
    } else {
        log::warn!("Config file not found, using defaults");
        Config::default()
    };

    // Setup graceful shutdown signal handling
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal, gracefully stopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    // Initialize store backend
    let store: Arc<dyn DetectionStore> = match config.storage.backend.as_str() {
        "memory" => {
            log::warn!("Using in-memory store; history will not survive restart");
            Arc::new(MemoryStore::new())
        }
        _ => {
            let db_path = config
                .storage
                .db_path
                .clone()
                .unwrap_or_else(|| PathBuf::from("vigil.db"));
            log::info!("Using SQLite store at {:?}", db_path);
            Arc::new(SqliteStore::open(db_path)?)
        }
    };

    let pipeline = IngestionPipeline::new(store, config.detection.clone());

    // Initialize detection log sink
    let output_format = OutputFormat::from_str(&config.output.format);
    let mut output_handler = OutputHandler::new(output_format, config.output.file_path.clone())?;

    // Notification dispatcher runs on its own runtime so the ingest loop
    // stays synchronous.
    let runtime = tokio::runtime::Runtime::new()?;
    let (tx, rx) = NotificationDispatcher::create_channel();
    let queue = AlertQueue::new(tx);
    let dispatcher = NotificationDispatcher::new(config.alerting.clone());
    runtime.spawn(dispatcher.run(rx));
    if config.alerting.enabled {
        log::info!("Webhook notifications enabled");
    }

    // Initialize input source
    let mut file_tailer: Option<AuthLogTailer> = None;
    let mut udp_listener: Option<UdpIngestListener> = None;

    match config.input.source_type.as_str() {
        "file" => {
            if let Some(ref path) = config.input.file_path {
                let mut tailer = AuthLogTailer::new(path.clone())?;
                tailer.initialize()?;
                file_tailer = Some(tailer);
                log::info!("Tailing auth log: {:?}", path);
            }
        }
        "udp" => {
            if let Some(ref address) = config.input.udp_address {
                let listener = UdpIngestListener::new(address)?;
                udp_listener = Some(listener);
                log::info!("Listening for submissions on {}", address);
            }
        }
        _ => {
            log::warn!("Unknown input source type: {}", config.input.source_type);
        }
    }

    log::info!("Daemon running. Press Ctrl+C to stop.");

    // Main ingest loop
    while running.load(Ordering::SeqCst) {
        let mut submissions = Vec::new();

        if let Some(ref mut tailer) = file_tailer {
            if tailer.is_valid() {
                match tailer.read_submissions() {
                    Ok(parsed) => submissions.extend(parsed),
                    Err(e) => log::error!("Error reading auth log: {}", e),
                }
            }
        } else if let Some(ref mut listener) = udp_listener {
            loop {
                match listener.read_message() {
                    Ok(Some(message)) => match UdpIngestListener::parse_submission(&message) {
                        Ok(submission) => submissions.push(submission),
                        Err(e) => log::debug!("Discarding malformed datagram: {}", e),
                    },
                    Ok(None) => break, // No more messages
                    Err(e) => {
                        log::error!("Error reading datagram: {}", e);
                        break;
                    }
                }
            }
        }

        for submission in submissions {
            process_submission(&pipeline, &queue, &mut output_handler, &submission);
        }

        // Sleep to avoid busy-waiting
        std::thread::sleep(Duration::from_millis(100));
    }

    output_handler.flush()?;
    log::info!("Vigil daemon stopped");
    Ok(())
}

/// Run one submission through the pipeline and fan out any detection
fn process_submission(
    pipeline: &IngestionPipeline,
    queue: &AlertQueue,
    output_handler: &mut OutputHandler,
    submission: &Submission,
) {
    match pipeline.submit(&submission.username, &submission.ip, &submission.status) {
        Ok(ack) => {
            if let Some(detection) = ack.detection {
                let notification = detection.to_notification(ack.event.timestamp);
                if let Err(e) = output_handler.write_notification(&notification) {
                    log::error!("Failed to write detection record: {}", e);
                }
                queue.queue_notification(notification);
            }
        }
        Err(SubmitError::Validation(e)) => {
            log::debug!("Rejected submission from input source: {}", e);
        }
        Err(e) => {
            // Storage/detection failures are surfaced, never swallowed; the
            // submission may have been recorded even when detection failed.
            log::error!("Submission failed: {}", e);
        }
    }
}
