//! # Structured Logging Module
//!
//! Environment-aware structured logging that outputs to both console and a
//! JSON log file, for following detached fetch tasks after the fact.

use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::ConfigManager;
use crate::fetch::request::RequestId;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
///
/// Safe to call more than once; only the first call installs a subscriber and
/// returns `true`. If another global subscriber is already installed, that one
/// is kept. Console output goes to stderr.
pub fn init_structured_logging() -> bool {
    let mut initialized_here = false;
    LOGGER_INITIALIZED.get_or_init(|| {
        initialized_here = true;
        let environment = ConfigManager::detect_environment();
        let log_level = get_log_level(&environment);

        let log_dir = PathBuf::from("log");
        let file_layer = match fs::create_dir_all(&log_dir) {
            Ok(()) => {
                let log_filename = format!(
                    "{}.{}.{}.log",
                    environment,
                    process::id(),
                    Utc::now().format("%Y%m%d_%H%M%S")
                );
                let file_appender = tracing_appender::rolling::never(&log_dir, log_filename);
                let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
                let layer = fmt::layer()
                    .with_writer(file_writer)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_ansi(false)
                    .json()
                    .with_filter(EnvFilter::new(&log_level));
                Some((layer, guard))
            }
            Err(e) => {
                eprintln!(
                    "Log directory {} unavailable ({e}); logging to console only",
                    log_dir.display()
                );
                None
            }
        };

        let (file_layer, guard) = match file_layer {
            Some((layer, guard)) => (Some(layer), Some(guard)),
            None => (None, None),
        };

        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .with_ansi(true)
                    .with_filter(EnvFilter::new(&log_level)),
            )
            .with(file_layer);

        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            pid = process::id(),
            environment = %environment,
            "Structured logging initialized"
        );

        // The file writer flushes for as long as its guard lives
        if let Some(guard) = guard {
            std::mem::forget(guard);
        }
    });
    initialized_here
}

pub fn is_logging_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

/// Get log level based on environment, `RUST_LOG` wins when set
fn get_log_level(environment: &str) -> String {
    if let Ok(filter) = std::env::var("RUST_LOG") {
        return filter;
    }

    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for fetch operations
pub fn log_fetch_operation(
    operation: &str,
    request_id: &RequestId,
    conf_name: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        request_id = %request_id,
        conf_name = %conf_name,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "FETCH_OPERATION"
    );
}
