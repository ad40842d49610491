//! Structured logging setup.
//!
//! Human-readable lines always go to stdout. When `logging.json_file` is
//! set, the same events are also appended as JSON lines to
//! `<logs_dir>/rowantree-personality.log`. `RUST_LOG` takes precedence
//! over the configured level.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rowantree_core::config::Config;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, fmt};

use crate::error::EngineError;

/// File name of the JSON log inside the logs directory.
pub const LOG_FILE_NAME: &str = "rowantree-personality.log";

/// Path of the JSON log for a logs directory.
pub fn log_file_path(logs_dir: &str) -> PathBuf {
    Path::new(logs_dir).join(LOG_FILE_NAME)
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns [`EngineError::Logging`] if the log file cannot be opened or a
/// subscriber is already installed.
pub fn init(config: &Config) -> Result<(), EngineError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let json_layer = if config.logging.json_file {
        std::fs::create_dir_all(&config.directory.logs_dir).map_err(|e| {
            EngineError::Logging {
                message: format!("cannot create {}: {e}", config.directory.logs_dir),
            }
        })?;
        let path = log_file_path(&config.directory.logs_dir);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| EngineError::Logging {
                message: format!("cannot open {}: {e}", path.display()),
            })?;
        Some(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(json_layer)
        .try_init()
        .map_err(|e| EngineError::Logging {
            message: e.to_string(),
        })
}
