//! World personality binary for Rowan Tree.
//!
//! Wires the tick loop to its collaborators and runs it until Ctrl-C or
//! the configured tick bound.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `rowantree-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Connect to the user-state database
//! 4. Build the loremaster client
//! 5. Install the Ctrl-C stop handler
//! 6. Run the personality loop
//! 7. Log the result

mod error;
mod logging;
mod loremaster;

use std::path::Path;
use std::sync::Arc;

use rowantree_core::config::Config;
use rowantree_core::control::LoopControl;
use rowantree_core::personality::Personality;
use rowantree_db::{PgUserStateService, PostgresConfig, PostgresPool};
use tracing::{info, warn};

use crate::error::EngineError;
use crate::loremaster::HttpLoremaster;

/// Config file looked up in the working directory.
const CONFIG_FILE: &str = "rowantree-config.yaml";

/// Application entry point for the personality.
///
/// # Errors
///
/// Returns an error if any startup step fails. The loop itself does not fail.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging.
    logging::init(&config)?;
    info!("rowantree-personality starting");
    if from_file {
        info!(path = CONFIG_FILE, "Configuration loaded");
    } else {
        info!("Config file not found, using defaults");
    }

    // 3. Connect to the user-state database.
    let postgres_config = PostgresConfig::from_database_config(&config.database);
    info!(
        server = config.database.server,
        port = config.database.port,
        database = config.database.name,
        "Connecting to PostgreSQL"
    );
    let postgres = PostgresPool::connect(&postgres_config)
        .await
        .map_err(EngineError::from)?;
    let service = PgUserStateService::new(&postgres);

    // 4. Build the loremaster client.
    let loremaster = HttpLoremaster::new(&config.loremaster)?;
    info!(
        url = loremaster.base_url(),
        timeout_ms = config.loremaster.request_timeout_ms,
        "Loremaster client ready"
    );

    // 5. Stop on Ctrl-C.
    let control = Arc::new(LoopControl::new());
    {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received, finishing current tick");
                    control.request_stop();
                }
                Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
            }
        });
    }

    // 6. Run the personality.
    let mut personality = Personality::new(service, loremaster, config.personality, control);
    let summary = personality.run().await;

    // 7. Log results.
    postgres.close().await;
    info!(
        end_reason = ?summary.end_reason,
        started_at = %summary.started_at,
        total_ticks = summary.total_ticks,
        total_failures = summary.total_failures,
        "rowantree-personality shutdown complete"
    );

    Ok(())
}

/// Load configuration from `rowantree-config.yaml`.
///
/// A missing file means defaults; environment overrides apply either way.
/// Returns whether the file was found.
fn load_config() -> Result<(Config, bool), EngineError> {
    let config_path = Path::new(CONFIG_FILE);
    if config_path.exists() {
        Ok((Config::from_file(config_path)?, true))
    } else {
        Ok((Config::parse("")?, false))
    }
}
