//! Error types for the personality binary.
//!
//! [`EngineError`] wraps every failure that can stop the engine from
//! starting. Once the tick loop is running nothing is fatal.

/// Top-level error for the personality binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: rowantree_core::config::ConfigError,
    },

    /// Connecting to the user-state database failed.
    #[error("database error: {source}")]
    Database {
        /// The underlying data-layer error.
        #[from]
        source: rowantree_db::DbError,
    },

    /// The loremaster client could not be built.
    #[error("loremaster error: {message}")]
    Loremaster {
        /// Description of the loremaster failure.
        message: String,
    },

    /// Logging could not be initialized.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the logging failure.
        message: String,
    },
}
