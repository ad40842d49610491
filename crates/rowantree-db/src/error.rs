//! Error types for the data layer.
//!
//! Data-layer failures surface as [`DbError`]. When they cross into the
//! personality they become a [`ServiceError`]: a statement the database
//! refused is a rejection of that command, anything else is transport.

use rowantree_core::service::ServiceError;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Map a failed statement for the command `action` into a [`ServiceError`].
pub(crate) fn command_error(action: &'static str, err: sqlx::Error) -> ServiceError {
    match err {
        sqlx::Error::Database(db) => ServiceError::Rejected {
            action,
            message: db.message().to_owned(),
        },
        other => DbError::Postgres(other).into(),
    }
}
