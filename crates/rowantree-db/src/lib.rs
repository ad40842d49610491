//! `PostgreSQL` user-state service for the Rowan Tree world personality.
//!
//! The game schema owns every table; this crate only calls the stored
//! functions it exposes for reading users and applying deltas. A resolved
//! action queue is applied inside a single transaction, so a user either
//! sees every mutation and the notification or none of them.
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`user_state`] -- [`PgUserStateService`], the stored-function client
//! - [`error`] -- Shared error types

pub mod error;
pub mod postgres;
pub mod user_state;

// Re-export primary types for convenience.
pub use error::DbError;
pub use postgres::{PostgresConfig, PostgresPool};
pub use user_state::PgUserStateService;
