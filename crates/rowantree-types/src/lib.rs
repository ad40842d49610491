//! Shared type definitions for the Rowan Tree world personality.
//!
//! Types here cross the boundary to the user-state service and, through the
//! notification payload, to the game client. The payload types export
//! `TypeScript` bindings via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe user identifier
//! - [`enums`] -- Resource stores and outcome kinds
//! - [`event`] -- Encounter events and store snapshots
//! - [`actions`] -- Mutation commands and the ordered action queue

pub mod actions;
pub mod enums;
pub mod event;
pub mod ids;

pub use actions::{Action, ActionQueue};
pub use enums::{OutcomeKind, StoreType, UnknownKind};
pub use event::{StoreSnapshot, UserEvent};
pub use ids::UserId;
