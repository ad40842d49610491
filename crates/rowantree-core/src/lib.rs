//! Tick loop, encounter odds, and event resolution for the Rowan Tree world
//! personality.
//!
//! Each tick the personality walks the active users, rolls every user's
//! encounter odds, asks the loremaster for an event on a hit, clamps the
//! event's rewards and curses against what the user actually holds, and
//! submits the resulting action queue to the user-state service.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `rowantree-config.yaml`.
//! - [`control`] -- Stop signalling and interruptible naps for the loop.
//! - [`dispatch`] -- Batch submission of a resolved action queue.
//! - [`luck`] -- The per-user encounter odds gate.
//! - [`memory`] -- In-memory collaborators for tests and local runs.
//! - [`personality`] -- The tick orchestrator.
//! - [`resolver`] -- Turns an event into a clamped action queue.
//! - [`service`] -- [`UserStateService`] and [`EventGenerator`] traits.
//!
//! [`UserStateService`]: service::UserStateService
//! [`EventGenerator`]: service::EventGenerator

pub mod config;
pub mod control;
pub mod dispatch;
pub mod luck;
pub mod memory;
pub mod personality;
pub mod resolver;
pub mod service;
