//! `wattline-sessions` — persistence for charging session records.
//!
//! A charging session is the unit of work the charging engine executes:
//! created by the gateway, picked up by the scheduler (or started
//! immediately for walk-in sessions), and driven to completion by a
//! worker. This crate owns the record type, the SQLite schema, and the
//! [`SessionStore`] trait the engine consumes.

pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use store::{SessionStore, SqliteSessionStore};
pub use types::{ChargingSession, NewSession};
