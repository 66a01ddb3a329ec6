//! `wattline-core` — shared configuration and error types.

pub mod config;
pub mod error;

pub use error::{Result, WattlineError};
