//! `wattline-charging` — the charging execution core.
//!
//! # Overview
//!
//! Charging session records are persisted by `wattline-sessions`. The
//! [`engine::ChargingEngine`] polls the store on a fixed period and
//! admits every eligible record; walk-in sessions skip the wait via
//! [`engine::ChargingEngine::start_now`]. Admission is guarded by the
//! [`registry::ChargeRegistry`] so the two paths can race safely, and
//! each admitted session runs on its own worker task that emits progress
//! events through the [`hub::ListenerHub`].
//!
//! | Component        | Responsibility                                  |
//! |------------------|-------------------------------------------------|
//! | `ChargeRegistry` | Atomic admit/release, one worker per session    |
//! | `ChargingEngine` | Periodic scan, eligibility, admission, shutdown |
//! | `ChargeWorker`   | Timed simulation, terminal persistence          |
//! | `ListenerHub`    | Best-effort fan-out of progress events          |

pub mod engine;
pub mod error;
pub mod event;
pub mod hub;
pub mod registry;
pub mod worker;

pub use engine::ChargingEngine;
pub use error::{ChargingError, Result};
pub use event::{ChargeStatus, ProgressEvent};
pub use hub::ListenerHub;
pub use registry::ChargeRegistry;
