use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};
use wattline_core::config::ChargingConfig;
use wattline_sessions::{ChargingSession, SessionStore};

use crate::hub::ListenerHub;
use crate::registry::ChargeRegistry;
use crate::worker::ChargeWorker;
use crate::Result;

/// Drives charging sessions from persisted records to completion.
///
/// A single non-reentrant loop scans the store on a fixed period and
/// admits every eligible session; [`start_now`](Self::start_now) lets
/// walk-in sessions skip the wait. Both paths funnel through the same
/// registry admit, so they can race on one id and exactly one wins.
///
/// The scan is level-triggered: eligibility is re-evaluated from the
/// store every pass, so a record that becomes eligible between passes is
/// picked up with a latency of at most one scan period. That bound is a
/// documented property of the polling design, not an accident.
pub struct ChargingEngine {
    store: Arc<dyn SessionStore>,
    registry: Arc<ChargeRegistry>,
    hub: Arc<ListenerHub>,
    workers: TaskTracker,
    scan_period: Duration,
    tick: Duration,
}

impl ChargingEngine {
    pub fn new(
        store: Arc<dyn SessionStore>,
        registry: Arc<ChargeRegistry>,
        hub: Arc<ListenerHub>,
        config: &ChargingConfig,
    ) -> Self {
        Self {
            store,
            registry,
            hub,
            workers: TaskTracker::new(),
            scan_period: Duration::from_secs(config.scan_period_secs),
            tick: Duration::from_millis(config.tick_ms),
        }
    }

    /// Main loop. Scans immediately on start, then on every period,
    /// until `shutdown` broadcasts `true`. A failed scan is logged and
    /// retried on the next tick.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(period_secs = self.scan_period.as_secs(), "charging engine started");

        let mut interval = tokio::time::interval(self.scan_period);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.scan().await {
                        Ok(n) if n > 0 => info!(admitted = n, "scan admitted sessions"),
                        Ok(_) => {}
                        Err(e) => error!("charging scan error: {e}"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("charging engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One scheduler pass: admit every eligible session. Returns the
    /// number of workers launched.
    pub async fn scan(&self) -> Result<usize> {
        let sessions = self.store.find_all().await?;
        let now = Utc::now();

        let mut admitted = 0;
        for session in sessions {
            if session.completed {
                continue;
            }
            // Truly in flight — a worker owns it right now.
            if session.charging && self.registry.is_active(&session.id) {
                continue;
            }
            if !session.is_eligible(now) {
                continue;
            }
            // A `charging` record with no live worker is left over from
            // a crash or restart; it falls through to re-admission.
            if session.charging {
                warn!(session_id = %session.id, "re-admitting stale charging session");
            }
            if self.admit(session).await {
                admitted += 1;
            }
        }
        Ok(admitted)
    }

    /// Start a freshly created walk-in session without waiting for the
    /// next scan. Same admit sequence, same registry guard — racing the
    /// scheduler on one id is expected and exactly one path wins.
    ///
    /// Returns `false` when the session did not start here: already
    /// admitted elsewhere, already completed, or the admission write
    /// failed (logged).
    pub async fn start_now(&self, session: ChargingSession) -> bool {
        if session.completed {
            return false;
        }
        self.admit(session).await
    }

    /// Claim the registry entry, persist `charging = true`, then launch
    /// the worker. The worker is never run inline — admission always
    /// hands off to an independently scheduled task.
    async fn admit(&self, mut session: ChargingSession) -> bool {
        let Some(token) = self.registry.try_admit(&session.id) else {
            return false;
        };

        session.charging = true;
        let persisted = match self.store.save(&session).await {
            Ok(p) => p,
            Err(e) => {
                error!(session_id = %session.id, "failed to persist admission: {e}");
                self.registry.release(&session.id);
                return false;
            }
        };

        let worker = ChargeWorker::new(
            persisted,
            Arc::clone(&self.store),
            Arc::clone(&self.hub),
            Arc::clone(&self.registry),
            token,
            self.tick,
        );
        self.workers.spawn(worker.run());
        true
    }

    /// Stop every live worker: signal cancellation, then wait up to
    /// `grace` for the recovery paths to flush. Workers still live after
    /// the grace period are abandoned best-effort.
    pub async fn shutdown(&self, grace: Duration) {
        self.registry.cancel_all();
        self.workers.close();
        if tokio::time::timeout(grace, self.workers.wait()).await.is_err() {
            warn!(
                live = self.registry.len(),
                "grace period elapsed, abandoning live workers"
            );
        }
    }
}
