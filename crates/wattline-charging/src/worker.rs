use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use wattline_core::config::WH_PER_TICK;
use wattline_sessions::{ChargingSession, SessionStore};

use crate::event::{ChargeStatus, ProgressEvent};
use crate::hub::ListenerHub;
use crate::registry::ChargeRegistry;

/// Number of simulated ticks needed to fill `capacity` Wh.
pub(crate) fn ticks_for(capacity: u64) -> u64 {
    capacity.div_ceil(WH_PER_TICK)
}

/// Outcome of the simulation loop, before terminal persistence.
enum SimOutcome {
    Completed(u64),
    Cancelled,
}

/// Executes the full life of one admitted session on its own task.
///
/// The worker owns the session's registry entry for its entire run and
/// releases it as the very last step, after all store writes — no other
/// worker can be admitted for the id while this one might still write.
pub struct ChargeWorker {
    session: ChargingSession,
    store: Arc<dyn SessionStore>,
    hub: Arc<ListenerHub>,
    registry: Arc<ChargeRegistry>,
    cancel: CancellationToken,
    tick: Duration,
}

impl ChargeWorker {
    pub(crate) fn new(
        session: ChargingSession,
        store: Arc<dyn SessionStore>,
        hub: Arc<ListenerHub>,
        registry: Arc<ChargeRegistry>,
        cancel: CancellationToken,
        tick: Duration,
    ) -> Self {
        Self {
            session,
            store,
            hub,
            registry,
            cancel,
            tick,
        }
    }

    /// Run to a terminal state and release the registry entry.
    pub async fn run(self) {
        let id = self.session.id.clone();

        match self.simulate().await {
            SimOutcome::Completed(ticks) => {
                if let Err(e) = self.finish(ticks).await {
                    error!(session_id = %id, "failed to persist completion: {e}");
                    self.reset_charging().await;
                }
            }
            SimOutcome::Cancelled => {
                info!(session_id = %id, "charging cancelled");
                self.reset_charging().await;
            }
        }

        self.registry.release(&id);
    }

    /// The timed progress loop. The per-tick sleep is the worker's only
    /// suspend point and the only place cancellation is observed.
    async fn simulate(&self) -> SimOutcome {
        let ticks = ticks_for(self.session.battery_capacity);
        info!(
            session_id = %self.session.id,
            capacity = self.session.battery_capacity,
            ticks,
            "charging started"
        );
        self.hub
            .broadcast(&ProgressEvent::at_tick(&self.session, 0, ChargeStatus::Started));

        for i in 1..=ticks {
            tokio::select! {
                _ = self.cancel.cancelled() => return SimOutcome::Cancelled,
                _ = tokio::time::sleep(self.tick) => {}
            }
            self.hub
                .broadcast(&ProgressEvent::at_tick(&self.session, i, ChargeStatus::Charging));
        }

        SimOutcome::Completed(ticks)
    }

    /// Persist the terminal state and emit the final event.
    ///
    /// Re-reads the record first so edits made while the simulation ran
    /// are not clobbered; only the flags this worker owns are touched.
    async fn finish(&self, ticks: u64) -> crate::Result<()> {
        let Some(mut current) = self.store.find_by_id(&self.session.id).await? else {
            warn!(session_id = %self.session.id, "session vanished before completion");
            return Ok(());
        };

        current.completed = true;
        current.charging = false;
        let current = self.store.save(&current).await?;

        self.hub
            .broadcast(&ProgressEvent::at_tick(&current, ticks, ChargeStatus::Completed));
        info!(session_id = %current.id, "charging completed");
        Ok(())
    }

    /// Recovery path shared by cancellation and failure: clear the
    /// `charging` flag so the next scan sees the session as eligible
    /// again. Never leaves `charging = true` behind an exited worker.
    async fn reset_charging(&self) {
        match self.store.find_by_id(&self.session.id).await {
            Ok(Some(mut current)) => {
                current.charging = false;
                if let Err(e) = self.store.save(&current).await {
                    error!(session_id = %current.id, "failed to reset charging flag: {e}");
                }
            }
            Ok(None) => {
                warn!(session_id = %self.session.id, "session vanished during recovery");
            }
            Err(e) => {
                error!(session_id = %self.session.id, "recovery read failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_count_rounds_up_per_started_kwh() {
        assert_eq!(ticks_for(2500), 3);
        assert_eq!(ticks_for(1000), 1);
        assert_eq!(ticks_for(1001), 2);
        assert_eq!(ticks_for(999), 1);
        assert_eq!(ticks_for(0), 0);
    }
}
