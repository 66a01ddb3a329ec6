use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::event::ProgressEvent;

/// Buffered events per listener before sends start being dropped.
const LISTENER_QUEUE: usize = 64;

/// Fan-out of progress events to connected listeners.
///
/// The transport (a WebSocket endpoint, in the gateway) registers an
/// mpsc sender per connection and owns the forwarding task; the hub
/// only pushes serialized events into those queues. Delivery is
/// best-effort and at-most-once — a listener that connects after an
/// event was sent never sees it.
pub struct ListenerHub {
    listeners: DashMap<String, mpsc::Sender<String>>,
}

impl ListenerHub {
    pub fn new() -> Self {
        Self {
            listeners: DashMap::new(),
        }
    }

    /// Create the queue for a new listener and register its sender.
    /// Returns the receiving end for the connection's forwarding task.
    pub fn register(&self, conn_id: &str) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(LISTENER_QUEUE);
        self.listeners.insert(conn_id.to_string(), tx);
        debug!(conn_id, total = self.listeners.len(), "listener registered");
        rx
    }

    /// Drop a listener. Safe to call for ids that were already removed.
    pub fn unregister(&self, conn_id: &str) {
        self.listeners.remove(conn_id);
        debug!(conn_id, total = self.listeners.len(), "listener removed");
    }

    /// Number of currently registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Serialize `event` once and push it to every listener.
    ///
    /// A closed or saturated listener queue is logged and skipped — one
    /// broken subscriber never blocks the worker that is broadcasting or
    /// the other listeners.
    pub fn broadcast(&self, event: &ProgressEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                error!(session_id = %event.session_id, "failed to serialize progress event: {e}");
                return;
            }
        };

        for entry in self.listeners.iter() {
            if let Err(e) = entry.value().try_send(payload.clone()) {
                warn!(conn_id = %entry.key(), "listener send failed, skipping: {e}");
            }
        }
    }
}

impl Default for ListenerHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ChargeStatus;

    fn event() -> ProgressEvent {
        ProgressEvent {
            session_id: "s-1".into(),
            station: "st-1".into(),
            pump: 1,
            vehicle: "v-1".into(),
            charging_rate: 100,
            status: ChargeStatus::Charging,
        }
    }

    #[test]
    fn broadcast_reaches_all_listeners() {
        let hub = ListenerHub::new();
        let mut a = hub.register("a");
        let mut b = hub.register("b");

        hub.broadcast(&event());

        assert!(a.try_recv().is_ok());
        assert!(b.try_recv().is_ok());
    }

    #[test]
    fn closed_listener_does_not_block_the_others() {
        let hub = ListenerHub::new();
        let rx = hub.register("dead");
        let mut live = hub.register("live");
        drop(rx);

        hub.broadcast(&event());

        let payload = live.try_recv().expect("live listener should receive");
        assert!(payload.contains(r#""sessionId":"s-1""#));
    }

    #[test]
    fn unregister_stops_delivery() {
        let hub = ListenerHub::new();
        let mut rx = hub.register("a");
        hub.broadcast(&event());
        assert!(rx.try_recv().is_ok());

        hub.unregister("a");
        assert_eq!(hub.len(), 0);
        hub.broadcast(&event());
        // The sender side is gone; nothing further is queued.
        assert!(rx.try_recv().is_err());
    }
}
