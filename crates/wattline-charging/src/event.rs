use serde::{Deserialize, Serialize};
use wattline_core::config::RATE_PER_TICK;
use wattline_sessions::ChargingSession;

/// Where a session is in its simulated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    /// Worker admitted, no progress yet.
    Started,
    /// One simulated tick of progress.
    Charging,
    /// Run finished; the final event for the session.
    Completed,
}

impl std::fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChargeStatus::Started => "started",
            ChargeStatus::Charging => "charging",
            ChargeStatus::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// A live progress update, broadcast to every connected listener.
///
/// Transient — never persisted, no replay for late subscribers. The
/// station/pump/vehicle references are copied from the session record at
/// emission time so listeners can render without a second lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub session_id: String,
    pub station: String,
    pub pump: u32,
    pub vehicle: String,
    pub charging_rate: u64,
    pub status: ChargeStatus,
}

impl ProgressEvent {
    /// Build an event for `session` at simulated tick `tick`
    /// (0 = admission).
    pub fn at_tick(session: &ChargingSession, tick: u64, status: ChargeStatus) -> Self {
        Self {
            session_id: session.id.clone(),
            station: session.station_id.clone(),
            pump: session.pump_number,
            vehicle: session.vehicle_id.clone(),
            charging_rate: tick * RATE_PER_TICK,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ChargingSession {
        ChargingSession {
            id: "s-42".into(),
            user_id: "u-1".into(),
            vehicle_id: "v-7".into(),
            station_id: "st-9".into(),
            pump_number: 4,
            battery_capacity: 2500,
            reserved: false,
            start_time: None,
            charging: true,
            completed: false,
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn wire_shape_is_camel_case() {
        let ev = ProgressEvent::at_tick(&session(), 2, ChargeStatus::Charging);
        let json = serde_json::to_value(&ev).unwrap();

        assert_eq!(json["sessionId"], "s-42");
        assert_eq!(json["station"], "st-9");
        assert_eq!(json["pump"], 4);
        assert_eq!(json["vehicle"], "v-7");
        assert_eq!(json["chargingRate"], 200);
        assert_eq!(json["status"], "charging");
        assert_eq!(json.as_object().unwrap().len(), 6);
    }

    #[test]
    fn status_tags_are_lowercase() {
        assert_eq!(
            serde_json::to_string(&ChargeStatus::Started).unwrap(),
            r#""started""#
        );
        assert_eq!(
            serde_json::to_string(&ChargeStatus::Completed).unwrap(),
            r#""completed""#
        );
    }
}
