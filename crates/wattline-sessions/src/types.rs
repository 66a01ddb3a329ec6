use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted charging session record.
///
/// `charging` is a durable hint that a worker owns the session; the
/// in-memory registry is the actual mutual-exclusion authority. After a
/// process restart a record may be left with `charging = true` and no
/// live worker — the scheduler treats such records as eligible again.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingSession {
    /// UUIDv4 string — primary key, assigned by the store at creation.
    pub id: String,
    /// Owning user. Opaque to the engine.
    pub user_id: String,
    /// Vehicle being charged. Opaque to the engine.
    pub vehicle_id: String,
    /// Station where the session takes place. Opaque to the engine.
    pub station_id: String,
    /// Pump index at the station.
    pub pump_number: u32,
    /// Battery capacity in Wh — drives the simulated run length.
    pub battery_capacity: u64,
    /// True for reservations; immutable after creation.
    pub reserved: bool,
    /// Scheduled start instant. Meaningful only when `reserved`.
    pub start_time: Option<DateTime<Utc>>,
    /// True while a worker owns the session.
    pub charging: bool,
    /// Terminal flag — once true it is never reset.
    pub completed: bool,
    /// RFC3339 creation timestamp.
    pub created_at: String,
    /// RFC3339 timestamp of the last update.
    pub updated_at: String,
}

/// Creation payload — everything the caller decides; the store assigns
/// `id`, timestamps, and the initial `charging`/`completed` flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    pub user_id: String,
    pub vehicle_id: String,
    pub station_id: String,
    pub pump_number: u32,
    pub battery_capacity: u64,
    pub reserved: bool,
    pub start_time: Option<DateTime<Utc>>,
}

impl ChargingSession {
    /// Whether this record may begin execution at `now`.
    ///
    /// Walk-in sessions (`reserved == false`) are always eligible.
    /// Reservations become eligible once the scheduled start has
    /// arrived. A reservation without a start instant is malformed and
    /// never eligible.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        if !self.reserved {
            return true;
        }
        match self.start_time {
            Some(start) => now >= start,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(reserved: bool, start_time: Option<DateTime<Utc>>) -> ChargingSession {
        ChargingSession {
            id: "s-1".into(),
            user_id: "u-1".into(),
            vehicle_id: "v-1".into(),
            station_id: "st-1".into(),
            pump_number: 2,
            battery_capacity: 2500,
            reserved,
            start_time,
            charging: false,
            completed: false,
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn walk_in_is_always_eligible() {
        let now = Utc::now();
        assert!(session(false, None).is_eligible(now));
        assert!(session(false, Some(now + Duration::hours(1))).is_eligible(now));
    }

    #[test]
    fn reservation_waits_for_start_time() {
        let now = Utc::now();
        let s = session(true, Some(now + Duration::minutes(5)));
        assert!(!s.is_eligible(now));
        assert!(s.is_eligible(now + Duration::minutes(5)));
        assert!(s.is_eligible(now + Duration::minutes(6)));
    }

    #[test]
    fn reservation_without_start_time_is_never_eligible() {
        assert!(!session(true, None).is_eligible(Utc::now()));
    }
}
