use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::types::{ChargingSession, NewSession};

/// Store interface consumed by the charging engine.
///
/// Each call is treated as its own transaction; the engine never holds a
/// lock across a read-modify-save sequence. Implementations must be
/// `Send + Sync` so they can be shared across the scheduler and worker
/// tasks behind an `Arc`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Return every known session record.
    async fn find_all(&self) -> Result<Vec<ChargingSession>>;

    /// Retrieve a session by id, returning `None` if it does not exist.
    async fn find_by_id(&self, id: &str) -> Result<Option<ChargingSession>>;

    /// Upsert a record and return the persisted form.
    async fn save(&self, session: &ChargingSession) -> Result<ChargingSession>;
}

/// SQLite-backed session store.
///
/// Wraps a single connection in a `Mutex`. The engine's scan runs at
/// most every few seconds and worker writes are tiny, so a Mutex is
/// sufficient; a pool would only matter at far higher write rates.
pub struct SqliteSessionStore {
    db: Mutex<Connection>,
}

impl SqliteSessionStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Insert a new record with a fresh id and cleared runtime flags.
    #[instrument(skip(self, new), fields(user = %new.user_id, station = %new.station_id))]
    pub fn create(&self, new: &NewSession) -> Result<ChargingSession> {
        if new.reserved && new.start_time.is_none() {
            return Err(StoreError::InvalidSession(
                "reserved session requires a start time".into(),
            ));
        }

        let now = Utc::now().to_rfc3339();
        let session = ChargingSession {
            id: Uuid::new_v4().to_string(),
            user_id: new.user_id.clone(),
            vehicle_id: new.vehicle_id.clone(),
            station_id: new.station_id.clone(),
            pump_number: new.pump_number,
            battery_capacity: new.battery_capacity,
            reserved: new.reserved,
            start_time: new.start_time,
            charging: false,
            completed: false,
            created_at: now.clone(),
            updated_at: now,
        };

        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO charging_sessions
             (id, user_id, vehicle_id, station_id, pump_number, battery_capacity,
              reserved, start_time, charging, completed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, 0, ?9, ?9)",
            rusqlite::params![
                session.id,
                session.user_id,
                session.vehicle_id,
                session.station_id,
                session.pump_number,
                session.battery_capacity as i64,
                session.reserved,
                session.start_time.map(|t| t.to_rfc3339()),
                session.created_at,
            ],
        )?;
        debug!(session_id = %session.id, "session created");
        Ok(session)
    }

    /// List sessions matching the given filters, oldest first.
    ///
    /// `None` filters match everything — mirrors the monitoring UI's
    /// optional query parameters.
    pub fn list_filtered(
        &self,
        user_id: Option<&str>,
        completed: Option<bool>,
        charging: Option<bool>,
    ) -> Result<Vec<ChargingSession>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, user_id, vehicle_id, station_id, pump_number, battery_capacity,
                    reserved, start_time, charging, completed, created_at, updated_at
             FROM charging_sessions
             WHERE (?1 IS NULL OR user_id = ?1)
               AND (?2 IS NULL OR completed = ?2)
               AND (?3 IS NULL OR charging = ?3)
             ORDER BY created_at",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![user_id, completed, charging],
            row_to_session,
        )?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn find_all(&self) -> Result<Vec<ChargingSession>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare_cached(
            "SELECT id, user_id, vehicle_id, station_id, pump_number, battery_capacity,
                    reserved, start_time, charging, completed, created_at, updated_at
             FROM charging_sessions ORDER BY created_at",
        )?;
        let rows = stmt.query_map([], row_to_session)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ChargingSession>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            "SELECT id, user_id, vehicle_id, station_id, pump_number, battery_capacity,
                    reserved, start_time, charging, completed, created_at, updated_at
             FROM charging_sessions WHERE id = ?1",
            rusqlite::params![id],
            row_to_session,
        ) {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    async fn save(&self, session: &ChargingSession) -> Result<ChargingSession> {
        let mut persisted = session.clone();
        persisted.updated_at = Utc::now().to_rfc3339();

        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO charging_sessions
             (id, user_id, vehicle_id, station_id, pump_number, battery_capacity,
              reserved, start_time, charging, completed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(id) DO UPDATE SET
                 pump_number      = excluded.pump_number,
                 battery_capacity = excluded.battery_capacity,
                 start_time       = excluded.start_time,
                 charging         = excluded.charging,
                 completed        = excluded.completed,
                 updated_at       = excluded.updated_at",
            rusqlite::params![
                persisted.id,
                persisted.user_id,
                persisted.vehicle_id,
                persisted.station_id,
                persisted.pump_number,
                persisted.battery_capacity as i64,
                persisted.reserved,
                persisted.start_time.map(|t| t.to_rfc3339()),
                persisted.charging,
                persisted.completed,
                persisted.created_at,
                persisted.updated_at,
            ],
        )?;
        Ok(persisted)
    }
}

/// Map a SQLite row to a `ChargingSession`.
fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChargingSession> {
    let start_time: Option<String> = row.get(7)?;
    // A malformed timestamp is treated as absent rather than failing the
    // whole scan; the record then follows the never-eligible path.
    let start_time = start_time
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc));

    Ok(ChargingSession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        vehicle_id: row.get(2)?,
        station_id: row.get(3)?,
        pump_number: row.get(4)?,
        battery_capacity: row.get::<_, i64>(5)? as u64,
        reserved: row.get(6)?,
        start_time,
        charging: row.get(8)?,
        completed: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store() -> SqliteSessionStore {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        crate::db::init_db(&conn).expect("init schema");
        SqliteSessionStore::new(conn)
    }

    fn walk_in() -> NewSession {
        NewSession {
            user_id: "u-1".into(),
            vehicle_id: "v-1".into(),
            station_id: "st-1".into(),
            pump_number: 3,
            battery_capacity: 2500,
            reserved: false,
            start_time: None,
        }
    }

    #[tokio::test]
    async fn create_then_find_round_trips() {
        let store = open_store();
        let created = store.create(&walk_in()).expect("create");
        assert!(!created.charging);
        assert!(!created.completed);

        let found = store.find_by_id(&created.id).await.expect("find").unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.battery_capacity, 2500);
        assert_eq!(found.pump_number, 3);
    }

    #[tokio::test]
    async fn save_updates_flags() {
        let store = open_store();
        let mut s = store.create(&walk_in()).expect("create");
        s.charging = true;
        store.save(&s).await.expect("save");

        let found = store.find_by_id(&s.id).await.expect("find").unwrap();
        assert!(found.charging);

        s.charging = false;
        s.completed = true;
        store.save(&s).await.expect("save");
        let found = store.find_by_id(&s.id).await.expect("find").unwrap();
        assert!(found.completed);
        assert!(!found.charging);
    }

    #[tokio::test]
    async fn find_by_id_missing_returns_none() {
        let store = open_store();
        assert!(store.find_by_id("nope").await.expect("find").is_none());
    }

    #[test]
    fn reserved_without_start_time_is_rejected() {
        let store = open_store();
        let mut new = walk_in();
        new.reserved = true;
        assert!(matches!(
            store.create(&new),
            Err(StoreError::InvalidSession(_))
        ));
    }

    #[tokio::test]
    async fn list_filtered_applies_filters() {
        let store = open_store();
        let a = store.create(&walk_in()).expect("create");
        let mut other = walk_in();
        other.user_id = "u-2".into();
        let b = store.create(&other).expect("create");

        let mut done = store.find_by_id(&b.id).await.unwrap().unwrap();
        done.completed = true;
        store.save(&done).await.expect("save");

        let all = store.list_filtered(None, None, None).expect("list");
        assert_eq!(all.len(), 2);

        let mine = store.list_filtered(Some("u-1"), None, None).expect("list");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, a.id);

        let open = store.list_filtered(None, Some(false), None).expect("list");
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, a.id);
    }
}
