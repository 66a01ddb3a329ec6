use rusqlite::Connection;

use crate::error::Result;

/// Initialise the charging sessions schema in `conn`.
///
/// Safe to call on every startup — uses `IF NOT EXISTS` throughout.
/// The partial index covers the scheduler's scan, which only ever looks
/// at records that are not yet completed.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS charging_sessions (
            id               TEXT    NOT NULL PRIMARY KEY,
            user_id          TEXT    NOT NULL,
            vehicle_id       TEXT    NOT NULL,
            station_id       TEXT    NOT NULL,
            pump_number      INTEGER NOT NULL,
            battery_capacity INTEGER NOT NULL,
            reserved         INTEGER NOT NULL DEFAULT 0,
            start_time       TEXT,               -- ISO-8601 or NULL
            charging         INTEGER NOT NULL DEFAULT 0,
            completed        INTEGER NOT NULL DEFAULT 0,
            created_at       TEXT    NOT NULL,
            updated_at       TEXT    NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_sessions_open
            ON charging_sessions (completed, start_time);
        ",
    )?;
    Ok(())
}
