//! Database schema migrations.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 3;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    if current_version < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Current schema version, 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!("failed to read schema_version: {e}");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: flight log and key-value state.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS flights (
            id                       TEXT PRIMARY KEY,
            date                     TEXT NOT NULL,
            duration_hours           REAL NOT NULL,
            day_landings             INTEGER NOT NULL DEFAULT 0,
            night_full_stop_landings INTEGER NOT NULL DEFAULT 0,
            is_solo                  INTEGER NOT NULL DEFAULT 0,
            is_dual_received         INTEGER NOT NULL DEFAULT 0,
            is_cross_country         INTEGER NOT NULL DEFAULT 0,
            is_simulated_instrument  INTEGER NOT NULL DEFAULT 0,
            route_from               TEXT NOT NULL DEFAULT '',
            route_to                 TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: flight remarks and the date index used by listing.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "ALTER TABLE flights ADD COLUMN remarks TEXT NOT NULL DEFAULT '';
         CREATE INDEX IF NOT EXISTS idx_flights_date ON flights(date);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}

/// Migration v3: tach time and instructor signatures.
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "ALTER TABLE flights ADD COLUMN duration_tach REAL NOT NULL DEFAULT 0;
         ALTER TABLE flights ADD COLUMN instructor_signature TEXT;
         ALTER TABLE flights ADD COLUMN cfi_number TEXT NOT NULL DEFAULT '';
         ALTER TABLE flights ADD COLUMN signature_date TEXT;
         ALTER TABLE flights ADD COLUMN is_signature_locked INTEGER NOT NULL DEFAULT 0;",
    )?;

    set_schema_version(&tx, 3)?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_names(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .unwrap();
        stmt.query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .collect::<SqliteResult<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn fresh_database_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_schema_version(&conn), 0);
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);

        let columns = column_names(&conn, "flights");
        assert!(columns.contains(&"night_full_stop_landings".to_string()));
        assert!(columns.contains(&"remarks".to_string()));
        assert!(columns.contains(&"is_signature_locked".to_string()));
        assert!(columns.contains(&"duration_tach".to_string()));
    }

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn v1_database_is_upgraded() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        conn.execute(
            "INSERT INTO flights (id, date, duration_hours) VALUES ('a', '2025-01-01', 1.0)",
            [],
        )
        .unwrap();

        migrate(&conn).unwrap();
        let (remarks, locked, signature): (String, bool, Option<String>) = conn
            .query_row(
                "SELECT remarks, is_signature_locked, instructor_signature FROM flights WHERE id = 'a'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(remarks, "");
        assert!(!locked);
        assert!(signature.is_none());
        assert_eq!(get_schema_version(&conn), 3);
    }
}
