//! SQLite-based flight log and state storage.
//!
//! Provides persistent storage for:
//! - Logged flights
//! - Key-value store for notification state

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{data_dir, migrations};
use crate::error::{DatabaseError, Result, ValidationError};
use crate::flight::FlightRecord;
use crate::notifications::preferences::{PrefKey, PreferenceStore};

const DATE_FORMAT: &str = "%Y-%m-%d";

const FLIGHT_COLUMNS: &str = "id, date, duration_hours, day_landings, night_full_stop_landings,
     is_solo, is_dual_received, is_cross_country, is_simulated_instrument,
     route_from, route_to, remarks, duration_tach,
     instructor_signature, cfi_number, signature_date, is_signature_locked";

/// SQLite database for the flight log.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/solotrack.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("solotrack.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self::from_connection(conn)?;
        tracing::info!(path = %path.display(), "opened flight log");
        Ok(db)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Store a new flight, signature included.
    ///
    /// # Errors
    /// Returns an error if the flight is invalid or the insert fails.
    pub fn insert_flight(&self, flight: &FlightRecord) -> Result<()> {
        flight.validate()?;
        self.conn.execute(
            &format!(
                "INSERT INTO flights ({FLIGHT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
            ),
            params![
                flight.id,
                flight.date.format(DATE_FORMAT).to_string(),
                flight.duration_hours,
                flight.day_landings,
                flight.night_full_stop_landings,
                flight.is_solo,
                flight.is_dual_received,
                flight.is_cross_country,
                flight.is_simulated_instrument,
                flight.route_from,
                flight.route_to,
                flight.remarks,
                flight.duration_tach,
                flight.instructor_signature,
                flight.cfi_number,
                flight.signature_date.map(|at| at.to_rfc3339()),
                flight.is_signature_locked,
            ],
        )?;
        tracing::debug!(id = %flight.id, date = %flight.date, "flight stored");
        Ok(())
    }

    /// Replace the logged details of the stored flight with the same id.
    ///
    /// Signature fields are left as stored; use [`Database::sign_flight`]
    /// and [`Database::void_signature`] for those.
    ///
    /// # Errors
    /// Returns [`DatabaseError::FlightNotFound`] if no such flight exists,
    /// [`ValidationError::SignatureLocked`] if the stored flight is signed, or
    /// an error if the flight is invalid or the update fails.
    pub fn update_flight(&self, flight: &FlightRecord) -> Result<()> {
        flight.validate()?;
        self.ensure_editable(&flight.id)?;
        let changed = self.conn.execute(
            "UPDATE flights SET
                date = ?2, duration_hours = ?3, day_landings = ?4, night_full_stop_landings = ?5,
                is_solo = ?6, is_dual_received = ?7, is_cross_country = ?8,
                is_simulated_instrument = ?9, route_from = ?10, route_to = ?11, remarks = ?12,
                duration_tach = ?13
             WHERE id = ?1",
            params![
                flight.id,
                flight.date.format(DATE_FORMAT).to_string(),
                flight.duration_hours,
                flight.day_landings,
                flight.night_full_stop_landings,
                flight.is_solo,
                flight.is_dual_received,
                flight.is_cross_country,
                flight.is_simulated_instrument,
                flight.route_from,
                flight.route_to,
                flight.remarks,
                flight.duration_tach,
            ],
        )?;
        if changed == 0 {
            return Err(DatabaseError::FlightNotFound(flight.id.clone()).into());
        }
        Ok(())
    }

    /// Void a flight.
    ///
    /// # Errors
    /// Returns [`DatabaseError::FlightNotFound`] if no such flight exists, or
    /// [`ValidationError::SignatureLocked`] if it is signed.
    pub fn delete_flight(&self, id: &str) -> Result<()> {
        self.ensure_editable(id)?;
        let changed = self
            .conn
            .execute("DELETE FROM flights WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(DatabaseError::FlightNotFound(id.to_string()).into());
        }
        Ok(())
    }

    /// Sign flight `id` as instructor `cfi` at `at` and return the locked entry.
    ///
    /// # Errors
    /// Returns [`DatabaseError::FlightNotFound`] if no such flight exists, or
    /// a validation error if it is already signed or the input is blank.
    pub fn sign_flight(
        &self,
        id: &str,
        signature: &str,
        cfi: &str,
        at: DateTime<Utc>,
    ) -> Result<FlightRecord> {
        let mut flight = self.require_flight(id)?;
        flight.lock_signature(signature, cfi, at)?;
        self.write_signature(&flight)?;
        tracing::info!(id, cfi = %flight.cfi_number, "flight signed");
        Ok(flight)
    }

    /// Remove the signature from flight `id`, unlocking it.
    ///
    /// # Errors
    /// Returns [`DatabaseError::FlightNotFound`] if no such flight exists.
    pub fn void_signature(&self, id: &str) -> Result<FlightRecord> {
        let mut flight = self.require_flight(id)?;
        flight.void_signature();
        self.write_signature(&flight)?;
        tracing::info!(id, "flight signature voided");
        Ok(flight)
    }

    fn write_signature(&self, flight: &FlightRecord) -> Result<()> {
        self.conn.execute(
            "UPDATE flights SET
                instructor_signature = ?2, cfi_number = ?3, signature_date = ?4,
                is_signature_locked = ?5
             WHERE id = ?1",
            params![
                flight.id,
                flight.instructor_signature,
                flight.cfi_number,
                flight.signature_date.map(|at| at.to_rfc3339()),
                flight.is_signature_locked,
            ],
        )?;
        Ok(())
    }

    fn require_flight(&self, id: &str) -> Result<FlightRecord> {
        self.get_flight(id)?
            .ok_or_else(|| DatabaseError::FlightNotFound(id.to_string()).into())
    }

    fn ensure_editable(&self, id: &str) -> Result<()> {
        let locked: Option<bool> = self
            .conn
            .query_row(
                "SELECT is_signature_locked FROM flights WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        match locked {
            None => Err(DatabaseError::FlightNotFound(id.to_string()).into()),
            Some(true) => Err(ValidationError::SignatureLocked(id.to_string()).into()),
            Some(false) => Ok(()),
        }
    }

    pub fn get_flight(&self, id: &str) -> Result<Option<FlightRecord>> {
        let flight = self
            .conn
            .query_row(
                &format!("SELECT {FLIGHT_COLUMNS} FROM flights WHERE id = ?1"),
                params![id],
                flight_from_row,
            )
            .optional()?;
        Ok(flight)
    }

    /// All flights, most recent first; same-date flights in logging order.
    pub fn list_flights(&self) -> Result<Vec<FlightRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FLIGHT_COLUMNS} FROM flights ORDER BY date DESC, rowid ASC"
        ))?;
        let flights = stmt
            .query_map([], flight_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(flights)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<(), rusqlite::Error> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

fn flight_from_row(row: &Row<'_>) -> rusqlite::Result<FlightRecord> {
    let date_str: String = row.get(1)?;
    let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    let signature_date = row
        .get::<_, Option<String>>(15)?
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|at| at.with_timezone(&Utc))
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(15, Type::Text, Box::new(e)))
        })
        .transpose()?;

    Ok(FlightRecord {
        id: row.get(0)?,
        date,
        duration_hours: row.get(2)?,
        day_landings: row.get(3)?,
        night_full_stop_landings: row.get(4)?,
        is_solo: row.get(5)?,
        is_dual_received: row.get(6)?,
        is_cross_country: row.get(7)?,
        is_simulated_instrument: row.get(8)?,
        route_from: row.get(9)?,
        route_to: row.get(10)?,
        remarks: row.get(11)?,
        duration_tach: row.get(12)?,
        instructor_signature: row.get(13)?,
        cfi_number: row.get(14)?,
        signature_date,
        is_signature_locked: row.get(16)?,
    })
}

impl PreferenceStore for Database {
    fn get(&self, key: &PrefKey) -> Result<Option<String>> {
        Ok(self.kv_get(&key.storage_key())?)
    }

    fn set(&mut self, key: &PrefKey, value: &str) -> Result<()> {
        Ok(self.kv_set(&key.storage_key(), value)?)
    }

    fn remove(&mut self, key: &PrefKey) -> Result<()> {
        Ok(self.kv_delete(&key.storage_key())?)
    }
}
