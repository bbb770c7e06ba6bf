//! Logbook flight entries.
//!
//! A [`FlightRecord`] is what the pilot logs. The currency engine and the
//! notification evaluator only read records; creating, editing and voiding
//! them belongs to the store ([`crate::storage::Database`]).
//!
//! An instructor signature locks the entry: a locked flight cannot be edited
//! or removed until the signature is voided.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// A single logged flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    /// Unique ID for this entry
    pub id: String,

    /// Calendar date of the flight
    pub date: NaiveDate,

    /// Logged flight time from the Hobbs meter (hours)
    pub duration_hours: f64,

    /// Tachometer time (hours). Informational; requirements use Hobbs time.
    #[serde(default)]
    pub duration_tach: f64,

    /// Day takeoffs and landings
    pub day_landings: u32,

    /// Night full-stop landings
    pub night_full_stop_landings: u32,

    pub is_solo: bool,
    pub is_dual_received: bool,
    pub is_cross_country: bool,
    pub is_simulated_instrument: bool,

    /// Departure identifier (may be empty)
    #[serde(default)]
    pub route_from: String,

    /// Destination identifier (may be empty)
    #[serde(default)]
    pub route_to: String,

    #[serde(default)]
    pub remarks: String,

    /// Instructor's signature, as entered when signing
    #[serde(default)]
    pub instructor_signature: Option<String>,

    /// Instructor certificate number
    #[serde(default)]
    pub cfi_number: String,

    #[serde(default)]
    pub signature_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub is_signature_locked: bool,
}

impl FlightRecord {
    /// Create an entry dated `date` with a fresh id, no time and no landings.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            date,
            duration_hours: 0.0,
            duration_tach: 0.0,
            day_landings: 0,
            night_full_stop_landings: 0,
            is_solo: false,
            is_dual_received: false,
            is_cross_country: false,
            is_simulated_instrument: false,
            route_from: String::new(),
            route_to: String::new(),
            remarks: String::new(),
            instructor_signature: None,
            cfi_number: String::new(),
            signature_date: None,
            is_signature_locked: false,
        }
    }

    pub fn with_duration(mut self, hours: f64) -> Self {
        self.duration_hours = hours;
        self
    }

    pub fn with_tach(mut self, hours: f64) -> Self {
        self.duration_tach = hours;
        self
    }

    pub fn with_landings(mut self, day: u32, night_full_stop: u32) -> Self {
        self.day_landings = day;
        self.night_full_stop_landings = night_full_stop;
        self
    }

    pub fn solo(mut self) -> Self {
        self.is_solo = true;
        self
    }

    pub fn dual(mut self) -> Self {
        self.is_dual_received = true;
        self
    }

    pub fn cross_country(mut self) -> Self {
        self.is_cross_country = true;
        self
    }

    pub fn simulated_instrument(mut self) -> Self {
        self.is_simulated_instrument = true;
        self
    }

    pub fn with_route(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.route_from = from.into();
        self.route_to = to.into();
        self
    }

    pub fn total_landings(&self) -> u32 {
        self.day_landings.saturating_add(self.night_full_stop_landings)
    }

    /// Signed, with a certificate number and a date.
    pub fn has_valid_signature(&self) -> bool {
        self.instructor_signature.is_some()
            && !self.cfi_number.is_empty()
            && self.signature_date.is_some()
    }

    pub fn is_editable(&self) -> bool {
        !self.is_signature_locked
    }

    /// Sign the entry as instructor `cfi` at `at`, locking it.
    ///
    /// # Errors
    /// Returns an error if the entry is already locked, or the signature or
    /// certificate number is blank.
    pub fn lock_signature(
        &mut self,
        signature: &str,
        cfi: &str,
        at: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        if self.is_signature_locked {
            return Err(ValidationError::SignatureLocked(self.id.clone()));
        }
        let signature = signature.trim();
        let cfi = cfi.trim();
        if signature.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "instructor_signature".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if cfi.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "cfi_number".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        self.instructor_signature = Some(signature.to_string());
        self.cfi_number = cfi.to_string();
        self.signature_date = Some(at);
        self.is_signature_locked = true;
        Ok(())
    }

    /// Remove the signature and unlock the entry.
    pub fn void_signature(&mut self) {
        self.instructor_signature = None;
        self.cfi_number.clear();
        self.signature_date = None;
        self.is_signature_locked = false;
    }

    /// "KPAO → KSQL", a single upper-cased identifier, or "Local".
    pub fn formatted_route(&self) -> String {
        let from = self.route_from.trim().to_uppercase();
        let to = self.route_to.trim().to_uppercase();
        match (from.is_empty(), to.is_empty()) {
            (true, true) => "Local".to_string(),
            (true, false) => to,
            (false, true) => from,
            (false, false) => format!("{from} → {to}"),
        }
    }

    /// Short tags for the category flags that are set.
    pub fn category_tags(&self) -> Vec<&'static str> {
        let mut tags = Vec::new();
        if self.is_solo {
            tags.push("Solo");
        }
        if self.is_dual_received {
            tags.push("Dual");
        }
        if self.is_cross_country {
            tags.push("XC");
        }
        if self.is_simulated_instrument {
            tags.push("Inst");
        }
        tags
    }

    /// Check the entry before it is written to the store.
    ///
    /// Contradictory category flags are accepted; only the durations are
    /// checked.
    ///
    /// # Errors
    /// Returns an error if a duration is negative or not a finite number.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_duration("duration_hours", self.duration_hours)?;
        check_duration("duration_tach", self.duration_tach)
    }
}

fn check_duration(field: &str, hours: f64) -> Result<(), ValidationError> {
    if !hours.is_finite() || hours < 0.0 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("must be a finite number >= 0, got {hours}"),
        });
    }
    Ok(())
}
