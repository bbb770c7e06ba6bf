//! Flight log commands for CLI.

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use solotrack_core::{Config, Database, FlightRecord};

use super::notify;

#[derive(Subcommand)]
pub enum FlightAction {
    /// Log a flight, then check for notifications
    Add {
        /// Flight date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        /// Flight time in hours (Hobbs)
        #[arg(long)]
        hours: f64,
        /// Tach time in hours
        #[arg(long, default_value = "0")]
        tach: f64,
        /// Day landings
        #[arg(long, default_value = "0")]
        day_landings: u32,
        /// Night full-stop landings
        #[arg(long, default_value = "0")]
        night_landings: u32,
        /// Solo flight (default depends on the training stage)
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        solo: Option<bool>,
        /// Dual instruction received (default depends on the training stage)
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        dual: Option<bool>,
        /// Cross-country flight
        #[arg(long)]
        xc: bool,
        /// Simulated instrument time
        #[arg(long)]
        instrument: bool,
        /// Departure airport identifier
        #[arg(long)]
        from: Option<String>,
        /// Arrival airport identifier
        #[arg(long)]
        to: Option<String>,
        /// Free-form remarks
        #[arg(long)]
        remarks: Option<String>,
    },
    /// List logged flights, most recent first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a logged flight
    Edit {
        /// Flight ID
        id: String,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        hours: Option<f64>,
        #[arg(long)]
        tach: Option<f64>,
        #[arg(long)]
        day_landings: Option<u32>,
        #[arg(long)]
        night_landings: Option<u32>,
        #[arg(long)]
        solo: Option<bool>,
        #[arg(long)]
        dual: Option<bool>,
        #[arg(long)]
        xc: Option<bool>,
        #[arg(long)]
        instrument: Option<bool>,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        remarks: Option<String>,
    },
    /// Void a logged flight
    Remove {
        /// Flight ID
        id: String,
    },
    /// Record an instructor signature, locking the flight
    Sign {
        /// Flight ID
        id: String,
        /// Instructor certificate number
        #[arg(long)]
        cfi: String,
        /// Instructor signature (name as signed)
        #[arg(long)]
        signature: String,
    },
    /// Void the instructor signature, unlocking the flight
    Unsign {
        /// Flight ID
        id: String,
    },
}

pub fn run(action: FlightAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        FlightAction::Add {
            date,
            hours,
            tach,
            day_landings,
            night_landings,
            solo,
            dual,
            xc,
            instrument,
            from,
            to,
            remarks,
        } => {
            let config = Config::load()?;
            let stage = config.profile.training_stage;
            let flight = FlightRecord {
                duration_hours: hours,
                duration_tach: tach,
                day_landings,
                night_full_stop_landings: night_landings,
                is_solo: solo.unwrap_or_else(|| stage.default_is_solo()),
                is_dual_received: dual.unwrap_or_else(|| stage.default_is_dual_received()),
                is_cross_country: xc,
                is_simulated_instrument: instrument,
                route_from: from.unwrap_or_default(),
                route_to: to.unwrap_or_default(),
                remarks: remarks.unwrap_or_default(),
                ..FlightRecord::new(date)
            };
            db.insert_flight(&flight)?;
            println!("Flight logged: {}", flight.id);
            after_save(db, &config)?;
        }
        FlightAction::List { json } => {
            let flights = db.list_flights()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&flights)?);
            } else if flights.is_empty() {
                println!("No flights logged.");
            } else {
                for f in &flights {
                    let signed = if f.is_signature_locked {
                        format!("  signed {}", f.cfi_number)
                    } else {
                        String::new()
                    };
                    println!(
                        "{}  {:>4.1}h  {:<16}  {:<16}  {}{}",
                        f.date,
                        f.duration_hours,
                        f.formatted_route(),
                        f.category_tags().join(","),
                        f.id,
                        signed
                    );
                }
            }
        }
        FlightAction::Edit {
            id,
            date,
            hours,
            tach,
            day_landings,
            night_landings,
            solo,
            dual,
            xc,
            instrument,
            from,
            to,
            remarks,
        } => {
            let mut flight = db
                .get_flight(&id)?
                .ok_or_else(|| format!("flight not found: {id}"))?;

            if let Some(v) = date {
                flight.date = v;
            }
            if let Some(v) = hours {
                flight.duration_hours = v;
            }
            if let Some(v) = tach {
                flight.duration_tach = v;
            }
            if let Some(v) = day_landings {
                flight.day_landings = v;
            }
            if let Some(v) = night_landings {
                flight.night_full_stop_landings = v;
            }
            if let Some(v) = solo {
                flight.is_solo = v;
            }
            if let Some(v) = dual {
                flight.is_dual_received = v;
            }
            if let Some(v) = xc {
                flight.is_cross_country = v;
            }
            if let Some(v) = instrument {
                flight.is_simulated_instrument = v;
            }
            if let Some(v) = from {
                flight.route_from = v;
            }
            if let Some(v) = to {
                flight.route_to = v;
            }
            if let Some(v) = remarks {
                flight.remarks = v;
            }

            db.update_flight(&flight)?;
            println!("Flight updated: {id}");
            after_save(db, &Config::load()?)?;
        }
        FlightAction::Remove { id } => {
            db.delete_flight(&id)?;
            println!("Flight removed: {id}");
        }
        FlightAction::Sign { id, cfi, signature } => {
            let flight = db.sign_flight(&id, &signature, &cfi, Utc::now())?;
            println!("Flight signed: {id} (CFI {})", flight.cfi_number);
        }
        FlightAction::Unsign { id } => {
            db.void_signature(&id)?;
            println!("Signature voided: {id}");
        }
    }
    Ok(())
}

/// Saving a flight is one of the pipeline's trigger points.
fn after_save(db: Database, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let flights = db.list_flights()?;
    notify::deliver(
        db,
        &flights,
        config.profile.training_stage,
        Utc::now(),
        config,
    )?;
    Ok(())
}
