//! Notification commands for CLI.
//!
//! Delivered notifications are written to stdout as one JSON object per
//! line, so a desktop shim or cron wrapper can forward them.

use std::io::Write;

use chrono::{DateTime, Utc};
use clap::Subcommand;
use serde::Serialize;
use solotrack_core::notifications::AlertGroup;
use solotrack_core::{
    Config, Database, DispatchError, Dispatcher, FlightRecord, NotificationPreferences,
    NotificationService, OutgoingNotification, RateLimitDecision, ScoredEvent, TrainingStage,
};

#[derive(Subcommand)]
pub enum NotifyAction {
    /// Run the notification pipeline over the flight log
    Check {
        /// Evaluation time in RFC 3339 (default: now)
        #[arg(long)]
        now: Option<DateTime<Utc>>,
        /// Training stage override (pre_solo, post_solo, checkride_prep)
        #[arg(long)]
        stage: Option<TrainingStage>,
        /// Show candidates and gate decisions without sending or recording
        #[arg(long)]
        dry_run: bool,
    },
    /// Show notification preferences and delivery state
    Prefs,
    /// Turn an alert group on or off
    Set {
        /// Alert group
        group: AlertGroup,
        /// true or false
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// Clear all notification preferences and delivery state
    Reset,
}

/// Writes each notification to stdout as a JSON line.
pub struct JsonLineDispatcher;

impl Dispatcher for JsonLineDispatcher {
    fn dispatch(&mut self, notification: &OutgoingNotification) -> Result<(), DispatchError> {
        let line = serde_json::to_string(notification)
            .map_err(|e| DispatchError::Failed(e.to_string()))?;
        writeln!(std::io::stdout().lock(), "{line}")
            .map_err(|e| DispatchError::Failed(e.to_string()))
    }
}

#[derive(Serialize)]
struct PreviewLine<'a> {
    category: String,
    score: f64,
    title: &'a str,
    body: &'a str,
    decision: RateLimitDecision,
}

/// Run the pipeline over `flights` and print what gets delivered.
pub fn deliver(
    db: Database,
    flights: &[FlightRecord],
    stage: TrainingStage,
    now: DateTime<Utc>,
    config: &Config,
) -> Result<Vec<ScoredEvent>, Box<dyn std::error::Error>> {
    let mut service = NotificationService::with_config(db, JsonLineDispatcher, config);
    Ok(service.run(flights, stage, now)?)
}

pub fn run(action: NotifyAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        NotifyAction::Check {
            now,
            stage,
            dry_run,
        } => {
            let config = Config::load()?;
            let now = now.unwrap_or_else(Utc::now);
            let stage = stage.unwrap_or(config.profile.training_stage);
            let flights = db.list_flights()?;

            if dry_run {
                let service = NotificationService::with_config(db, JsonLineDispatcher, &config);
                for (scored, decision) in service.preview(&flights, stage, now) {
                    let line = PreviewLine {
                        category: scored.event.category().to_string(),
                        score: scored.score,
                        title: &scored.title,
                        body: &scored.body,
                        decision,
                    };
                    println!("{}", serde_json::to_string(&line)?);
                }
            } else {
                let delivered = deliver(db, &flights, stage, now, &config)?;
                tracing::debug!(count = delivered.len(), "notify check finished");
            }
        }
        NotifyAction::Prefs => {
            let prefs = NotificationPreferences::new(db);
            println!("{}", serde_json::to_string_pretty(&prefs.snapshot(Utc::now()))?);
        }
        NotifyAction::Set { group, enabled } => {
            let mut prefs = NotificationPreferences::new(db);
            prefs.set_alerts_enabled(group, enabled)?;
            println!("{group} alerts {}", if enabled { "enabled" } else { "disabled" });
        }
        NotifyAction::Reset => {
            let mut prefs = NotificationPreferences::new(db);
            prefs.reset()?;
            println!("notification state reset");
        }
    }
    Ok(())
}
