//! # SoloTrack Core Library
//!
//! Core logic for SoloTrack, a logbook companion for student pilots working
//! toward a private pilot certificate. Everything is usable through the
//! standalone `solotrack` CLI; any GUI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Currency**: day and night passenger-carrying currency from the flight
//!   log, with a caution band ahead of expiry
//! - **Training**: progress against the private pilot hour requirements
//! - **Notifications**: detect → score → rate limit → dispatch, with all
//!   delivery state behind a pluggable store
//! - **Storage**: SQLite flight log and key-value state, TOML configuration
//!
//! ## Key Components
//!
//! - [`CurrencyEngine`]: Pure currency computation
//! - [`NotificationService`]: The notification pipeline
//! - [`Database`]: Flight and state persistence
//! - [`Config`]: Application configuration management

pub mod currency;
pub mod error;
pub mod flight;
pub mod notifications;
pub mod storage;
pub mod training;

pub use currency::{CurrencyConfig, CurrencyEngine, CurrencyKind, CurrencyState, CurrencyStatus};
pub use error::{ConfigError, CoreError, DatabaseError, DispatchError, ValidationError};
pub use flight::FlightRecord;
pub use notifications::{
    AlertGroup, Dispatcher, MemoryStore, NotificationEvent, NotificationPreferences,
    NotificationService, OutgoingNotification, PreferenceStore, RateLimitDecision, ScoredEvent,
};
pub use storage::{Config, Database};
pub use training::{Requirement, RequirementSummary, TrainingStage};
