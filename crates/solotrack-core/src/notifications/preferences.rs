//! Persisted notification preferences and rate-limit state.
//!
//! State is read and written through the [`PreferenceStore`] interface, keyed
//! by [`PrefKey`]. [`crate::storage::Database`] implements it on SQLite and
//! [`MemoryStore`] in memory.
//!
//! Reads never fail: absent keys, malformed values and store errors all fall
//! back to the documented defaults (opt-ins on, counters zero, sets empty,
//! flags off). Writes return errors so a host can surface a failed save.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::cooldown::is_same_calendar_day;
use super::event::NotificationCategory;
use crate::error::{Result, ValidationError};

/// Prefix shared by every persisted notification key.
pub const KEY_PREFIX: &str = "notif_";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Typed key into the preference store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefKey {
    AlertsEnabled(AlertGroup),
    LastSent(NotificationCategory),
    GlobalLastSent,
    DailyCount,
    DailyCountDate,
    AcknowledgedMilestones,
    CheckrideReadyNotified,
}

impl PrefKey {
    /// Key under which the value is stored.
    pub fn storage_key(&self) -> String {
        match self {
            PrefKey::AlertsEnabled(group) => format!("{KEY_PREFIX}{}_alerts", group.as_str()),
            PrefKey::LastSent(category) => format!("{KEY_PREFIX}last_sent_{}", category.as_str()),
            PrefKey::GlobalLastSent => format!("{KEY_PREFIX}global_last_sent"),
            PrefKey::DailyCount => format!("{KEY_PREFIX}daily_count"),
            PrefKey::DailyCountDate => format!("{KEY_PREFIX}daily_count_date"),
            PrefKey::AcknowledgedMilestones => format!("{KEY_PREFIX}acknowledged_milestones"),
            PrefKey::CheckrideReadyNotified => format!("{KEY_PREFIX}checkride_ready_notified"),
        }
    }

    /// Every key the notification state uses.
    pub fn all() -> Vec<PrefKey> {
        let mut keys: Vec<PrefKey> = AlertGroup::ALL.into_iter().map(PrefKey::AlertsEnabled).collect();
        keys.extend(NotificationCategory::ALL.into_iter().map(PrefKey::LastSent));
        keys.extend([
            PrefKey::GlobalLastSent,
            PrefKey::DailyCount,
            PrefKey::DailyCountDate,
            PrefKey::AcknowledgedMilestones,
            PrefKey::CheckrideReadyNotified,
        ]);
        keys
    }
}

/// Key-value interface over the persisted state.
pub trait PreferenceStore {
    fn get(&self, key: &PrefKey) -> Result<Option<String>>;

    fn set(&mut self, key: &PrefKey, value: &str) -> Result<()>;

    fn remove(&mut self, key: &PrefKey) -> Result<()>;
}

impl<S: PreferenceStore + ?Sized> PreferenceStore for &mut S {
    fn get(&self, key: &PrefKey) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &PrefKey, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &PrefKey) -> Result<()> {
        (**self).remove(key)
    }
}

/// In-memory store for tests and hosts without persistence.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &PrefKey) -> Result<Option<String>> {
        Ok(self.values.get(&key.storage_key()).cloned())
    }

    fn set(&mut self, key: &PrefKey, value: &str) -> Result<()> {
        self.values.insert(key.storage_key(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &PrefKey) -> Result<()> {
        self.values.remove(&key.storage_key());
        Ok(())
    }
}

/// User-facing opt-in switch. Each notification category is governed by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertGroup {
    Currency,
    Milestone,
    Momentum,
}

impl AlertGroup {
    pub const ALL: [AlertGroup; 3] = [AlertGroup::Currency, AlertGroup::Milestone, AlertGroup::Momentum];

    pub fn as_str(self) -> &'static str {
        match self {
            AlertGroup::Currency => "currency",
            AlertGroup::Milestone => "milestone",
            AlertGroup::Momentum => "momentum",
        }
    }

    /// Milestone and checkride-ready share the milestone switch.
    pub fn for_category(category: NotificationCategory) -> Self {
        match category {
            NotificationCategory::CurrencyCliff => AlertGroup::Currency,
            NotificationCategory::MilestoneCrossed | NotificationCategory::CheckrideReady => {
                AlertGroup::Milestone
            }
            NotificationCategory::MomentumStall => AlertGroup::Momentum,
        }
    }
}

impl fmt::Display for AlertGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertGroup {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        AlertGroup::ALL
            .into_iter()
            .find(|group| group.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "alert group".to_string(),
                message: format!("unknown group '{s}' (expected currency, milestone or momentum)"),
            })
    }
}

/// Read-only view of the persisted state, for display.
#[derive(Debug, Clone, Serialize)]
pub struct PreferencesSnapshot {
    pub currency_alerts: bool,
    pub milestone_alerts: bool,
    pub momentum_alerts: bool,
    pub last_sent: Vec<(NotificationCategory, DateTime<Utc>)>,
    pub global_last_sent: Option<DateTime<Utc>>,
    pub sent_today: u32,
    pub acknowledged_milestones: BTreeSet<String>,
    pub checkride_ready_notified: bool,
}

/// Typed accessors over a [`PreferenceStore`].
#[derive(Debug, Clone, Default)]
pub struct NotificationPreferences<S> {
    store: S,
}

impl<S: PreferenceStore> NotificationPreferences<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn read(&self, key: &PrefKey) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key.storage_key(), error = %e, "preference read failed, using default");
                None
            }
        }
    }

    fn read_parsed<T>(&self, key: &PrefKey, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
        let raw = self.read(key)?;
        let parsed = parse(raw.trim());
        if parsed.is_none() {
            tracing::warn!(key = %key.storage_key(), value = %raw, "malformed preference value, using default");
        }
        parsed
    }

    fn read_bool(&self, key: &PrefKey, default: bool) -> bool {
        self.read_parsed(key, |s| s.parse::<bool>().ok())
            .unwrap_or(default)
    }

    fn read_timestamp(&self, key: &PrefKey) -> Option<DateTime<Utc>> {
        self.read_parsed(key, |s| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
    }

    fn write_timestamp(&mut self, key: &PrefKey, at: DateTime<Utc>) -> Result<()> {
        self.store.set(key, &at.to_rfc3339())
    }

    // Opt-in flags

    pub fn alerts_enabled(&self, group: AlertGroup) -> bool {
        self.read_bool(&PrefKey::AlertsEnabled(group), true)
    }

    pub fn set_alerts_enabled(&mut self, group: AlertGroup, enabled: bool) -> Result<()> {
        self.store
            .set(&PrefKey::AlertsEnabled(group), if enabled { "true" } else { "false" })
    }

    /// Whether the opt-in governing `category` is on.
    pub fn category_enabled(&self, category: NotificationCategory) -> bool {
        self.alerts_enabled(AlertGroup::for_category(category))
    }

    // Cooldown tracking

    pub fn last_sent(&self, category: NotificationCategory) -> Option<DateTime<Utc>> {
        self.read_timestamp(&PrefKey::LastSent(category))
    }

    pub fn record_sent(&mut self, category: NotificationCategory, at: DateTime<Utc>) -> Result<()> {
        self.write_timestamp(&PrefKey::LastSent(category), at)
    }

    pub fn global_last_sent(&self) -> Option<DateTime<Utc>> {
        self.read_timestamp(&PrefKey::GlobalLastSent)
    }

    pub fn set_global_last_sent(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.write_timestamp(&PrefKey::GlobalLastSent, at)
    }

    /// Notifications delivered on the calendar day of `now`.
    pub fn notifications_sent_today(&self, now: DateTime<Utc>) -> u32 {
        let Some(stored_date) = self.read_parsed(&PrefKey::DailyCountDate, |s| {
            NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
        }) else {
            return 0;
        };
        if !is_same_calendar_day(stored_date, now) {
            return 0;
        }
        self.read_parsed(&PrefKey::DailyCount, |s| s.parse::<u32>().ok())
            .unwrap_or(0)
    }

    /// Count one delivery on `now`'s day, restarting at 1 on a new day.
    pub fn increment_daily_count(&mut self, now: DateTime<Utc>) -> Result<()> {
        let next = self.notifications_sent_today(now).saturating_add(1);
        self.store.set(
            &PrefKey::DailyCountDate,
            &now.date_naive().format(DATE_FORMAT).to_string(),
        )?;
        self.store.set(&PrefKey::DailyCount, &next.to_string())
    }

    // One-time markers

    pub fn acknowledged_milestones(&self) -> BTreeSet<String> {
        self.read_parsed(&PrefKey::AcknowledgedMilestones, |s| {
            serde_json::from_str::<BTreeSet<String>>(s).ok()
        })
        .unwrap_or_default()
    }

    pub fn is_milestone_acknowledged(&self, key: &str) -> bool {
        self.acknowledged_milestones().contains(key)
    }

    pub fn acknowledge_milestone(&mut self, key: &str) -> Result<()> {
        let mut milestones = self.acknowledged_milestones();
        if !milestones.insert(key.to_string()) {
            return Ok(());
        }
        let encoded = serde_json::to_string(&milestones)?;
        self.store.set(&PrefKey::AcknowledgedMilestones, &encoded)
    }

    pub fn checkride_ready_notified(&self) -> bool {
        self.read_bool(&PrefKey::CheckrideReadyNotified, false)
    }

    pub fn mark_checkride_ready_notified(&mut self) -> Result<()> {
        self.store.set(&PrefKey::CheckrideReadyNotified, "true")
    }

    /// Host-level reset: forget every opt-in, counter and marker.
    pub fn reset(&mut self) -> Result<()> {
        for key in PrefKey::all() {
            self.store.remove(&key)?;
        }
        Ok(())
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> PreferencesSnapshot {
        PreferencesSnapshot {
            currency_alerts: self.alerts_enabled(AlertGroup::Currency),
            milestone_alerts: self.alerts_enabled(AlertGroup::Milestone),
            momentum_alerts: self.alerts_enabled(AlertGroup::Momentum),
            last_sent: NotificationCategory::ALL
                .into_iter()
                .filter_map(|c| self.last_sent(c).map(|at| (c, at)))
                .collect(),
            global_last_sent: self.global_last_sent(),
            sent_today: self.notifications_sent_today(now),
            acknowledged_milestones: self.acknowledged_milestones(),
            checkride_ready_notified: self.checkride_ready_notified(),
        }
    }
}
