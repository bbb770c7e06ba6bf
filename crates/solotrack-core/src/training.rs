//! Training stage persona and private-pilot hour requirements.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::flight::FlightRecord;

/// Where the student is in training. Biases notification scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStage {
    #[default]
    PreSolo,
    PostSolo,
    CheckridePrep,
}

impl TrainingStage {
    pub const ALL: [TrainingStage; 3] = [
        TrainingStage::PreSolo,
        TrainingStage::PostSolo,
        TrainingStage::CheckridePrep,
    ];

    /// Stable storage key.
    pub fn as_str(self) -> &'static str {
        match self {
            TrainingStage::PreSolo => "pre_solo",
            TrainingStage::PostSolo => "post_solo",
            TrainingStage::CheckridePrep => "checkride_prep",
        }
    }

    /// Whether a newly logged flight starts out marked solo.
    pub fn default_is_solo(self) -> bool {
        match self {
            TrainingStage::PreSolo => false,
            TrainingStage::PostSolo | TrainingStage::CheckridePrep => true,
        }
    }

    /// Whether a newly logged flight starts out marked dual received.
    pub fn default_is_dual_received(self) -> bool {
        !self.default_is_solo()
    }

    pub fn display_title(self) -> &'static str {
        match self {
            TrainingStage::PreSolo => "Pre-Solo",
            TrainingStage::PostSolo => "Post-Solo",
            TrainingStage::CheckridePrep => "Checkride Prep",
        }
    }
}

impl fmt::Display for TrainingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrainingStage {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        TrainingStage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| ValidationError::UnknownTrainingStage(s.to_string()))
    }
}

/// An accumulated-hours requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    /// Stable key (regulation paragraph), used to remember acknowledged milestones
    pub key: String,
    pub title: String,
    pub goal_hours: f64,
    pub logged_hours: f64,
}

impl Requirement {
    /// Fraction complete, capped at 1.0.
    pub fn progress(&self) -> f64 {
        if self.goal_hours <= 0.0 {
            return 1.0;
        }
        (self.logged_hours / self.goal_hours).min(1.0)
    }

    pub fn percent_complete(&self) -> u32 {
        (self.progress() * 100.0) as u32
    }

    pub fn is_met(&self) -> bool {
        self.logged_hours >= self.goal_hours
    }

    pub fn remaining_hours(&self) -> f64 {
        round_to_tenths(self.goal_hours - self.logged_hours).max(0.0)
    }

    pub fn formatted_progress(&self) -> String {
        format!("{:.1} / {:.1} hours", self.logged_hours, self.goal_hours)
    }
}

/// Sums logged hours per category against FAR 61.109 minimums.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequirementSummary;

impl RequirementSummary {
    pub fn new() -> Self {
        Self
    }

    /// Requirements in display order.
    pub fn compute(&self, flights: &[FlightRecord]) -> Vec<Requirement> {
        vec![
            requirement("61.109(a)", "Total Flight Time", 40.0, hours_where(flights, |_| true)),
            requirement(
                "61.109(a)(1)",
                "Dual Instruction",
                20.0,
                hours_where(flights, |f| f.is_dual_received),
            ),
            requirement("61.109(a)(2)", "Solo Flight", 10.0, hours_where(flights, |f| f.is_solo)),
            requirement(
                "61.109(a)(2)(i)",
                "Solo Cross-Country",
                5.0,
                hours_where(flights, |f| f.is_solo && f.is_cross_country),
            ),
            requirement(
                "61.109(a)(2)(ii)",
                "Night Training",
                3.0,
                hours_where(flights, |f| f.night_full_stop_landings > 0),
            ),
            requirement(
                "61.109(a)(3)",
                "Instrument Training",
                3.0,
                hours_where(flights, |f| f.is_simulated_instrument),
            ),
        ]
    }

    pub fn requirements_met(&self, flights: &[FlightRecord]) -> usize {
        self.compute(flights).iter().filter(|r| r.is_met()).count()
    }

    pub fn total_requirements(&self) -> usize {
        6
    }

    /// Mean progress across all requirements (0.0 - 1.0).
    pub fn overall_progress(&self, flights: &[FlightRecord]) -> f64 {
        let requirements = self.compute(flights);
        requirements.iter().map(Requirement::progress).sum::<f64>() / requirements.len() as f64
    }
}

/// Logged hours are kept to the tenth, as a Hobbs meter reads.
fn hours_where(flights: &[FlightRecord], pred: impl Fn(&FlightRecord) -> bool) -> f64 {
    let total: f64 = flights
        .iter()
        .filter(|&f| pred(f))
        .map(|f| f.duration_hours)
        .sum();
    round_to_tenths(total)
}

fn round_to_tenths(hours: f64) -> f64 {
    (hours * 10.0).round() / 10.0
}

fn requirement(key: &str, title: &str, goal_hours: f64, logged_hours: f64) -> Requirement {
    Requirement {
        key: key.to_string(),
        title: title.to_string(),
        goal_hours,
        logged_hours,
    }
}
