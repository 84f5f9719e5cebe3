//! Run configuration.
//!
//! Stored as a plain JSON object on disk:
//! ```json
//! {
//!   "period_strategy": "fixed",
//!   "compliance_rule": "single_admissible",
//!   "analysis_start": "2025-06-16",
//!   "analysis_end": "2025-07-13"
//! }
//! ```
//! `period_strategy` and `compliance_rule` have no defaults: every run names
//! the protocol it is scored under. Everything else falls back to the
//! published programme values.

use crate::analyzers::rule::{RuleKind, Thresholds};
use crate::error::ConfigError;
use crate::periods::PeriodStrategy;
use crate::schema::RegistrySchema;
use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_RATE_PER_ACRE: f64 = 300.0;
pub const DEFAULT_UPPER_THRESHOLD_MM: f64 = 200.0;
pub const DEFAULT_LOWER_THRESHOLD_MM: f64 = 100.0;
pub const DEFAULT_MIN_GAP_DAYS: i64 = 3;

/// What to do with farms whose study-participation flag is negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationPolicy {
    /// Remove non-participants before classification; they never reach group tallies.
    DropBeforeClassification,
    /// Classify every row, then remove non-participants.
    #[default]
    ClassifyThenFilter,
    /// Do not consult the participation flag.
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub period_strategy: PeriodStrategy,
    pub compliance_rule: RuleKind,
    #[serde(default = "default_rate")]
    pub rate_per_acre: f64,
    #[serde(default = "default_upper")]
    pub upper_threshold_mm: f64,
    #[serde(default = "default_lower")]
    pub lower_threshold_mm: f64,
    #[serde(default = "default_gap")]
    pub min_gap_days: i64,
    #[serde(default)]
    pub analysis_start: Option<NaiveDate>,
    #[serde(default)]
    pub analysis_end: Option<NaiveDate>,
    /// Fixed-calendar week numbers to keep; empty keeps all.
    #[serde(default)]
    pub weeks: Vec<u32>,
    #[serde(default)]
    pub participation: ParticipationPolicy,
    /// Remove `*-Unassigned` and `NoGroupAssigned` farms from the working set.
    #[serde(default = "default_true")]
    pub drop_unassigned: bool,
    #[serde(default)]
    pub registry_schema: RegistrySchema,
}

fn default_rate() -> f64 {
    DEFAULT_RATE_PER_ACRE
}

fn default_upper() -> f64 {
    DEFAULT_UPPER_THRESHOLD_MM
}

fn default_lower() -> f64 {
    DEFAULT_LOWER_THRESHOLD_MM
}

fn default_gap() -> i64 {
    DEFAULT_MIN_GAP_DAYS
}

fn default_true() -> bool {
    true
}

impl EngineConfig {
    /// A config with programme defaults for everything but the two required choices.
    pub fn new(period_strategy: PeriodStrategy, compliance_rule: RuleKind) -> Self {
        Self {
            period_strategy,
            compliance_rule,
            rate_per_acre: DEFAULT_RATE_PER_ACRE,
            upper_threshold_mm: DEFAULT_UPPER_THRESHOLD_MM,
            lower_threshold_mm: DEFAULT_LOWER_THRESHOLD_MM,
            min_gap_days: DEFAULT_MIN_GAP_DAYS,
            analysis_start: None,
            analysis_end: None,
            weeks: Vec::new(),
            participation: ParticipationPolicy::default(),
            drop_unassigned: true,
            registry_schema: RegistrySchema::default(),
        }
    }

    pub fn with_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.analysis_start = Some(start);
        self.analysis_end = Some(end);
        self
    }

    /// Loads the config from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            upper_mm: self.upper_threshold_mm,
            lower_mm: self.lower_threshold_mm,
            min_gap_days: self.min_gap_days,
        }
    }

    /// Checks numeric settings and range ordering.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("rate_per_acre", self.rate_per_acre),
            ("upper_threshold_mm", self.upper_threshold_mm),
            ("lower_threshold_mm", self.lower_threshold_mm),
            ("min_gap_days", self.min_gap_days as f64),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidNumber { name, value });
            }
        }

        if let (Some(start), Some(end)) = (self.analysis_start, self.analysis_end) {
            if end < start {
                return Err(ConfigError::InvertedRange { start, end });
            }
        }
        Ok(())
    }
}
