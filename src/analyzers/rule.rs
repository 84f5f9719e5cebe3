//! Pipe compliance rules.
//!
//! The AWD protocol changed during the programme; each version is kept as its
//! own [`PipeRule`] so historical payments can be reproduced exactly. Rules
//! are pure: they see one pipe's readings for one period and nothing else.

use crate::config::{DEFAULT_LOWER_THRESHOLD_MM, DEFAULT_MIN_GAP_DAYS, DEFAULT_UPPER_THRESHOLD_MM};
use crate::readings::Reading;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Water-level limits shared by every rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Every reading must be at or below this.
    pub upper_mm: f64,
    /// At least one reading must be at or below this.
    pub lower_mm: f64,
    pub min_gap_days: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            upper_mm: DEFAULT_UPPER_THRESHOLD_MM,
            lower_mm: DEFAULT_LOWER_THRESHOLD_MM,
            min_gap_days: DEFAULT_MIN_GAP_DAYS,
        }
    }
}

/// One failed sub-condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    NoReadings,
    MissingSecondVisit,
    InsufficientReadings { count: usize },
    ExceedsUpper { max_mm: f64, limit_mm: f64 },
    NoReadingAtOrBelowLower { min_mm: f64, limit_mm: f64 },
    GapTooShort { gap_days: i64, min_days: i64 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::NoReadings => f.write_str("no readings"),
            Violation::MissingSecondVisit => f.write_str("missing 2nd visit"),
            Violation::InsufficientReadings { .. } => f.write_str("insufficient readings"),
            Violation::ExceedsUpper { limit_mm, .. } => {
                write!(f, "reading exceeds {limit_mm}mm")
            }
            Violation::NoReadingAtOrBelowLower { limit_mm, .. } => {
                write!(f, "no reading ≤{limit_mm}mm")
            }
            Violation::GapTooShort { gap_days, min_days } => {
                write!(f, "gap too short ({gap_days}d < {min_days}d)")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub compliant: bool,
    pub violations: Vec<Violation>,
    pub reading_count: usize,
    /// Whole days between earliest and latest reading, when there are two or more.
    pub gap_days: Option<i64>,
}

impl Verdict {
    fn from_violations(readings: &[Reading], violations: Vec<Violation>) -> Self {
        Self {
            compliant: violations.is_empty(),
            violations,
            reading_count: readings.len(),
            gap_days: gap_days(readings),
        }
    }
}

/// A versioned compliance rule for a single pipe in a single period.
pub trait PipeRule: Send + Sync + fmt::Debug {
    fn kind(&self) -> RuleKind;

    /// Readings needed before the pipe counts toward the farm's denominator.
    fn min_readings(&self) -> usize;

    fn evaluate(&self, readings: &[Reading]) -> Verdict;
}

fn gap_days(readings: &[Reading]) -> Option<i64> {
    if readings.len() < 2 {
        return None;
    }
    let first = readings.iter().map(|r| r.timestamp).min()?;
    let last = readings.iter().map(|r| r.timestamp).max()?;
    Some((last - first).num_days())
}

/// "All ≤ upper" and "at least one ≤ lower".
fn level_violations(readings: &[Reading], t: &Thresholds) -> Vec<Violation> {
    let mut violations = Vec::new();
    let max = readings
        .iter()
        .map(|r| r.water_level_mm)
        .fold(f64::NEG_INFINITY, f64::max);
    let min = readings
        .iter()
        .map(|r| r.water_level_mm)
        .fold(f64::INFINITY, f64::min);

    if max > t.upper_mm {
        violations.push(Violation::ExceedsUpper {
            max_mm: max,
            limit_mm: t.upper_mm,
        });
    }
    if min > t.lower_mm {
        violations.push(Violation::NoReadingAtOrBelowLower {
            min_mm: min,
            limit_mm: t.lower_mm,
        });
    }
    violations
}

fn too_few(count: usize) -> Violation {
    if count == 1 {
        Violation::MissingSecondVisit
    } else {
        Violation::InsufficientReadings { count }
    }
}

/// Two visits, both levels in range, at least `min_gap_days` apart.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoMeasurementRule {
    pub thresholds: Thresholds,
}

impl PipeRule for TwoMeasurementRule {
    fn kind(&self) -> RuleKind {
        RuleKind::TwoMeasurement
    }

    fn min_readings(&self) -> usize {
        2
    }

    fn evaluate(&self, readings: &[Reading]) -> Verdict {
        if readings.len() < 2 {
            return Verdict::from_violations(readings, vec![too_few(readings.len())]);
        }
        let mut violations = level_violations(readings, &self.thresholds);
        if let Some(gap) = gap_days(readings) {
            if gap < self.thresholds.min_gap_days {
                violations.push(Violation::GapTooShort {
                    gap_days: gap,
                    min_days: self.thresholds.min_gap_days,
                });
            }
        }
        Verdict::from_violations(readings, violations)
    }
}

/// Two visits with levels in range; spacing is not checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct GapFreeRule {
    pub thresholds: Thresholds,
}

impl PipeRule for GapFreeRule {
    fn kind(&self) -> RuleKind {
        RuleKind::GapFree
    }

    fn min_readings(&self) -> usize {
        2
    }

    fn evaluate(&self, readings: &[Reading]) -> Verdict {
        if readings.len() < 2 {
            return Verdict::from_violations(readings, vec![too_few(readings.len())]);
        }
        Verdict::from_violations(readings, level_violations(readings, &self.thresholds))
    }
}

/// A single visit is judged on the upper limit alone; two or more follow
/// the gap-free level check.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleAdmissibleRule {
    pub thresholds: Thresholds,
}

impl PipeRule for SingleAdmissibleRule {
    fn kind(&self) -> RuleKind {
        RuleKind::SingleAdmissible
    }

    fn min_readings(&self) -> usize {
        1
    }

    fn evaluate(&self, readings: &[Reading]) -> Verdict {
        match readings {
            [] => Verdict::from_violations(readings, vec![Violation::NoReadings]),
            [only] => {
                let mut violations = Vec::new();
                if only.water_level_mm > self.thresholds.upper_mm {
                    violations.push(Violation::ExceedsUpper {
                        max_mm: only.water_level_mm,
                        limit_mm: self.thresholds.upper_mm,
                    });
                }
                Verdict::from_violations(readings, violations)
            }
            _ => Verdict::from_violations(readings, level_violations(readings, &self.thresholds)),
        }
    }
}

/// Named rule selection, as written in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    TwoMeasurement,
    GapFree,
    SingleAdmissible,
}

impl RuleKind {
    pub fn build(self, thresholds: Thresholds) -> Box<dyn PipeRule> {
        match self {
            RuleKind::TwoMeasurement => Box::new(TwoMeasurementRule { thresholds }),
            RuleKind::GapFree => Box::new(GapFreeRule { thresholds }),
            RuleKind::SingleAdmissible => Box::new(SingleAdmissibleRule { thresholds }),
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuleKind::TwoMeasurement => "two_measurement",
            RuleKind::GapFree => "gap_free",
            RuleKind::SingleAdmissible => "single_admissible",
        })
    }
}
