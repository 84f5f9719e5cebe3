//! Ingest and run diagnostics.
//!
//! Row-level problems never fail a run; they are tallied here so callers can
//! report how much of each dataset was usable.

use serde::Serialize;
use std::collections::BTreeMap;

/// A pipe listed under more than one farm. The first farm keeps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicatePipe {
    pub pipe_id: String,
    pub kept_farm: String,
    pub dropped_farm: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistryReport {
    pub rows_seen: usize,
    pub blank_farm_ids: usize,
    /// Later rows repeating an already-seen farm id.
    pub duplicate_farm_ids: usize,
    pub non_participants: usize,
    pub unassigned_dropped: usize,
    pub farms_retained: usize,
    /// Group tallies over every farm that reached classification.
    pub groups_classified: BTreeMap<String, usize>,
    /// Group tallies over the farms kept for evaluation.
    pub groups_retained: BTreeMap<String, usize>,
    pub duplicate_pipes: Vec<DuplicatePipe>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReadingReport {
    pub rows_seen: usize,
    pub bad_date: usize,
    pub bad_level: usize,
    pub blank_pipe: usize,
    pub unknown_pipe: usize,
    pub retained: usize,
    pub pipes_with_readings: usize,
}

impl ReadingReport {
    pub fn dropped(&self) -> usize {
        self.bad_date + self.bad_level + self.blank_pipe + self.unknown_pipe
    }

    pub fn retained_pct(&self) -> f64 {
        pct(self.retained, self.rows_seen)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub registry: RegistryReport,
    pub readings: ReadingReport,
    pub periods: usize,
    pub farm_periods: usize,
    pub valid_farm_periods: usize,
}

impl Diagnostics {
    pub fn valid_farm_period_pct(&self) -> f64 {
        pct(self.valid_farm_periods, self.farm_periods)
    }
}

pub fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(pct(50, 100), 50.0);
        assert_eq!(pct(1, 4), 25.0);
    }

    #[test]
    fn test_reading_report_dropped() {
        let report = ReadingReport {
            rows_seen: 10,
            bad_date: 1,
            bad_level: 2,
            blank_pipe: 0,
            unknown_pipe: 3,
            retained: 4,
            pipes_with_readings: 2,
        };

        assert_eq!(report.dropped(), 6);
        assert_eq!(report.retained_pct(), 40.0);
    }
}
