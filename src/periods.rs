//! Period segmentation: the published season calendar or rolling 7-day windows.

use crate::config::EngineConfig;
use crate::error::ConfigError;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStrategy {
    /// The published season weeks.
    Fixed,
    /// 7-day windows anchored at `analysis_start`, last one truncated.
    Dynamic,
    /// The whole analysis range as a single period.
    FullRange,
}

impl PeriodStrategy {
    fn name(&self) -> &'static str {
        match self {
            PeriodStrategy::Fixed => "fixed",
            PeriodStrategy::Dynamic => "dynamic",
            PeriodStrategy::FullRange => "full-range",
        }
    }
}

/// Inclusive date range evaluated as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PeriodWindow {
    pub index: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// e.g. `"16 June to 22 June"`
    pub fn label(&self) -> String {
        format!(
            "{} to {}",
            self.start.format("%-d %B"),
            self.end.format("%-d %B")
        )
    }
}

/// Kharif 2025 study weeks: (week, start, end) as (year, month, day).
const SEASON_WEEKS: [(u32, (i32, u32, u32), (i32, u32, u32)); 18] = [
    (1, (2025, 6, 16), (2025, 6, 22)),
    (2, (2025, 6, 23), (2025, 6, 29)),
    (3, (2025, 6, 30), (2025, 7, 6)),
    (4, (2025, 7, 7), (2025, 7, 13)),
    (5, (2025, 7, 14), (2025, 7, 20)),
    (6, (2025, 7, 21), (2025, 7, 27)),
    (7, (2025, 7, 28), (2025, 8, 3)),
    (8, (2025, 8, 4), (2025, 8, 10)),
    (9, (2025, 8, 11), (2025, 8, 17)),
    (10, (2025, 8, 18), (2025, 8, 24)),
    (11, (2025, 8, 25), (2025, 8, 31)),
    (12, (2025, 9, 1), (2025, 9, 7)),
    (13, (2025, 9, 8), (2025, 9, 14)),
    (14, (2025, 9, 15), (2025, 9, 21)),
    (15, (2025, 9, 22), (2025, 9, 28)),
    (16, (2025, 9, 29), (2025, 10, 5)),
    (17, (2025, 10, 6), (2025, 10, 12)),
    (18, (2025, 10, 13), (2025, 10, 15)),
];

/// The full published calendar.
pub fn season_weeks() -> Vec<PeriodWindow> {
    SEASON_WEEKS
        .iter()
        .filter_map(|&(index, (sy, sm, sd), (ey, em, ed))| {
            Some(PeriodWindow {
                index,
                start: NaiveDate::from_ymd_opt(sy, sm, sd)?,
                end: NaiveDate::from_ymd_opt(ey, em, ed)?,
            })
        })
        .collect()
}

/// Calendar weeks intersecting the (optionally open-ended) range, narrowed to
/// `weeks` when it is non-empty. Weeks are never clipped.
pub fn fixed(start: Option<NaiveDate>, end: Option<NaiveDate>, weeks: &[u32]) -> Vec<PeriodWindow> {
    season_weeks()
        .into_iter()
        .filter(|w| start.is_none_or(|s| w.end >= s))
        .filter(|w| end.is_none_or(|e| w.start <= e))
        .filter(|w| weeks.is_empty() || weeks.contains(&w.index))
        .collect()
}

/// Consecutive 7-day windows from `start`, numbered from 1; the last one ends
/// on `end` and may be shorter.
pub fn dynamic(start: NaiveDate, end: NaiveDate) -> Result<Vec<PeriodWindow>, ConfigError> {
    if end < start {
        return Err(ConfigError::InvertedRange { start, end });
    }

    let mut windows = Vec::new();
    let mut cursor = start;
    let mut index = 1;
    while cursor <= end {
        let week_end = cursor
            .checked_add_days(Days::new(6))
            .map_or(end, |d| d.min(end));
        windows.push(PeriodWindow {
            index,
            start: cursor,
            end: week_end,
        });
        match week_end.succ_opt() {
            Some(next) => cursor = next,
            None => break,
        }
        index += 1;
    }
    Ok(windows)
}

/// Periods for a run according to its configured strategy.
pub fn segment(config: &EngineConfig) -> Result<Vec<PeriodWindow>, ConfigError> {
    let strategy = config.period_strategy;
    let range = || match (config.analysis_start, config.analysis_end) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(ConfigError::MissingRange {
            strategy: strategy.name(),
        }),
    };

    match strategy {
        PeriodStrategy::Fixed => Ok(fixed(
            config.analysis_start,
            config.analysis_end,
            &config.weeks,
        )),
        PeriodStrategy::Dynamic => {
            let (start, end) = range()?;
            dynamic(start, end)
        }
        PeriodStrategy::FullRange => {
            let (start, end) = range()?;
            if end < start {
                return Err(ConfigError::InvertedRange { start, end });
            }
            Ok(vec![PeriodWindow {
                index: 1,
                start,
                end,
            }])
        }
    }
}
