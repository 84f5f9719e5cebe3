//! The `compute` entry point.
//!
//! A run is a pure function of (registry snapshot, reading snapshot, config):
//! no I/O, no shared mutable state, no caching. Farms are evaluated in
//! parallel; output order is registry order, then period index.

use crate::analyzers::aggregate::aggregate_farm;
use crate::analyzers::rule::RuleKind;
use crate::analyzers::types::FarmPeriodResult;
use crate::config::{EngineConfig, ParticipationPolicy};
use crate::error::EngineError;
use crate::parser::RecordTable;
use crate::periods::{PeriodWindow, segment};
use crate::readings::ingest_readings;
use crate::registry::{FarmRecord, PipeRegistry, ingest_registry};
use crate::stats::Diagnostics;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    NoStudyParticipants,
    NoFarmsAfterFiltering,
    NoMatchingReadings,
    NoPeriods,
}

impl std::fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EmptyReason::NoStudyParticipants => "no farm is flagged as a study participant",
            EmptyReason::NoFarmsAfterFiltering => "no farms remain after group filtering",
            EmptyReason::NoMatchingReadings => "no readings match a registered pipe",
            EmptyReason::NoPeriods => "no analysis period falls in the requested range",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RunStatus {
    Complete,
    Empty(EmptyReason),
}

#[derive(Debug, Clone, Serialize)]
pub struct ComputeOutput {
    pub status: RunStatus,
    pub rule: RuleKind,
    pub farms: Vec<FarmRecord>,
    pub periods: Vec<PeriodWindow>,
    pub results: Vec<FarmPeriodResult>,
    pub diagnostics: Diagnostics,
}

fn empty_reason(
    config: &EngineConfig,
    farms: &[FarmRecord],
    diagnostics: &Diagnostics,
    periods: &[PeriodWindow],
) -> Option<EmptyReason> {
    let reg = &diagnostics.registry;
    if farms.is_empty() {
        let identified = reg.rows_seen - reg.blank_farm_ids - reg.duplicate_farm_ids;
        let nobody_participates = config.participation != ParticipationPolicy::Ignore
            && identified > 0
            && reg.non_participants == identified;
        return Some(if nobody_participates {
            EmptyReason::NoStudyParticipants
        } else {
            EmptyReason::NoFarmsAfterFiltering
        });
    }
    if periods.is_empty() {
        return Some(EmptyReason::NoPeriods);
    }
    if diagnostics.readings.retained == 0 {
        return Some(EmptyReason::NoMatchingReadings);
    }
    None
}

/// Evaluates every retained farm over every period.
///
/// # Errors
///
/// Fails when the config is inconsistent or a dataset is missing required
/// columns. Empty inputs are not errors; they yield [`RunStatus::Empty`].
#[tracing::instrument(
    skip_all,
    fields(rule = %config.compliance_rule, strategy = ?config.period_strategy)
)]
pub fn compute(
    registry: &RecordTable,
    readings: &RecordTable,
    config: &EngineConfig,
) -> Result<ComputeOutput, EngineError> {
    config.validate()?;
    let periods = segment(config)?;

    let (farms, mut registry_report) = ingest_registry(registry, config)?;
    let pipes = PipeRegistry::build(&farms);
    registry_report.duplicate_pipes = pipes.duplicates().to_vec();

    let (store, reading_report) = ingest_readings(readings, &pipes)?;

    let mut diagnostics = Diagnostics {
        registry: registry_report,
        readings: reading_report,
        periods: periods.len(),
        ..Default::default()
    };

    if let Some(reason) = empty_reason(config, &farms, &diagnostics, &periods) {
        warn!(%reason, "Run produced no results");
        return Ok(ComputeOutput {
            status: RunStatus::Empty(reason),
            rule: config.compliance_rule,
            farms,
            periods,
            results: Vec::new(),
            diagnostics,
        });
    }

    let rule = config.compliance_rule.build(config.thresholds());
    let rate = config.rate_per_acre;

    let per_farm: Vec<Vec<FarmPeriodResult>> = farms
        .par_iter()
        .map(|farm| {
            periods
                .iter()
                .map(|period| aggregate_farm(farm, &pipes, &store, rule.as_ref(), period, rate))
                .collect()
        })
        .collect();
    let results: Vec<FarmPeriodResult> = per_farm.into_iter().flatten().collect();

    diagnostics.farm_periods = results.len();
    diagnostics.valid_farm_periods = results.iter().filter(|r| r.is_valid()).count();

    info!(
        farms = farms.len(),
        periods = periods.len(),
        farm_periods = diagnostics.farm_periods,
        valid_farm_periods = diagnostics.valid_farm_periods,
        "Compliance computed"
    );

    Ok(ComputeOutput {
        status: RunStatus::Complete,
        rule: config.compliance_rule,
        farms,
        periods,
        results,
        diagnostics,
    })
}
