use crate::analyzers::rule::PipeRule;
use crate::analyzers::types::{FarmPeriodResult, PipeComplianceResult};
use crate::periods::PeriodWindow;
use crate::readings::ReadingStore;
use crate::registry::{FarmRecord, PipeRegistry};

/// Runs the rule over one pipe's readings inside `period`.
pub fn evaluate_pipe(
    rule: &dyn PipeRule,
    store: &ReadingStore,
    pipe_id: &str,
    period: &PeriodWindow,
) -> PipeComplianceResult {
    let readings = store.window(pipe_id, period.start, period.end);
    debug_assert!(readings.iter().all(|r| period.contains(r.date())));
    let verdict = rule.evaluate(readings);
    PipeComplianceResult {
        pipe_id: pipe_id.to_string(),
        period: *period,
        valid: readings.len() >= rule.min_readings(),
        verdict,
        readings: readings.to_vec(),
    }
}

/// Combines a farm's pipe verdicts for one period into payment figures.
///
/// Only pipes with enough readings count toward the denominator. The ratio
/// is 0 when no pipe is valid, and the amount is 0 unless the farm's group
/// is payment-eligible.
pub fn aggregate_farm(
    farm: &FarmRecord,
    pipes: &PipeRegistry,
    store: &ReadingStore,
    rule: &dyn PipeRule,
    period: &PeriodWindow,
    rate_per_acre: f64,
) -> FarmPeriodResult {
    let pipe_results: Vec<PipeComplianceResult> = pipes
        .owned_pipes(farm)
        .map(|pipe_id| evaluate_pipe(rule, store, pipe_id, period))
        .collect();

    let valid_pipe_count = pipe_results.iter().filter(|p| p.valid).count();
    let passing_pipe_count = pipe_results.iter().filter(|p| p.passing()).count();

    let compliance_ratio = if valid_pipe_count == 0 {
        0.0
    } else {
        passing_pipe_count as f64 / valid_pipe_count as f64
    };
    let eligible_acres = compliance_ratio * farm.incentive_acres;
    let incentive_amount = if farm.payment_eligible {
        eligible_acres * rate_per_acre
    } else {
        0.0
    };

    debug_assert!(
        (0.0..=farm.incentive_acres).contains(&eligible_acres),
        "eligible acres {eligible_acres} outside 0..={} for {}",
        farm.incentive_acres,
        farm.farm_id
    );
    debug_assert!(farm.payment_eligible || incentive_amount == 0.0);

    FarmPeriodResult {
        farm_id: farm.farm_id.clone(),
        farmer_name: farm.farmer_name.clone(),
        village: farm.village.clone(),
        group: farm.group,
        payment_eligible: farm.payment_eligible,
        incentive_acres: farm.incentive_acres,
        period: *period,
        valid_pipe_count,
        passing_pipe_count,
        compliance_ratio,
        eligible_acres,
        incentive_amount,
        pipes: pipe_results,
    }
}
