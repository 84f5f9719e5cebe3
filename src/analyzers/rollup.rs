use crate::analyzers::types::FarmPeriodResult;
use crate::analyzers::utility::mean;
use crate::registry::Group;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RollupKey {
    Village,
    Group,
    Period,
}

impl RollupKey {
    pub fn name(&self) -> &'static str {
        match self {
            RollupKey::Village => "village",
            RollupKey::Group => "group",
            RollupKey::Period => "period",
        }
    }

    /// Sort key plus display key. Periods sort by index, the rest by text.
    fn key_of(&self, r: &FarmPeriodResult) -> (u32, String) {
        match self {
            RollupKey::Village => (0, r.village.clone()),
            RollupKey::Group => (0, r.group.to_string()),
            RollupKey::Period => (r.period.index, format!("Week {} ({})", r.period.index, r.period.label())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RollupRow {
    pub key: String,
    /// Distinct farms.
    pub farm_count: usize,
    /// Distinct farms with at least one valid farm-period.
    pub valid_farm_count: usize,
    pub farm_periods: usize,
    pub valid_farm_periods: usize,
    /// Sum of ratios over valid farm-periods only.
    pub ratio_sum: f64,
    pub average_ratio: f64,
    pub total_eligible_acres: f64,
    pub total_incentive: f64,
}

/// Groups farm-period results and reduces each group to counts and totals.
/// Farm-periods with no valid pipe count toward farm totals but not averages.
pub fn rollup(results: &[FarmPeriodResult], key: RollupKey) -> Vec<RollupRow> {
    #[derive(Default)]
    struct Acc<'a> {
        farms: HashSet<&'a str>,
        valid_farms: HashSet<&'a str>,
        farm_periods: usize,
        valid_ratios: Vec<f64>,
        eligible_acres: f64,
        incentive: f64,
    }

    let mut groups: BTreeMap<(u32, String), Acc> = BTreeMap::new();
    for r in results {
        let acc = groups.entry(key.key_of(r)).or_default();
        acc.farms.insert(&r.farm_id);
        acc.farm_periods += 1;
        if r.is_valid() {
            acc.valid_farms.insert(&r.farm_id);
            acc.valid_ratios.push(r.compliance_ratio);
        }
        acc.eligible_acres += r.eligible_acres;
        acc.incentive += r.incentive_amount;
    }

    groups
        .into_iter()
        .map(|((_, key), acc)| RollupRow {
            key,
            farm_count: acc.farms.len(),
            valid_farm_count: acc.valid_farms.len(),
            farm_periods: acc.farm_periods,
            valid_farm_periods: acc.valid_ratios.len(),
            ratio_sum: acc.valid_ratios.iter().sum(),
            average_ratio: mean(&acc.valid_ratios),
            total_eligible_acres: acc.eligible_acres,
            total_incentive: acc.incentive,
        })
        .collect()
}

/// Headline figures across all results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total_farms: usize,
    pub farm_periods: usize,
    pub valid_farm_periods: usize,
    /// Mean ratio over valid farm-periods.
    pub average_compliance: f64,
    pub total_incentive: f64,
    pub total_eligible_acres: f64,
}

pub fn summarize(results: &[FarmPeriodResult]) -> Summary {
    let farms: HashSet<&str> = results.iter().map(|r| r.farm_id.as_str()).collect();
    let valid: Vec<f64> = results
        .iter()
        .filter(|r| r.is_valid())
        .map(|r| r.compliance_ratio)
        .collect();

    Summary {
        total_farms: farms.len(),
        farm_periods: results.len(),
        valid_farm_periods: valid.len(),
        average_compliance: mean(&valid),
        total_incentive: results.iter().map(|r| r.incentive_amount).sum(),
        total_eligible_acres: results.iter().map(|r| r.eligible_acres).sum(),
    }
}

/// Narrows results to selected periods and groups. Empty lists select all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultFilter {
    pub periods: Vec<u32>,
    pub groups: Vec<Group>,
}

impl ResultFilter {
    pub fn matches(&self, r: &FarmPeriodResult) -> bool {
        (self.periods.is_empty() || self.periods.contains(&r.period.index))
            && (self.groups.is_empty() || self.groups.contains(&r.group))
    }

    pub fn apply(&self, results: &[FarmPeriodResult]) -> Vec<FarmPeriodResult> {
        results.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::periods::season_weeks;
    use crate::registry::{SubStatus, Track};

    fn result(farm: &str, village: &str, week: usize, valid: usize, ratio: f64, amount: f64) -> FarmPeriodResult {
        FarmPeriodResult {
            farm_id: farm.to_string(),
            farmer_name: "Farmer".to_string(),
            village: village.to_string(),
            group: Group::Assigned(Track::A, SubStatus::Complied),
            payment_eligible: true,
            incentive_acres: 10.0,
            period: season_weeks()[week],
            valid_pipe_count: valid,
            passing_pipe_count: 0,
            compliance_ratio: ratio,
            eligible_acres: ratio * 10.0,
            incentive_amount: amount,
            pipes: vec![],
        }
    }

    fn sample() -> Vec<FarmPeriodResult> {
        vec![
            result("F1", "Manjal Khurd", 0, 2, 0.5, 1500.0),
            result("F1", "Manjal Khurd", 1, 0, 0.0, 0.0),
            result("F2", "Manjal Khurd", 0, 1, 1.0, 3000.0),
            result("F3", "Bhadaur", 1, 0, 0.0, 0.0),
        ]
    }

    #[test]
    fn test_rollup_by_village_excludes_invalid_from_average() {
        let rows = rollup(&sample(), RollupKey::Village);
        assert_eq!(rows.len(), 2);

        let bhadaur = &rows[0];
        assert_eq!(bhadaur.key, "Bhadaur");
        assert_eq!(bhadaur.farm_count, 1);
        assert_eq!(bhadaur.valid_farm_count, 0);
        assert_eq!(bhadaur.average_ratio, 0.0);

        let manjal = &rows[1];
        assert_eq!(manjal.farm_count, 2);
        assert_eq!(manjal.valid_farm_count, 2);
        assert_eq!(manjal.farm_periods, 3);
        assert_eq!(manjal.valid_farm_periods, 2);
        assert_eq!(manjal.ratio_sum, 1.5);
        assert_eq!(manjal.average_ratio, 0.75);
        assert_eq!(manjal.total_incentive, 4500.0);
        assert_eq!(manjal.total_eligible_acres, 15.0);
    }

    #[test]
    fn test_rollup_by_period_sorted_by_index() {
        let rows = rollup(&sample(), RollupKey::Period);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, "Week 1 (16 June to 22 June)");
        assert_eq!(rows[1].farm_count, 2);
        assert_eq!(rows[1].valid_farm_count, 0);
    }

    #[test]
    fn test_summarize() {
        let s = summarize(&sample());
        assert_eq!(s.total_farms, 3);
        assert_eq!(s.farm_periods, 4);
        assert_eq!(s.valid_farm_periods, 2);
        assert_eq!(s.average_compliance, 0.75);
        assert_eq!(s.total_incentive, 4500.0);
    }

    #[test]
    fn test_filter() {
        let filter = ResultFilter {
            periods: vec![2],
            groups: vec![],
        };
        assert_eq!(filter.apply(&sample()).len(), 2);

        let filter = ResultFilter {
            periods: vec![],
            groups: vec![Group::Assigned(Track::B, SubStatus::Complied)],
        };
        assert!(filter.apply(&sample()).is_empty());
        assert_eq!(ResultFilter::default().apply(&sample()).len(), 4);
    }
}
