//! Data types produced by the compliance pipeline.

use crate::analyzers::detail::{comments, pipe_details};
use crate::analyzers::rule::Verdict;
use crate::periods::PeriodWindow;
use crate::readings::Reading;
use crate::registry::Group;
use serde::Serialize;

/// Verdict for one pipe in one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipeComplianceResult {
    pub pipe_id: String,
    pub period: PeriodWindow,
    pub verdict: Verdict,
    /// Enough readings for the active rule to count this pipe.
    pub valid: bool,
    pub readings: Vec<Reading>,
}

impl PipeComplianceResult {
    pub fn passing(&self) -> bool {
        self.valid && self.verdict.compliant
    }
}

/// Compliance and incentive figures for one farm in one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FarmPeriodResult {
    pub farm_id: String,
    pub farmer_name: String,
    pub village: String,
    pub group: Group,
    pub payment_eligible: bool,
    pub incentive_acres: f64,
    pub period: PeriodWindow,
    pub valid_pipe_count: usize,
    pub passing_pipe_count: usize,
    pub compliance_ratio: f64,
    pub eligible_acres: f64,
    pub incentive_amount: f64,
    pub pipes: Vec<PipeComplianceResult>,
}

impl FarmPeriodResult {
    /// A farm-period with at least one valid pipe.
    pub fn is_valid(&self) -> bool {
        self.valid_pipe_count > 0
    }
}

/// Flat payment table row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PaymentRow {
    #[serde(rename = "Week")]
    pub week: u32,
    #[serde(rename = "Village")]
    pub village: String,
    #[serde(rename = "Farm_ID")]
    pub farm_id: String,
    #[serde(rename = "Farmer_Name")]
    pub farmer_name: String,
    #[serde(rename = "Group")]
    pub group: String,
    #[serde(rename = "Payment_Eligible")]
    pub payment_eligible: bool,
    #[serde(rename = "Incentive_Acres")]
    pub incentive_acres: f64,
    #[serde(rename = "Valid_Pipes")]
    pub valid_pipes: usize,
    #[serde(rename = "Compliant_Pipes")]
    pub compliant_pipes: usize,
    #[serde(rename = "Compliance_Rate")]
    pub compliance_rate: f64,
    #[serde(rename = "Eligible_Acres")]
    pub eligible_acres: f64,
    #[serde(rename = "Payment_Rs")]
    pub payment_rs: f64,
}

impl From<&FarmPeriodResult> for PaymentRow {
    fn from(r: &FarmPeriodResult) -> Self {
        Self {
            week: r.period.index,
            village: r.village.clone(),
            farm_id: r.farm_id.clone(),
            farmer_name: r.farmer_name.clone(),
            group: r.group.to_string(),
            payment_eligible: r.payment_eligible,
            incentive_acres: r.incentive_acres,
            valid_pipes: r.valid_pipe_count,
            compliant_pipes: r.passing_pipe_count,
            compliance_rate: r.compliance_ratio,
            eligible_acres: r.eligible_acres,
            payment_rs: r.incentive_amount,
        }
    }
}

/// Flat field-monitoring row: one farm, one week, every pipe spelled out.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonitoringRow {
    #[serde(rename = "Week")]
    pub week: String,
    #[serde(rename = "Village")]
    pub village: String,
    #[serde(rename = "Farm_ID")]
    pub farm_id: String,
    #[serde(rename = "Farmer_Name")]
    pub farmer_name: String,
    #[serde(rename = "Group")]
    pub group: String,
    #[serde(rename = "Acres")]
    pub acres: f64,
    #[serde(rename = "Pipe_Details")]
    pub pipe_details: String,
    #[serde(rename = "Comments")]
    pub comments: String,
}

impl From<&FarmPeriodResult> for MonitoringRow {
    fn from(r: &FarmPeriodResult) -> Self {
        Self {
            week: r.period.label(),
            village: r.village.clone(),
            farm_id: r.farm_id.clone(),
            farmer_name: r.farmer_name.clone(),
            group: r.group.to_string(),
            acres: r.incentive_acres,
            pipe_details: pipe_details(&r.pipes),
            comments: comments(&r.pipes),
        }
    }
}
