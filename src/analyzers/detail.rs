//! Human-readable pipe detail and comment strings for the monitoring report.

use crate::analyzers::types::PipeComplianceResult;

/// `P10028A1: 06/17(180mm), 06/20(90mm) [3d gap] ✅`
pub fn pipe_summary(pipe: &PipeComplianceResult) -> String {
    let mark = if pipe.passing() { "✅" } else { "❌" };
    if pipe.readings.is_empty() {
        return format!("P{}: no readings {}", pipe.pipe_id, mark);
    }

    let measurements: Vec<String> = pipe
        .readings
        .iter()
        .map(|r| {
            format!(
                "{}({}mm)",
                r.timestamp.format("%m/%d"),
                r.water_level_mm.trunc() as i64
            )
        })
        .collect();
    let gap = pipe
        .verdict
        .gap_days
        .map(|g| format!(" [{g}d gap]"))
        .unwrap_or_default();

    format!("P{}: {}{} {}", pipe.pipe_id, measurements.join(", "), gap, mark)
}

/// Every pipe's summary, separated by ` | `.
pub fn pipe_details(pipes: &[PipeComplianceResult]) -> String {
    pipes.iter().map(pipe_summary).collect::<Vec<_>>().join(" | ")
}

/// Failing pipes as `P{id}: reason, reason`, or `All compliant`.
pub fn comments(pipes: &[PipeComplianceResult]) -> String {
    if pipes.is_empty() {
        return "No pipes registered".to_string();
    }

    let notes: Vec<String> = pipes
        .iter()
        .filter(|p| !p.verdict.compliant)
        .map(|p| {
            let reasons: Vec<String> = p.verdict.violations.iter().map(|v| v.to_string()).collect();
            format!("P{}: {}", p.pipe_id, reasons.join(", "))
        })
        .collect();

    if notes.is_empty() {
        "All compliant".to_string()
    } else {
        notes.join("; ")
    }
}
