//! Compliance evaluation and incentive aggregation.
//!
//! Each pipe's readings for a period go through the active [`rule::PipeRule`].
//! The verdicts are then combined into per-farm compliance ratios and
//! payments, and finally reduced into rollups by village, group or week.

pub mod aggregate;
pub mod detail;
pub mod rollup;
pub mod rule;
pub mod types;
pub mod utility;
