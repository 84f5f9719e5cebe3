//! Error types for the compliance engine.
//!
//! Only dataset-level and configuration failures are errors. Bad rows are
//! counted in [`crate::stats::Diagnostics`] and never abort a run.

use chrono::NaiveDate;

/// Which input a schema failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Registry,
    Readings,
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dataset::Registry => f.write_str("registry"),
            Dataset::Readings => f.write_str("readings"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// Required columns could not be resolved. `candidates` lists headers that
    /// look related (contain "study", "pipe" or "group") to help spot drift.
    #[error(
        "{dataset} is missing required columns: {}; candidate headers: [{}]",
        .missing.join(", "),
        .candidates.join(", ")
    )]
    MissingFields {
        dataset: Dataset,
        missing: Vec<String>,
        candidates: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{strategy} periods need both analysis_start and analysis_end")]
    MissingRange { strategy: &'static str },

    #[error("analysis_end {end} is before analysis_start {start}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error("{name} must be a finite, non-negative number (got {value})")]
    InvalidNumber { name: &'static str, value: f64 },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
