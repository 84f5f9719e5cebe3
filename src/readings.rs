//! Water-level readings grouped by pipe and sorted by time.
//!
//! Rows are dropped, never corrected: an unparsable date or level, a blank
//! pipe id or a pipe no farm claims all remove the row before it is stored.

use crate::error::SchemaError;
use crate::parser::RecordTable;
use crate::registry::PipeRegistry;
use crate::schema::ReadingColumns;
use crate::schema::coerce::{normalize_pipe_id, parse_number, parse_timestamp};
use crate::stats::ReadingReport;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub pipe_id: String,
    pub timestamp: NaiveDateTime,
    pub water_level_mm: f64,
}

impl Reading {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReadingStore {
    by_pipe: HashMap<String, Vec<Reading>>,
}

impl ReadingStore {
    /// Groups readings by pipe, each pipe sorted ascending by timestamp.
    /// Equal timestamps keep their input order.
    pub fn from_readings(readings: impl IntoIterator<Item = Reading>) -> Self {
        let mut by_pipe: HashMap<String, Vec<Reading>> = HashMap::new();
        for r in readings {
            by_pipe.entry(r.pipe_id.clone()).or_default().push(r);
        }
        for series in by_pipe.values_mut() {
            series.sort_by_key(|r| r.timestamp);
        }
        Self { by_pipe }
    }

    /// All readings for a pipe, oldest first.
    pub fn pipe(&self, pipe_id: &str) -> &[Reading] {
        self.by_pipe.get(pipe_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Readings for a pipe whose date falls in `start..=end`.
    pub fn window(&self, pipe_id: &str, start: NaiveDate, end: NaiveDate) -> &[Reading] {
        let series = self.pipe(pipe_id);
        let lo = series.partition_point(|r| r.date() < start);
        let hi = series.partition_point(|r| r.date() <= end);
        if lo >= hi { &[] } else { &series[lo..hi] }
    }

    pub fn pipe_count(&self) -> usize {
        self.by_pipe.len()
    }

    pub fn len(&self) -> usize {
        self.by_pipe.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_pipe.is_empty()
    }
}

/// Normalizes the water-level export against the registered pipes.
///
/// # Errors
///
/// Fails only when the date, pipe or level column cannot be resolved.
#[tracing::instrument(skip_all, fields(rows = table.len(), registered_pipes = registry.len()))]
pub fn ingest_readings(
    table: &RecordTable,
    registry: &PipeRegistry,
) -> Result<(ReadingStore, ReadingReport), SchemaError> {
    let cols = ReadingColumns::resolve(table)?;
    let mut report = ReadingReport::default();
    let mut kept = Vec::new();

    for row in 0..table.len() {
        report.rows_seen += 1;

        let Some(timestamp) = parse_timestamp(table.cell(row, cols.date)) else {
            report.bad_date += 1;
            debug!(row, "Reading dropped: unparsable date");
            continue;
        };
        let water_level_mm = match parse_number(table.cell(row, cols.water_level_mm)) {
            Some(v) if v >= 0.0 => v,
            _ => {
                report.bad_level += 1;
                debug!(row, "Reading dropped: unparsable water level");
                continue;
            }
        };
        let Some(pipe_id) = normalize_pipe_id(table.cell(row, cols.pipe_id)) else {
            report.blank_pipe += 1;
            debug!(row, "Reading dropped: blank pipe id");
            continue;
        };
        if !registry.contains(&pipe_id) {
            report.unknown_pipe += 1;
            debug!(row, pipe_id = %pipe_id, "Reading dropped: pipe not registered");
            continue;
        }

        kept.push(Reading {
            pipe_id,
            timestamp,
            water_level_mm,
        });
    }

    let store = ReadingStore::from_readings(kept);
    report.retained = store.len();
    report.pipes_with_readings = store.pipe_count();

    if report.dropped() > 0 {
        warn!(
            dropped = report.dropped(),
            bad_date = report.bad_date,
            bad_level = report.bad_level,
            blank_pipe = report.blank_pipe,
            unknown_pipe = report.unknown_pipe,
            "Some readings were dropped"
        );
    }
    info!(
        retained = report.retained,
        pipes = report.pipes_with_readings,
        "Readings ingested"
    );

    Ok((store, report))
}
