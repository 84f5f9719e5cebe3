//! Output formatting and persistence for run results.
//!
//! Supports pretty-printing, JSON serialization, and CSV export with
//! optional gzip compression.

use anyhow::Result;
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analyzers::rollup::Summary;
use crate::stats::Diagnostics;

/// Logs the run summary using Rust's debug pretty-print format.
pub fn print_pretty(summary: &Summary) {
    debug!("{:#?}", summary);
}

/// Logs any serializable value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Logs the ingest diagnostics as structured fields.
pub fn log_diagnostics(diagnostics: &Diagnostics) {
    let reg = &diagnostics.registry;
    let rd = &diagnostics.readings;
    info!(
        registry_rows = reg.rows_seen,
        farms = reg.farms_retained,
        duplicate_farm_ids = reg.duplicate_farm_ids,
        non_participants = reg.non_participants,
        unassigned_dropped = reg.unassigned_dropped,
        duplicate_pipes = reg.duplicate_pipes.len(),
        "Registry diagnostics"
    );
    info!(
        reading_rows = rd.rows_seen,
        retained = rd.retained,
        retained_pct = format!("{:.1}", rd.retained_pct()),
        bad_date = rd.bad_date,
        bad_level = rd.bad_level,
        unknown_pipe = rd.unknown_pipe,
        "Reading diagnostics"
    );
    info!(
        periods = diagnostics.periods,
        farm_periods = diagnostics.farm_periods,
        valid_pct = format!("{:.1}", diagnostics.valid_farm_period_pct()),
        "Evaluation diagnostics"
    );
}

/// Header line for `T`, taken from serializing its default value.
fn header_line<T: Serialize + Default>() -> Result<Vec<u8>> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_writer(Vec::new());
    wtr.serialize(T::default())?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| anyhow::Error::from(e.into_error()))?;
    let end = bytes.iter().position(|&b| b == b'\n').map_or(bytes.len(), |i| i + 1);
    Ok(bytes[..end].to_vec())
}

fn serialize_rows<W: Write, T: Serialize + Default>(mut writer: W, rows: &[T]) -> Result<W> {
    // The csv writer only emits headers alongside the first record.
    if rows.is_empty() {
        writer.write_all(&header_line::<T>()?)?;
        writer.flush()?;
        return Ok(writer);
    }
    let mut wtr = WriterBuilder::new().has_headers(true).from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    wtr.into_inner()
        .map_err(|e| anyhow::Error::from(e.into_error()))
}

/// Writes `rows` as a CSV file, replacing any existing file.
///
/// With `gzip`, the file is compressed and `.gz` is appended to the name.
/// Returns the path actually written. An empty `rows` still yields the header line.
pub fn write_records<T: Serialize + Default>(path: &Path, rows: &[T], gzip: bool) -> Result<PathBuf> {
    let target = if gzip {
        let mut name = path.as_os_str().to_owned();
        name.push(".gz");
        PathBuf::from(name)
    } else {
        path.to_path_buf()
    };
    debug!(path = %target.display(), rows = rows.len(), gzip, "Writing CSV");

    let file = File::create(&target)?;
    if gzip {
        let encoder = serialize_rows(GzEncoder::new(file, Compression::default()), rows)?;
        encoder.finish()?;
    } else {
        serialize_rows(file, rows)?;
    }
    Ok(target)
}

/// Writes `value` as pretty-printed JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut file = File::create(path)?;
    serde_json::to_writer_pretty(&mut file, value)?;
    file.write_all(b"\n")?;
    debug!(path = %path.display(), "Wrote JSON");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::fs;
    use std::io::Read;

    #[derive(Serialize, Default)]
    struct Row {
        #[serde(rename = "Farm_ID")]
        farm_id: &'static str,
        #[serde(rename = "Payment_Rs")]
        payment: f64,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                farm_id: "F1",
                payment: 1500.0,
            },
            Row {
                farm_id: "F2",
                payment: 0.0,
            },
        ]
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&Summary::default());
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&Summary::default()).unwrap();
        log_diagnostics(&Diagnostics::default());
    }

    #[test]
    fn test_write_records_plain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payments.csv");

        let written = write_records(&path, &rows(), false).unwrap();
        assert_eq!(written, path);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines, vec!["Farm_ID,Payment_Rs", "F1,1500.0", "F2,0.0"]);
    }

    #[test]
    fn test_write_records_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payments.csv");
        write_records(&path, &rows(), false).unwrap();
        write_records(&path, &rows()[..1], false).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_write_records_empty_keeps_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payments.csv");
        write_records(&path, &Vec::<Row>::new(), false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Farm_ID,Payment_Rs\n");

        let gz = write_records(&path, &Vec::<Row>::new(), true).unwrap();
        let mut decoded = String::new();
        GzDecoder::new(File::open(&gz).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "Farm_ID,Payment_Rs\n");
    }

    #[test]
    fn test_write_records_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payments.csv");

        let written = write_records(&path, &rows(), true).unwrap();
        assert_eq!(written, dir.path().join("payments.csv.gz"));
        assert!(!path.exists());

        let mut decoded = String::new();
        GzDecoder::new(File::open(&written).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert!(decoded.starts_with("Farm_ID,Payment_Rs\n"));
        assert!(decoded.contains("F2,0.0"));
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_json(&path, &Summary::default()).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["total_farms"], 0);
    }
}
