//! Schema resolution for loosely-named input columns.
//!
//! Each canonical field is described once in a [`FieldSpec`]. Flexible fields
//! accept header drift (case, punctuation, extra words) by keyword matching;
//! exact fields must appear verbatim. Resolution happens once at the ingest
//! boundary and hands typed column indices to the rest of the engine.

pub mod coerce;

use crate::error::{Dataset, SchemaError};
use crate::parser::RecordTable;
use serde::{Deserialize, Serialize};

/// Tokens that mark a header as a likely candidate when resolution fails.
const HINT_TOKENS: &[&str] = &["study", "pipe", "group"];

/// How a canonical field is located in the header row.
#[derive(Debug, Clone, Copy)]
pub enum Matcher<'a> {
    /// First header (in header order) containing any keyword, case-insensitive,
    /// else a header equal to `default`.
    Keywords {
        keywords: &'a [&'a str],
        default: &'a str,
    },
    /// Header must equal this text after trimming.
    Exact(&'a str),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec<'a> {
    pub canonical: &'a str,
    pub matcher: Matcher<'a>,
    pub required: bool,
}

impl<'a> FieldSpec<'a> {
    pub const fn flexible(
        canonical: &'a str,
        keywords: &'a [&'a str],
        default: &'a str,
        required: bool,
    ) -> Self {
        Self {
            canonical,
            matcher: Matcher::Keywords { keywords, default },
            required,
        }
    }

    pub const fn exact(canonical: &'a str, header: &'a str, required: bool) -> Self {
        Self {
            canonical,
            matcher: Matcher::Exact(header),
            required,
        }
    }

    fn locate(&self, headers: &[String]) -> Option<usize> {
        match self.matcher {
            Matcher::Keywords { keywords, default } => find_column(headers, keywords, default),
            Matcher::Exact(header) => headers.iter().position(|h| h.trim() == header.trim()),
        }
    }

    /// What to print when this field is missing.
    fn expectation(&self) -> String {
        match self.matcher {
            Matcher::Keywords { default, .. } => format!("{} ({})", self.canonical, default),
            Matcher::Exact(header) => header.to_string(),
        }
    }
}

/// Returns the first header containing any of `keywords` (case-insensitive),
/// falling back to a header named exactly `default`.
pub fn find_column(headers: &[String], keywords: &[&str], default: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| {
            let h = h.to_lowercase();
            keywords.iter().any(|kw| h.contains(&kw.to_lowercase()))
        })
        .or_else(|| headers.iter().position(|h| h.trim() == default))
}

/// Result of resolving a set of [`FieldSpec`]s against a header row.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub columns: Vec<(String, Option<usize>)>,
}

impl Resolution {
    pub fn get(&self, canonical: &str) -> Option<usize> {
        self.columns
            .iter()
            .find(|(name, _)| name == canonical)
            .and_then(|(_, idx)| *idx)
    }
}

/// Resolves every spec, failing with the full list of unresolved required fields.
pub fn resolve(
    dataset: Dataset,
    table: &RecordTable,
    specs: &[FieldSpec<'_>],
) -> Result<Resolution, SchemaError> {
    let mut columns = Vec::with_capacity(specs.len());
    let mut missing = Vec::new();

    for spec in specs {
        let idx = spec.locate(&table.headers);
        if idx.is_none() && spec.required {
            missing.push(spec.expectation());
        }
        columns.push((spec.canonical.to_string(), idx));
    }

    if !missing.is_empty() {
        let candidates = table
            .headers
            .iter()
            .filter(|h| {
                let h = h.to_lowercase();
                HINT_TOKENS.iter().any(|t| h.contains(t))
            })
            .cloned()
            .collect();
        return Err(SchemaError::MissingFields {
            dataset,
            missing,
            candidates,
        });
    }

    Ok(Resolution { columns })
}

/// Exact header texts for one treatment track's flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackHeaders {
    pub treatment: String,
    pub complied: String,
    pub non_complied: String,
}

impl TrackHeaders {
    fn kharif25(track: char, arm: &str) -> Self {
        let prefix = format!("Kharif 25 - AWD Study - Group {track}");
        Self {
            treatment: format!("{prefix} - {arm} (Y/N)"),
            complied: format!("{prefix} - Complied (Y/N)"),
            non_complied: format!("{prefix} - Non-complied (Y/N)"),
        }
    }
}

/// Registry headers that must be matched exactly.
///
/// Deserializable so a config file can follow a renamed export without a
/// rebuild. Defaults are the Kharif 2025 registry headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySchema {
    pub study_flag: String,
    pub group_a: TrackHeaders,
    pub group_b: TrackHeaders,
    pub group_c: TrackHeaders,
    /// Pipe code columns in order; the first one is required.
    pub pipe_codes: Vec<String>,
}

impl Default for RegistrySchema {
    fn default() -> Self {
        Self {
            study_flag: "Kharif 25 - AWD Study (Y/N)".to_string(),
            group_a: TrackHeaders::kharif25('A', "Treatment"),
            group_b: TrackHeaders::kharif25('B', "Training"),
            group_c: TrackHeaders::kharif25('C', "Control"),
            pipe_codes: (1..=5)
                .map(|i| format!("Kharif 25 PVC Pipe code - {i}"))
                .collect(),
        }
    }
}

/// Column indices of the three flags for one track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackColumns {
    pub treatment: usize,
    pub complied: usize,
    pub non_complied: usize,
}

/// Registry columns after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryColumns {
    pub farm_id: usize,
    pub farmer_name: Option<usize>,
    pub village: Option<usize>,
    pub incentive_acres: Option<usize>,
    pub study_flag: usize,
    /// Tracks A, B, C in priority order.
    pub tracks: [TrackColumns; 3],
    /// Present pipe code columns, in pipe order.
    pub pipe_codes: Vec<usize>,
}

const FARM_ID_KEYWORDS: &[&str] = &["farm id", "farm_id", "farmid"];
const FARMER_NAME_KEYWORDS: &[&str] = &["farmer name", "farmer_name"];
const VILLAGE_KEYWORDS: &[&str] = &["village"];
const ACRES_KEYWORDS: &[&str] = &["acres", "acreage", "incentive acres"];

impl RegistrySchema {
    fn specs(&self) -> Vec<FieldSpec<'_>> {
        let mut specs = vec![
            FieldSpec::flexible("farm_id", FARM_ID_KEYWORDS, "Farm_ID", true),
            FieldSpec::flexible("farmer_name", FARMER_NAME_KEYWORDS, "Farmer_Name", false),
            FieldSpec::flexible("village", VILLAGE_KEYWORDS, "Village", false),
            FieldSpec::flexible("incentive_acres", ACRES_KEYWORDS, "Acres", false),
            FieldSpec::exact("study_flag", &self.study_flag, true),
        ];
        for track in [&self.group_a, &self.group_b, &self.group_c] {
            specs.push(FieldSpec::exact("treatment", &track.treatment, true));
            specs.push(FieldSpec::exact("complied", &track.complied, true));
            specs.push(FieldSpec::exact("non_complied", &track.non_complied, true));
        }
        for (i, header) in self.pipe_codes.iter().enumerate() {
            specs.push(FieldSpec::exact("pipe_code", header, i == 0));
        }
        specs
    }

    /// Resolves registry headers, or fails listing every missing required column.
    pub fn resolve(&self, table: &RecordTable) -> Result<RegistryColumns, SchemaError> {
        let specs = self.specs();
        let resolution = resolve(Dataset::Registry, table, &specs)?;
        let cols: Vec<Option<usize>> = resolution.columns.iter().map(|(_, c)| *c).collect();

        // Required entries are guaranteed present after a successful resolve.
        let req = |i: usize| cols[i].unwrap_or_default();
        let track = |base: usize| TrackColumns {
            treatment: req(base),
            complied: req(base + 1),
            non_complied: req(base + 2),
        };

        Ok(RegistryColumns {
            farm_id: req(0),
            farmer_name: cols[1],
            village: cols[2],
            incentive_acres: cols[3],
            study_flag: req(4),
            tracks: [track(5), track(8), track(11)],
            pipe_codes: cols[14..].iter().flatten().copied().collect(),
        })
    }

    /// Canonical name / header pairs for diagnostics output.
    pub fn describe(&self, table: &RecordTable) -> Vec<(String, Option<String>)> {
        describe(table, &self.specs())
    }
}

/// Readings columns after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingColumns {
    pub date: usize,
    pub pipe_id: usize,
    pub water_level_mm: usize,
    pub farm_id: Option<usize>,
}

const READING_SPECS: &[FieldSpec<'static>] = &[
    FieldSpec::flexible("date", &["date"], "Date", true),
    FieldSpec::flexible("pipe_id", &["pipe id", "pipe_id", "pipe code"], "Pipe_ID", true),
    FieldSpec::flexible(
        "water_level_mm",
        &["water level", "water_level", "depth"],
        "Water_Level_mm",
        true,
    ),
    FieldSpec::flexible("farm_id", FARM_ID_KEYWORDS, "Farm_ID", false),
];

impl ReadingColumns {
    pub fn resolve(table: &RecordTable) -> Result<Self, SchemaError> {
        let r = resolve(Dataset::Readings, table, READING_SPECS)?;
        Ok(Self {
            date: r.get("date").unwrap_or_default(),
            pipe_id: r.get("pipe_id").unwrap_or_default(),
            water_level_mm: r.get("water_level_mm").unwrap_or_default(),
            farm_id: r.get("farm_id"),
        })
    }

    pub fn describe(table: &RecordTable) -> Vec<(String, Option<String>)> {
        describe(table, READING_SPECS)
    }
}

fn describe(table: &RecordTable, specs: &[FieldSpec<'_>]) -> Vec<(String, Option<String>)> {
    specs
        .iter()
        .map(|spec| {
            let name = match spec.matcher {
                Matcher::Exact(header) => header.to_string(),
                Matcher::Keywords { .. } => spec.canonical.to_string(),
            };
            (name, spec.locate(&table.headers).map(|i| table.headers[i].clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(h: &[&str]) -> Vec<String> {
        h.iter().map(|s| s.to_string()).collect()
    }

    fn registry_headers() -> Vec<String> {
        let schema = RegistrySchema::default();
        let mut h = headers(&["Farm ID", "Farmer Name", "Village", "Incentive Acres"]);
        h.push(schema.study_flag.clone());
        for t in [&schema.group_a, &schema.group_b, &schema.group_c] {
            h.push(t.treatment.clone());
            h.push(t.complied.clone());
            h.push(t.non_complied.clone());
        }
        h.extend(schema.pipe_codes.iter().cloned());
        h
    }

    #[test]
    fn test_find_column_uses_header_order() {
        let h = headers(&["Incentive Acres", "Total Acreage"]);
        assert_eq!(find_column(&h, &["acreage", "acres"], "Acres"), Some(0));
    }

    #[test]
    fn test_find_column_falls_back_to_default() {
        let h = headers(&["Plot", "Farm_ID"]);
        assert_eq!(find_column(&h, &["farmid"], "Farm_ID"), Some(1));
        assert_eq!(find_column(&h, &["farmid"], "Missing"), None);
    }

    #[test]
    fn test_find_column_case_insensitive() {
        let h = headers(&["DATE OF VISIT", "Water Level (mm)"]);
        assert_eq!(find_column(&h, &["date"], "Date"), Some(0));
        assert_eq!(find_column(&h, &["water level"], "x"), Some(1));
    }

    #[test]
    fn test_registry_resolves_all_columns() {
        let table = RecordTable::new(registry_headers(), vec![]);
        let cols = RegistrySchema::default().resolve(&table).unwrap();

        assert_eq!(cols.farm_id, 0);
        assert_eq!(cols.incentive_acres, Some(3));
        assert_eq!(cols.study_flag, 4);
        assert_eq!(cols.tracks[1].treatment, 8);
        assert_eq!(cols.tracks[2].non_complied, 13);
        assert_eq!(cols.pipe_codes, vec![14, 15, 16, 17, 18]);
    }

    #[test]
    fn test_optional_pipe_columns_may_be_absent() {
        let mut h = registry_headers();
        h.truncate(16);
        let table = RecordTable::new(h, vec![]);
        let cols = RegistrySchema::default().resolve(&table).unwrap();
        assert_eq!(cols.pipe_codes, vec![14, 15]);
    }

    #[test]
    fn test_missing_required_fields_lists_all_and_hints() {
        let h = headers(&[
            "Farm ID",
            "AWD study flag",
            "Pipe code one",
            "Village",
        ]);
        let table = RecordTable::new(h, vec![]);
        let err = RegistrySchema::default().resolve(&table).unwrap_err();

        let SchemaError::MissingFields {
            dataset,
            missing,
            candidates,
        } = err;
        assert_eq!(dataset, Dataset::Registry);
        assert_eq!(missing.len(), 11);
        assert!(missing.contains(&"Kharif 25 - AWD Study (Y/N)".to_string()));
        assert!(missing.contains(&"Kharif 25 PVC Pipe code - 1".to_string()));
        assert_eq!(candidates, vec!["AWD study flag", "Pipe code one"]);
    }

    #[test]
    fn test_readings_resolution() {
        let table = RecordTable::new(
            headers(&["Visit Date", "Farm ID", "PVC Pipe Code", "Water Level (mm)"]),
            vec![],
        );
        let cols = ReadingColumns::resolve(&table).unwrap();
        assert_eq!(cols.date, 0);
        assert_eq!(cols.farm_id, Some(1));
        assert_eq!(cols.pipe_id, 2);
        assert_eq!(cols.water_level_mm, 3);
    }

    #[test]
    fn test_readings_missing_level_is_hard_failure() {
        let table = RecordTable::new(headers(&["Date", "Pipe_ID"]), vec![]);
        let err = ReadingColumns::resolve(&table).unwrap_err();
        assert!(err.to_string().contains("water_level_mm (Water_Level_mm)"));
    }
}
