use super::group::{Group, RegistryFlags, TrackFlags, classify};
use crate::config::{EngineConfig, ParticipationPolicy};
use crate::error::SchemaError;
use crate::flags::is_positive;
use crate::parser::RecordTable;
use crate::schema::coerce::{normalize_pipe_id, parse_acres, text_or};
use crate::schema::RegistryColumns;
use crate::stats::RegistryReport;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// One farm plot after classification. Immutable for the rest of the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FarmRecord {
    pub farm_id: String,
    pub farmer_name: String,
    pub village: String,
    pub incentive_acres: f64,
    pub group: Group,
    pub payment_eligible: bool,
    pub study_participant: bool,
    /// Pipe codes in column order (pipe 1..5), de-duplicated.
    pub pipe_ids: Vec<String>,
}

fn read_flags(table: &RecordTable, row: usize, cols: &RegistryColumns) -> RegistryFlags {
    let flag = |col: usize| is_positive(table.cell(row, col));
    let mut tracks = [TrackFlags::default(); 3];
    for (slot, tc) in tracks.iter_mut().zip(cols.tracks.iter()) {
        *slot = TrackFlags {
            treatment: flag(tc.treatment),
            complied: flag(tc.complied),
            non_complied: flag(tc.non_complied),
        };
    }
    RegistryFlags {
        study_participant: flag(cols.study_flag),
        tracks,
    }
}

fn read_pipe_ids(table: &RecordTable, row: usize, cols: &RegistryColumns) -> Vec<String> {
    let mut pipes: Vec<String> = Vec::with_capacity(cols.pipe_codes.len());
    for &col in &cols.pipe_codes {
        if let Some(id) = normalize_pipe_id(table.cell(row, col)) {
            if !pipes.contains(&id) {
                pipes.push(id);
            }
        }
    }
    pipes
}

/// Resolves, classifies and filters the registry into the working farm set.
///
/// # Errors
///
/// Fails only when required registry columns cannot be resolved.
#[tracing::instrument(skip_all, fields(rows = table.len()))]
pub fn ingest_registry(
    table: &RecordTable,
    config: &EngineConfig,
) -> Result<(Vec<FarmRecord>, RegistryReport), SchemaError> {
    let cols = config.registry_schema.resolve(table)?;
    let mut report = RegistryReport::default();
    let mut farms = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for row in 0..table.len() {
        report.rows_seen += 1;

        let farm_id = text_or(table.cell(row, cols.farm_id), "");
        if farm_id.is_empty() {
            report.blank_farm_ids += 1;
            debug!(row, "Registry row without farm id skipped");
            continue;
        }
        // First row per farm id wins, whatever later filters decide about it.
        if !seen.insert(farm_id.clone()) {
            report.duplicate_farm_ids += 1;
            warn!(row, farm_id = %farm_id, "Repeated farm id; later row skipped");
            continue;
        }

        let flags = read_flags(table, row, &cols);
        if !flags.study_participant
            && config.participation == ParticipationPolicy::DropBeforeClassification
        {
            report.non_participants += 1;
            continue;
        }

        let group = classify(&flags);
        *report.groups_classified.entry(group.to_string()).or_default() += 1;

        if !flags.study_participant
            && config.participation == ParticipationPolicy::ClassifyThenFilter
        {
            report.non_participants += 1;
            continue;
        }

        if config.drop_unassigned && !group.is_evaluable() {
            report.unassigned_dropped += 1;
            debug!(farm_id = %farm_id, group = %group, "Farm without evaluable group skipped");
            continue;
        }

        *report.groups_retained.entry(group.to_string()).or_default() += 1;
        farms.push(FarmRecord {
            farmer_name: cols
                .farmer_name
                .map(|c| text_or(table.cell(row, c), "Unknown_Farmer"))
                .unwrap_or_else(|| "Unknown_Farmer".to_string()),
            village: cols
                .village
                .map(|c| text_or(table.cell(row, c), "Unknown_Village"))
                .unwrap_or_else(|| "Unknown_Village".to_string()),
            incentive_acres: cols
                .incentive_acres
                .map(|c| parse_acres(table.cell(row, c)))
                .unwrap_or(0.0),
            group,
            payment_eligible: group.payment_eligible(),
            study_participant: flags.study_participant,
            pipe_ids: read_pipe_ids(table, row, &cols),
            farm_id,
        });
    }

    report.farms_retained = farms.len();
    info!(
        rows = report.rows_seen,
        retained = report.farms_retained,
        non_participants = report.non_participants,
        duplicate_farm_ids = report.duplicate_farm_ids,
        unassigned_dropped = report.unassigned_dropped,
        "Registry ingested"
    );

    Ok((farms, report))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::analyzers::rule::RuleKind;
    use crate::periods::PeriodStrategy;
    use crate::registry::group::{SubStatus, Track};
    use crate::schema::RegistrySchema;

    pub(crate) fn farm(id: &str, pipes: &[&str]) -> FarmRecord {
        FarmRecord {
            farm_id: id.to_string(),
            farmer_name: "Farmer".to_string(),
            village: "Village".to_string(),
            incentive_acres: 10.0,
            group: Group::Assigned(Track::A, SubStatus::Complied),
            payment_eligible: true,
            study_participant: true,
            pipe_ids: pipes.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Registry with the default headers. Each row: id, acres, study, A/B/C
    /// as `"TC-"` style strings (treatment, complied, non-complied), pipes.
    pub(crate) fn registry_table(rows: &[(&str, &str, &str, [&str; 3], &[&str])]) -> RecordTable {
        let schema = RegistrySchema::default();
        let mut headers = vec![
            "Farm ID".to_string(),
            "Farmer Name".to_string(),
            "Village".to_string(),
            "Incentive Acres".to_string(),
            schema.study_flag.clone(),
        ];
        for t in [&schema.group_a, &schema.group_b, &schema.group_c] {
            headers.push(t.treatment.clone());
            headers.push(t.complied.clone());
            headers.push(t.non_complied.clone());
        }
        headers.extend(schema.pipe_codes.iter().cloned());

        let yn = |on: bool| if on { "Y" } else { "" }.to_string();
        let body = rows
            .iter()
            .map(|(id, acres, study, tracks, pipes)| {
                let mut r = vec![
                    id.to_string(),
                    format!("Farmer {id}"),
                    "Manjal Khurd".to_string(),
                    acres.to_string(),
                    study.to_string(),
                ];
                for t in tracks {
                    r.push(yn(t.contains('T')));
                    r.push(yn(t.contains('C')));
                    r.push(yn(t.contains('N')));
                }
                for i in 0..5 {
                    r.push(pipes.get(i).map(|p| p.to_string()).unwrap_or_default());
                }
                r
            })
            .collect();
        RecordTable::new(headers, body)
    }

    fn config(policy: ParticipationPolicy, drop_unassigned: bool) -> EngineConfig {
        let mut c = EngineConfig::new(PeriodStrategy::Fixed, RuleKind::TwoMeasurement);
        c.participation = policy;
        c.drop_unassigned = drop_unassigned;
        c
    }

    #[test]
    fn test_ingest_classifies_and_reads_pipes() {
        let table = registry_table(&[
            ("F1", "10", "Y", ["TC", "", ""], &["10028.0", " P2 ", "nan", "P2"]),
            ("F2", "-4", "1", ["", "TN", ""], &["P3"]),
        ]);
        let (farms, report) =
            ingest_registry(&table, &config(ParticipationPolicy::ClassifyThenFilter, true)).unwrap();

        assert_eq!(farms.len(), 2);
        assert_eq!(farms[0].group, Group::Assigned(Track::A, SubStatus::Complied));
        assert!(farms[0].payment_eligible);
        assert_eq!(farms[0].pipe_ids, vec!["10028", "P2"]);
        assert_eq!(farms[1].group, Group::Assigned(Track::B, SubStatus::NonComplied));
        assert!(!farms[1].payment_eligible);
        assert_eq!(farms[1].incentive_acres, 0.0);
        assert_eq!(report.farms_retained, 2);
    }

    #[test]
    fn test_participation_policies() {
        let table = registry_table(&[
            ("F1", "5", "N", ["TC", "", ""], &["P1"]),
            ("F2", "5", "Y", ["TC", "", ""], &["P2"]),
        ]);

        let (farms, report) =
            ingest_registry(&table, &config(ParticipationPolicy::DropBeforeClassification, true))
                .unwrap();
        assert_eq!(farms.len(), 1);
        assert_eq!(report.non_participants, 1);
        assert_eq!(report.groups_classified.get("A-Complied"), Some(&1));

        let (farms, report) =
            ingest_registry(&table, &config(ParticipationPolicy::ClassifyThenFilter, true))
                .unwrap();
        assert_eq!(farms.len(), 1);
        assert_eq!(report.groups_classified.get("A-Complied"), Some(&2));
        assert_eq!(report.groups_retained.get("A-Complied"), Some(&1));

        let (farms, _) =
            ingest_registry(&table, &config(ParticipationPolicy::Ignore, true)).unwrap();
        assert_eq!(farms.len(), 2);
        assert!(!farms[0].study_participant);
    }

    #[test]
    fn test_repeated_farm_id_keeps_first_row() {
        let table = registry_table(&[
            ("F1", "10", "Y", ["TC", "", ""], &["P1"]),
            ("F1", "25", "Y", ["", "TC", ""], &["P1", "P2"]),
            ("F2", "5", "Y", ["TC", "", ""], &["P3"]),
        ]);

        let (farms, report) =
            ingest_registry(&table, &config(ParticipationPolicy::ClassifyThenFilter, true))
                .unwrap();
        let ids: Vec<&str> = farms.iter().map(|f| f.farm_id.as_str()).collect();
        assert_eq!(ids, vec!["F1", "F2"]);
        assert_eq!(farms[0].incentive_acres, 10.0);
        assert_eq!(farms[0].pipe_ids, vec!["P1"]);
        assert_eq!(report.duplicate_farm_ids, 1);
        assert_eq!(report.farms_retained, 2);
    }

    #[test]
    fn test_unassigned_farms_dropped_when_configured() {
        let table = registry_table(&[
            ("F1", "5", "Y", ["T", "", ""], &["P1"]),
            ("F2", "5", "Y", ["", "", ""], &["P2"]),
            ("", "5", "Y", ["TC", "", ""], &["P3"]),
        ]);

        let (farms, report) =
            ingest_registry(&table, &config(ParticipationPolicy::ClassifyThenFilter, true))
                .unwrap();
        assert!(farms.is_empty());
        assert_eq!(report.unassigned_dropped, 2);
        assert_eq!(report.blank_farm_ids, 1);

        let (farms, _) =
            ingest_registry(&table, &config(ParticipationPolicy::ClassifyThenFilter, false))
                .unwrap();
        assert_eq!(farms.len(), 2);
        assert_eq!(farms[0].group, Group::Assigned(Track::A, SubStatus::Unassigned));
        assert_eq!(farms[1].group, Group::NoGroupAssigned);
    }
}
