//! CSV ingestion: header normalisation, row mapping, and deduplication.
//!
//! Ingestion is a single pass over the uploaded text:
//!
//! 1. Parse records; the first is the header, blank lines are skipped.
//! 2. Map each data record onto a [`Row`]. Only source columns are read;
//!    annotation fields always start empty, whatever the file contains.
//! 3. Drop rows whose compare columns are all blank.
//! 4. Drop rows whose compare columns equal the previous surviving row.
//! 5. Number the survivors 1, 2, 3, ...
//!
//! Records shorter than the header yield blank cells for the missing
//! columns; longer records have their extra cells ignored.

use serde::Serialize;

use crate::csv::parse_records;
use crate::error::CoreError;
use crate::row::{Column, Row, SOURCE_COLUMNS};

/// Alternative header spellings seen in exported transcripts.
const HEADER_ALIASES: &[(&str, &str)] = &[
    ("utterance", "utterance_text"),
    ("transcription", "utterance_text"),
    ("text", "utterance_text"),
    ("speaker_id", "speaker"),
    ("session", "engagement_id"),
    ("session_id", "engagement_id"),
];

/// Counters describing what ingestion did with the file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Data records found after the header.
    pub parsed: usize,
    /// Rows dropped because every compare column was blank.
    pub dropped_blank: usize,
    /// Rows dropped because they repeated the previous row's measurements.
    pub dropped_duplicate: usize,
    /// Rows that survived and were numbered.
    pub kept: usize,
}

/// Result of ingesting one CSV file.
#[derive(Debug, Clone)]
pub struct Ingestion {
    pub rows: Vec<Row>,
    pub report: IngestReport,
    /// Header names that did not match any source column.
    pub ignored_columns: Vec<String>,
}

/// Normalise a raw header cell to a field name.
///
/// Trims, lower-cases, turns spaces into underscores and resolves aliases.
pub fn normalize_header(raw: &str) -> String {
    let name = raw.trim().to_lowercase().replace(' ', "_");
    HEADER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, target)| (*target).to_string())
        .unwrap_or(name)
}

/// Normalise a raw data cell. Missing values exported as `nan` become blank.
fn normalize_cell(raw: &str) -> String {
    let value = raw.trim();
    if value.eq_ignore_ascii_case("nan") {
        String::new()
    } else {
        value.to_string()
    }
}

/// Parse and deduplicate an uploaded CSV.
///
/// Fails only when the text has no header row at all.
pub fn ingest_csv(text: &str) -> Result<Ingestion, CoreError> {
    let mut records = parse_records(text).into_iter();

    let header = records
        .next()
        .ok_or_else(|| CoreError::Validation("CSV is empty".into()))?;

    let mut mapping: Vec<Option<Column>> = Vec::with_capacity(header.len());
    let mut ignored_columns = Vec::new();
    for raw in &header {
        let name = normalize_header(raw);
        let column = Column::from_name(&name).filter(|c| SOURCE_COLUMNS.contains(c));
        match column {
            Some(c) if !mapping.contains(&Some(c)) => mapping.push(Some(c)),
            _ => {
                if !name.is_empty() {
                    ignored_columns.push(name);
                }
                mapping.push(None);
            }
        }
    }

    let parsed: Vec<Row> = records.map(|record| map_record(&mapping, &record)).collect();
    let parsed_count = parsed.len();
    let (rows, dropped_blank, dropped_duplicate) = dedup_rows(parsed);

    Ok(Ingestion {
        report: IngestReport {
            parsed: parsed_count,
            dropped_blank,
            dropped_duplicate,
            kept: rows.len(),
        },
        rows,
        ignored_columns,
    })
}

fn map_record(mapping: &[Option<Column>], record: &[String]) -> Row {
    let mut row = Row::default();
    for (index, column) in mapping.iter().enumerate() {
        if let (Some(column), Some(value)) = (column, record.get(index)) {
            *column.get_mut(&mut row) = normalize_cell(value);
        }
    }
    row.clear_annotations();
    row
}

/// Drop blank and adjacent-duplicate rows, then renumber from 1.
///
/// Returns the surviving rows with the blank and duplicate drop counts.
pub fn dedup_rows(rows: Vec<Row>) -> (Vec<Row>, usize, usize) {
    let mut kept: Vec<Row> = Vec::with_capacity(rows.len());
    let mut dropped_blank = 0;
    let mut dropped_duplicate = 0;

    for row in rows {
        if row.compare_columns_blank() {
            dropped_blank += 1;
            continue;
        }
        if kept.last().is_some_and(|prev| prev.same_measurements(&row)) {
            dropped_duplicate += 1;
            continue;
        }
        kept.push(row);
    }

    for (index, row) in kept.iter_mut().enumerate() {
        row.id = index as i32 + 1;
    }

    (kept, dropped_blank, dropped_duplicate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::COMPARE_COLUMNS;

    const HEADER: &str = "Timestamp,R_SPH,R_CYL,R_AXIS,R_ADD,L_SPH,L_CYL,L_AXIS,L_ADD,PD,\
                          Chart_Number,Occluder_State,Chart_Display,Speaker,Utterance";

    #[test]
    fn six_line_scenario_yields_three_rows() {
        let csv = format!(
            "{HEADER}\n\
             10:00,0.0,0.0,180.0,0.0,0.0,0.0,180.0,0.0,64.0,Chart1,Bino,E,Optum,hello\n\
             10:01,-0.25,0.0,180.0,0.0,0.0,0.0,180.0,0.0,64.0,Chart1,Left,E,Optum,cover left\n\
             10:02,-0.25,0.0,180.0,0.0,0.0,0.0,180.0,0.0,64.0,Chart1,Left,E,Patient,ok\n\
             10:03,-0.50,0.0,180.0,0.0,0.0,0.0,180.0,0.0,64.0,Chart1,Left,E,Optum,better?\n\
             10:04,,,,,,,,,,,,,Patient,yes\n"
        );

        let ingestion = ingest_csv(&csv).unwrap();
        let ids: Vec<i32> = ingestion.rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(ingestion.rows[1].timestamp, "10:01");
        assert_eq!(ingestion.rows[2].r_sph, "-0.50");
        assert_eq!(
            ingestion.report,
            IngestReport {
                parsed: 5,
                dropped_blank: 1,
                dropped_duplicate: 1,
                kept: 3,
            }
        );
    }

    #[test]
    fn headers_are_normalised_and_aliased() {
        assert_eq!(normalize_header(" Chart Number "), "chart_number");
        assert_eq!(normalize_header("Session_ID"), "engagement_id");
        assert_eq!(normalize_header("Utterance"), "utterance_text");
        assert_eq!(normalize_header("R_SPH"), "r_sph");
    }

    #[test]
    fn annotation_columns_in_source_are_ignored() {
        let csv = "r_sph,pd,step,patient_confidence_score,flag\n0.0,64.0,Step 3,7,RED\n";
        let ingestion = ingest_csv(csv).unwrap();
        let row = &ingestion.rows[0];
        assert!(row.step.is_empty());
        assert!(row.patient_confidence_score.is_empty());
        assert!(row.flag.is_empty());
        assert_eq!(
            ingestion.ignored_columns,
            vec!["step", "patient_confidence_score", "flag"]
        );
    }

    #[test]
    fn short_records_get_blank_cells() {
        let csv = "r_sph,r_cyl,pd,chart_number\n-1.0,0.5\n";
        let ingestion = ingest_csv(csv).unwrap();
        let row = &ingestion.rows[0];
        assert_eq!(row.r_cyl, "0.5");
        assert!(row.pd.is_empty());
        assert!(row.chart_number.is_empty());
    }

    #[test]
    fn nan_cells_count_as_blank() {
        let csv = "r_sph,pd,speaker\nnan,NaN,Optum\n0.0,64.0,Optum\n";
        let ingestion = ingest_csv(csv).unwrap();
        assert_eq!(ingestion.rows.len(), 1);
        assert_eq!(ingestion.report.dropped_blank, 1);
    }

    #[test]
    fn duplicates_compare_against_previous_survivor() {
        // A blank row between two identical rows does not break the run.
        let csv = "r_sph,pd\n0.0,64.0\n,\n0.0,64.0\n0.25,64.0\n0.0,64.0\n";
        let ingestion = ingest_csv(csv).unwrap();
        let values: Vec<&str> = ingestion.rows.iter().map(|r| r.r_sph.as_str()).collect();
        assert_eq!(values, vec!["0.0", "0.25", "0.0"]);
    }

    #[test]
    fn ingestion_is_idempotent() {
        let csv = "r_sph,pd,chart_display\n0.0,64.0,E\n0.0,64.0,E\n0.5,64.0,\"E, large\"\n";
        let first = ingest_csv(csv).unwrap();

        let mut again = String::from("r_sph,pd,chart_display\n");
        for row in &first.rows {
            again.push_str(&crate::csv::write_record(&[&row.r_sph, &row.pd, &row.chart_display]));
            again.push('\n');
        }
        let second = ingest_csv(&again).unwrap();
        assert_eq!(first.rows, second.rows);
        assert_eq!(second.report.dropped_duplicate, 0);
    }

    #[test]
    fn survivors_never_blank_and_never_repeat() {
        let csv = "r_sph,l_sph,pd\n,,\n1,1,64\n1,1,64\n,,\n2,1,64\n2,1,64\n1,1,64\n";
        let rows = ingest_csv(csv).unwrap().rows;
        for row in &rows {
            assert!(COMPARE_COLUMNS.iter().any(|c| !c.get(row).is_empty()));
        }
        for pair in rows.windows(2) {
            assert!(!pair[1].same_measurements(&pair[0]));
        }
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, (1..=rows.len() as i32).collect::<Vec<_>>());
    }

    #[test]
    fn empty_text_is_rejected() {
        assert!(ingest_csv("").is_err());
        assert!(ingest_csv("\n\n").is_err());
    }

    #[test]
    fn header_only_yields_no_rows() {
        let ingestion = ingest_csv("r_sph,pd\n").unwrap();
        assert!(ingestion.rows.is_empty());
        assert_eq!(ingestion.report.kept, 0);
    }
}
