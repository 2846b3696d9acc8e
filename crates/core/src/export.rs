//! Export serialization (CSV and JSON) and the export filter.

use serde::{Deserialize, Serialize};

use crate::csv::write_record;
use crate::error::CoreError;
use crate::row::{Column, Row};
use crate::types::DbId;

/// Column order of every CSV export.
pub const EXPORT_COLUMNS: [Column; 21] = [
    Column::EngagementId,
    Column::Timestamp,
    Column::RSph,
    Column::RCyl,
    Column::RAxis,
    Column::RAdd,
    Column::LSph,
    Column::LCyl,
    Column::LAxis,
    Column::LAdd,
    Column::Pd,
    Column::ChartNumber,
    Column::OccluderState,
    Column::ChartDisplay,
    Column::Step,
    Column::Substep,
    Column::IntentOfOptum,
    Column::ConfidenceOfOptum,
    Column::PatientConfidenceScore,
    Column::Flag,
    Column::ReasonForFlag,
];

/// Output format requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

/// A persisted row together with the labeler who owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub user_id: DbId,
    pub user_email: String,
    #[serde(flatten)]
    pub row: Row,
}

/// Fields of which at least one must be filled for a row to show up in the
/// labels view, and therefore in a filtered export.
///
/// Wider than progress evidence on `step` (a step-only row is listed) and
/// narrower on the free-text fields (an intent-only row is not).
pub const LABEL_VIEW_COLUMNS: [Column; 3] = [Column::Step, Column::Substep, Column::Flag];

/// Filter combination of the "filtered" export mode.
///
/// `None` means "all" for that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportFilter {
    pub flag: Option<String>,
    pub step: Option<String>,
    pub user_email: Option<String>,
}

impl ExportFilter {
    /// Build a filter from raw query values, treating absent, empty and
    /// `all` as no constraint.
    pub fn from_params(flag: Option<&str>, step: Option<&str>, user_email: Option<&str>) -> Self {
        fn constraint(value: Option<&str>) -> Option<String> {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
                .map(str::to_string)
        }
        Self {
            flag: constraint(flag),
            step: constraint(step),
            user_email: constraint(user_email),
        }
    }

    /// Whether `row` is in the labels view and passes every active constraint.
    pub fn matches(&self, row: &ExportRow) -> bool {
        if !in_label_view(&row.row) {
            return false;
        }
        if self.flag.as_deref().is_some_and(|f| row.row.flag != f) {
            return false;
        }
        if self.step.as_deref().is_some_and(|s| row.row.step != s) {
            return false;
        }
        if self
            .user_email
            .as_deref()
            .is_some_and(|e| !row.user_email.eq_ignore_ascii_case(e))
        {
            return false;
        }
        true
    }

    /// Keep only the rows that [`ExportFilter::matches`].
    pub fn apply(&self, rows: Vec<ExportRow>) -> Vec<ExportRow> {
        rows.into_iter().filter(|r| self.matches(r)).collect()
    }
}

/// Whether any of [`LABEL_VIEW_COLUMNS`] is non-blank.
pub fn in_label_view(row: &Row) -> bool {
    LABEL_VIEW_COLUMNS
        .iter()
        .any(|c| !c.get(row).trim().is_empty())
}

/// Serialize rows as CSV with an upper-cased header.
pub fn build_csv(rows: &[ExportRow], columns: &[Column]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);

    let header: Vec<String> = columns.iter().map(|c| c.name().to_uppercase()).collect();
    lines.push(write_record(&header));

    for export_row in rows {
        let values: Vec<&str> = columns.iter().map(|c| c.get(&export_row.row)).collect();
        lines.push(write_record(&values));
    }

    lines.join("\n")
}

/// Serialize rows as a pretty-printed JSON array.
pub fn build_json(rows: &[ExportRow]) -> Result<String, CoreError> {
    serde_json::to_string_pretty(rows)
        .map_err(|e| CoreError::Internal(format!("JSON export failed: {e}")))
}

/// Serialize rows in the requested format using [`EXPORT_COLUMNS`] for CSV.
pub fn render(rows: &[ExportRow], format: ExportFormat) -> Result<String, CoreError> {
    match format {
        ExportFormat::Csv => Ok(build_csv(rows, &EXPORT_COLUMNS)),
        ExportFormat::Json => build_json(rows),
    }
}

/// Attachment file name for an export of `dataset_id`.
pub fn file_name(dataset_id: DbId, filtered: bool, format: ExportFormat) -> String {
    let prefix = if filtered { "filtered_labeled_data" } else { "labeled_data" };
    format!("{prefix}_{dataset_id}.{}", format.extension())
}
