//! The row model: one annotatable line of an eye-test transcript.
//!
//! A [`Row`] carries the read-only source fields imported from the CSV and
//! the editable annotation fields a labeler fills in. Cells are kept as
//! strings exactly as the grid shows them; typed checks (flag values,
//! score ranges) live in [`crate::editing`].

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Column registry
// ---------------------------------------------------------------------------

/// Every named cell of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    EngagementId,
    Timestamp,
    RSph,
    RCyl,
    RAxis,
    RAdd,
    LSph,
    LCyl,
    LAxis,
    LAdd,
    Pd,
    ChartNumber,
    OccluderState,
    ChartDisplay,
    Speaker,
    UtteranceText,
    Step,
    Substep,
    IntentOfOptum,
    ConfidenceOfOptum,
    PatientConfidenceScore,
    Flag,
    ReasonForFlag,
}

/// Read-only fields populated by ingestion, in storage order.
pub const SOURCE_COLUMNS: [Column; 16] = [
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
    Column::Speaker,
    Column::UtteranceText,
];

/// Editable annotation fields, in grid order.
pub const ANNOTATION_COLUMNS: [Column; 7] = [
    Column::Step,
    Column::Substep,
    Column::IntentOfOptum,
    Column::ConfidenceOfOptum,
    Column::PatientConfidenceScore,
    Column::Flag,
    Column::ReasonForFlag,
];

/// Source fields used to detect blank and repeated measurement rows.
pub const COMPARE_COLUMNS: [Column; 12] = [
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
];

impl Column {
    /// Field name as used in CSV headers (lower-case) and JSON keys.
    pub fn name(self) -> &'static str {
        match self {
            Self::EngagementId => "engagement_id",
            Self::Timestamp => "timestamp",
            Self::RSph => "r_sph",
            Self::RCyl => "r_cyl",
            Self::RAxis => "r_axis",
            Self::RAdd => "r_add",
            Self::LSph => "l_sph",
            Self::LCyl => "l_cyl",
            Self::LAxis => "l_axis",
            Self::LAdd => "l_add",
            Self::Pd => "pd",
            Self::ChartNumber => "chart_number",
            Self::OccluderState => "occluder_state",
            Self::ChartDisplay => "chart_display",
            Self::Speaker => "speaker",
            Self::UtteranceText => "utterance_text",
            Self::Step => "step",
            Self::Substep => "substep",
            Self::IntentOfOptum => "intent_of_optum",
            Self::ConfidenceOfOptum => "confidence_of_optum",
            Self::PatientConfidenceScore => "patient_confidence_score",
            Self::Flag => "flag",
            Self::ReasonForFlag => "reason_for_flag",
        }
    }

    /// Look up a column by its field name.
    pub fn from_name(name: &str) -> Option<Self> {
        SOURCE_COLUMNS
            .iter()
            .chain(ANNOTATION_COLUMNS.iter())
            .copied()
            .find(|c| c.name() == name)
    }

    pub fn is_editable(self) -> bool {
        ANNOTATION_COLUMNS.contains(&self)
    }

    /// Borrow this column's cell from `row`.
    pub fn get(self, row: &Row) -> &str {
        match self {
            Self::EngagementId => &row.engagement_id,
            Self::Timestamp => &row.timestamp,
            Self::RSph => &row.r_sph,
            Self::RCyl => &row.r_cyl,
            Self::RAxis => &row.r_axis,
            Self::RAdd => &row.r_add,
            Self::LSph => &row.l_sph,
            Self::LCyl => &row.l_cyl,
            Self::LAxis => &row.l_axis,
            Self::LAdd => &row.l_add,
            Self::Pd => &row.pd,
            Self::ChartNumber => &row.chart_number,
            Self::OccluderState => &row.occluder_state,
            Self::ChartDisplay => &row.chart_display,
            Self::Speaker => &row.speaker,
            Self::UtteranceText => &row.utterance_text,
            Self::Step => &row.step,
            Self::Substep => &row.substep,
            Self::IntentOfOptum => &row.intent_of_optum,
            Self::ConfidenceOfOptum => &row.confidence_of_optum,
            Self::PatientConfidenceScore => &row.patient_confidence_score,
            Self::Flag => &row.flag,
            Self::ReasonForFlag => &row.reason_for_flag,
        }
    }

    /// Mutable access to this column's cell.
    pub fn get_mut(self, row: &mut Row) -> &mut String {
        match self {
            Self::EngagementId => &mut row.engagement_id,
            Self::Timestamp => &mut row.timestamp,
            Self::RSph => &mut row.r_sph,
            Self::RCyl => &mut row.r_cyl,
            Self::RAxis => &mut row.r_axis,
            Self::RAdd => &mut row.r_add,
            Self::LSph => &mut row.l_sph,
            Self::LCyl => &mut row.l_cyl,
            Self::LAxis => &mut row.l_axis,
            Self::LAdd => &mut row.l_add,
            Self::Pd => &mut row.pd,
            Self::ChartNumber => &mut row.chart_number,
            Self::OccluderState => &mut row.occluder_state,
            Self::ChartDisplay => &mut row.chart_display,
            Self::Speaker => &mut row.speaker,
            Self::UtteranceText => &mut row.utterance_text,
            Self::Step => &mut row.step,
            Self::Substep => &mut row.substep,
            Self::IntentOfOptum => &mut row.intent_of_optum,
            Self::ConfidenceOfOptum => &mut row.confidence_of_optum,
            Self::PatientConfidenceScore => &mut row.patient_confidence_score,
            Self::Flag => &mut row.flag,
            Self::ReasonForFlag => &mut row.reason_for_flag,
        }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Flag
// ---------------------------------------------------------------------------

/// Quality marker a labeler attaches to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Flag {
    /// Compulsory step of the eye test.
    Green,
    /// Step that may be ignored.
    Yellow,
    /// Not part of the eye test; excluded.
    Red,
    /// Explicitly marked as carrying no flag.
    None,
}

impl Flag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Green => "GREEN",
            Self::Yellow => "YELLOW",
            Self::Red => "RED",
            Self::None => "NONE",
        }
    }

    /// Parse a flag cell. An empty cell is the unset state and yields `Ok(None)`.
    pub fn parse_cell(value: &str) -> Result<Option<Self>, CoreError> {
        match value.trim() {
            "" => Ok(None),
            "GREEN" => Ok(Some(Self::Green)),
            "YELLOW" => Ok(Some(Self::Yellow)),
            "RED" => Ok(Some(Self::Red)),
            "NONE" => Ok(Some(Self::None)),
            other => Err(CoreError::Validation(format!(
                "Invalid flag '{other}'; expected GREEN, YELLOW, RED or NONE"
            ))),
        }
    }
}

impl std::fmt::Display for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Row
// ---------------------------------------------------------------------------

/// One row of a dataset as seen by a single labeler.
///
/// `id` is the 1-based sequential index assigned at ingestion, serialized
/// as `row_index`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Row {
    #[serde(rename = "row_index", alias = "id")]
    pub id: i32,

    pub engagement_id: String,
    pub timestamp: String,
    pub r_sph: String,
    pub r_cyl: String,
    pub r_axis: String,
    pub r_add: String,
    pub l_sph: String,
    pub l_cyl: String,
    pub l_axis: String,
    pub l_add: String,
    pub pd: String,
    pub chart_number: String,
    pub occluder_state: String,
    pub chart_display: String,
    pub speaker: String,
    pub utterance_text: String,

    pub step: String,
    pub substep: String,
    pub intent_of_optum: String,
    pub confidence_of_optum: String,
    pub patient_confidence_score: String,
    pub flag: String,
    pub reason_for_flag: String,
}

impl Row {
    /// Reset every annotation field to empty, leaving source fields intact.
    pub fn clear_annotations(&mut self) {
        for column in ANNOTATION_COLUMNS {
            column.get_mut(self).clear();
        }
    }

    /// Whether every compare column is blank after trimming.
    pub fn compare_columns_blank(&self) -> bool {
        COMPARE_COLUMNS.iter().all(|c| c.get(self).trim().is_empty())
    }

    /// Whether every compare column equals the corresponding cell of `other`.
    pub fn same_measurements(&self, other: &Row) -> bool {
        COMPARE_COLUMNS.iter().all(|c| c.get(self) == c.get(other))
    }

    /// Whether this row is the instrument's default configuration
    /// (plano lenses, 64 mm PD, binocular, chart 1 showing the large E).
    pub fn is_default(&self) -> bool {
        DEFAULT_CONFIGURATION
            .iter()
            .all(|(column, value)| column.get(self) == *value)
    }
}

/// Cell values of the instrument's default configuration row.
const DEFAULT_CONFIGURATION: [(Column, &str); 12] = [
    (Column::RSph, "0.0"),
    (Column::RCyl, "0.0"),
    (Column::RAxis, "180.0"),
    (Column::RAdd, "0.0"),
    (Column::LSph, "0.0"),
    (Column::LCyl, "0.0"),
    (Column::LAxis, "180.0"),
    (Column::LAdd, "0.0"),
    (Column::Pd, "64.0"),
    (Column::ChartNumber, "Chart1"),
    (Column::OccluderState, "Bino"),
    (Column::ChartDisplay, "Large black 'E' in a white box"),
];

/// Compare columns whose value differs from the previous row.
///
/// The first row of a dataset has no predecessor and reports no changes.
pub fn changed_columns(current: &Row, previous: Option<&Row>) -> Vec<Column> {
    match previous {
        None => Vec::new(),
        Some(prev) => COMPARE_COLUMNS
            .iter()
            .copied()
            .filter(|c| c.get(current) != c.get(prev))
            .collect(),
    }
}
