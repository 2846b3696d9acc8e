//! Cell editing: validation of a single edit and the client-side edit buffer.
//!
//! An edit never mutates a row in place. [`apply_cell_edit`] returns a new
//! [`Row`]; the [`EditBuffer`] swaps it in and, depending on its
//! [`SaveMode`], either marks the row dirty or hands it back for an
//! immediate write-through.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::CoreError;
use crate::row::{Column, Flag, Row, ANNOTATION_COLUMNS};
use crate::types::DbId;

/// Highest value accepted in a confidence score cell.
pub const MAX_SCORE: u8 = 10;

/// Annotation cells holding a 0-10 score.
pub const SCORE_COLUMNS: [Column; 2] = [Column::ConfidenceOfOptum, Column::PatientConfidenceScore];

/// Default autosave period of the bulk save mode.
pub const DEFAULT_AUTOSAVE_SECS: u64 = 5;

/// Validate `value` for `column` and return the value to store.
///
/// Flag and score cells are trimmed; free-text cells are kept verbatim.
pub fn validate_cell(column: Column, value: &str) -> Result<String, CoreError> {
    if !column.is_editable() {
        return Err(CoreError::Validation(format!(
            "Column '{column}' is read-only"
        )));
    }

    match column {
        Column::Flag => {
            Flag::parse_cell(value)?;
            Ok(value.trim().to_string())
        }
        Column::ConfidenceOfOptum | Column::PatientConfidenceScore => {
            validate_score(column, value)?;
            Ok(value.trim().to_string())
        }
        _ => Ok(value.to_string()),
    }
}

fn validate_score(column: Column, value: &str) -> Result<(), CoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(());
    }
    match value.parse::<u8>() {
        Ok(score) if score <= MAX_SCORE => Ok(()),
        _ => Err(CoreError::Validation(format!(
            "{column} must be a whole number between 0 and {MAX_SCORE}, got '{value}'"
        ))),
    }
}

/// Produce a copy of `row` with `column` set to `value`.
pub fn apply_cell_edit(row: &Row, column: Column, value: &str) -> Result<Row, CoreError> {
    let value = validate_cell(column, value)?;
    let mut edited = row.clone();
    *column.get_mut(&mut edited) = value;
    Ok(edited)
}

/// Check every annotation cell of `row`, as a bulk save does before writing.
pub fn validate_annotations(row: &Row) -> Result<(), CoreError> {
    for column in ANNOTATION_COLUMNS {
        validate_cell(column, column.get(row))?;
    }
    Ok(())
}

/// How edits reach storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// Edits accumulate as dirty rows, flushed on "Save All" or by the
    /// autosave timer.
    Bulk { autosave_secs: u64 },
    /// Every edit is upserted on its own as soon as it is made.
    WriteThrough,
}

impl Default for SaveMode {
    fn default() -> Self {
        Self::Bulk {
            autosave_secs: DEFAULT_AUTOSAVE_SECS,
        }
    }
}

impl SaveMode {
    /// Period of the autosave timer, if this mode has one.
    pub fn autosave_interval(self) -> Option<Duration> {
        match self {
            Self::Bulk { autosave_secs } if autosave_secs > 0 => {
                Some(Duration::from_secs(autosave_secs))
            }
            _ => None,
        }
    }
}

/// In-memory copy of a user's rows with dirty tracking.
#[derive(Debug, Clone)]
pub struct EditBuffer {
    rows: Vec<Row>,
    dirty: BTreeSet<i32>,
    mode: SaveMode,
}

impl EditBuffer {
    pub fn new(rows: Vec<Row>, mode: SaveMode) -> Self {
        Self {
            rows,
            dirty: BTreeSet::new(),
            mode,
        }
    }

    pub fn mode(&self) -> SaveMode {
        self.mode
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, row_id: i32) -> Option<&Row> {
        self.rows.iter().find(|r| r.id == row_id)
    }

    /// Apply an edit to the row with `row_id`.
    ///
    /// In write-through mode the edited row is returned for the caller to
    /// persist and nothing is marked dirty. In bulk mode the row is marked
    /// dirty and `None` is returned. A rejected edit leaves the buffer
    /// untouched.
    pub fn edit(&mut self, row_id: i32, column: Column, value: &str) -> Result<Option<Row>, CoreError> {
        let slot = self
            .rows
            .iter_mut()
            .find(|r| r.id == row_id)
            .ok_or(CoreError::NotFound {
                entity: "row",
                id: DbId::from(row_id),
            })?;

        let edited = apply_cell_edit(slot, column, value)?;
        if edited == *slot {
            return Ok(None);
        }
        *slot = edited;

        match self.mode {
            SaveMode::WriteThrough => Ok(Some(slot.clone())),
            SaveMode::Bulk { .. } => {
                self.dirty.insert(row_id);
                Ok(None)
            }
        }
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Drain the dirty set, returning the rows to flush in id order.
    pub fn take_dirty(&mut self) -> Vec<Row> {
        let dirty = std::mem::take(&mut self.dirty);
        self.rows
            .iter()
            .filter(|r| dirty.contains(&r.id))
            .cloned()
            .collect()
    }

    /// Replace the buffer contents with freshly loaded rows.
    ///
    /// Pending edits are discarded.
    pub fn reload(&mut self, rows: Vec<Row>) {
        self.rows = rows;
        self.dirty.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn rows(n: i32) -> Vec<Row> {
        (1..=n)
            .map(|id| Row {
                id,
                r_sph: "0.0".into(),
                ..Row::default()
            })
            .collect()
    }

    #[test]
    fn edit_returns_new_row_and_keeps_original() {
        let row = rows(1).remove(0);
        let edited = apply_cell_edit(&row, Column::Step, "Step 4").unwrap();
        assert_eq!(edited.step, "Step 4");
        assert!(row.step.is_empty());
        assert_eq!(edited.r_sph, row.r_sph);
    }

    #[test]
    fn source_columns_are_read_only() {
        let row = Row::default();
        assert_matches!(
            apply_cell_edit(&row, Column::RSph, "1.0"),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn flag_values_are_checked() {
        let row = Row::default();
        assert_eq!(apply_cell_edit(&row, Column::Flag, " RED ").unwrap().flag, "RED");
        assert_eq!(apply_cell_edit(&row, Column::Flag, "").unwrap().flag, "");
        assert!(apply_cell_edit(&row, Column::Flag, "PURPLE").is_err());
    }

    #[test]
    fn scores_must_be_between_zero_and_ten() {
        let row = Row::default();
        for ok in ["", "0", "7", "10", " 3 "] {
            assert!(apply_cell_edit(&row, Column::ConfidenceOfOptum, ok).is_ok(), "{ok}");
        }
        for bad in ["11", "-1", "5.5", "high", "95"] {
            assert!(
                apply_cell_edit(&row, Column::PatientConfidenceScore, bad).is_err(),
                "{bad}"
            );
        }
    }

    #[test]
    fn bulk_mode_marks_dirty_and_flushes_once() {
        let mut buffer = EditBuffer::new(rows(3), SaveMode::default());
        assert_eq!(buffer.edit(3, Column::Flag, "GREEN").unwrap(), None);
        assert_eq!(buffer.edit(1, Column::Substep, "a").unwrap(), None);
        assert_eq!(buffer.edit(3, Column::ReasonForFlag, "ok").unwrap(), None);
        assert_eq!(buffer.dirty_count(), 2);

        let flushed = buffer.take_dirty();
        let ids: Vec<i32> = flushed.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(flushed[1].reason_for_flag, "ok");
        assert!(!buffer.is_dirty());
        assert!(buffer.take_dirty().is_empty());
    }

    #[test]
    fn write_through_returns_row_to_persist() {
        let mut buffer = EditBuffer::new(rows(2), SaveMode::WriteThrough);
        let saved = buffer.edit(2, Column::IntentOfOptum, "cover left eye").unwrap();
        assert_eq!(saved.map(|r| r.intent_of_optum), Some("cover left eye".to_string()));
        assert!(!buffer.is_dirty());
    }

    #[test]
    fn no_op_edit_is_not_dirty() {
        let mut buffer = EditBuffer::new(rows(1), SaveMode::default());
        buffer.edit(1, Column::Step, "").unwrap();
        assert!(!buffer.is_dirty());
    }

    #[test]
    fn rejected_edit_leaves_buffer_unchanged() {
        let mut buffer = EditBuffer::new(rows(1), SaveMode::default());
        assert!(buffer.edit(1, Column::Flag, "nope").is_err());
        assert_matches!(
            buffer.edit(9, Column::Flag, "RED"),
            Err(CoreError::NotFound { entity: "row", id: 9 })
        );
        assert!(!buffer.is_dirty());
        assert_eq!(buffer.row(1).unwrap().flag, "");
    }

    #[test]
    fn autosave_interval_only_in_bulk_mode() {
        assert_eq!(
            SaveMode::default().autosave_interval(),
            Some(Duration::from_secs(5))
        );
        assert_eq!(SaveMode::Bulk { autosave_secs: 0 }.autosave_interval(), None);
        assert_eq!(SaveMode::WriteThrough.autosave_interval(), None);
    }

    #[test]
    fn annotations_validated_together() {
        let mut row = Row::default();
        row.confidence_of_optum = "8".into();
        row.flag = "YELLOW".into();
        assert!(validate_annotations(&row).is_ok());
        row.patient_confidence_score = "12".into();
        assert!(validate_annotations(&row).is_err());
    }
}
