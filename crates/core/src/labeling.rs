//! One-row-at-a-time labeling: submission rules and the session state machine.
//!
//! ```text
//! Loading --loaded(Some)--> Ready(row) --submit--> Submitting(row)
//!    |                        |   ^                    |
//!    |                      skip  +----submitted(Some)-+
//!    |                        v                        |
//!    +<------------------- Loading      submitted(None)--> NoMoreRows
//!    |
//!    +--loaded(None)--> NoMoreRows
//!
//! Loading | Submitting --failed--> Error --retry--> Loading
//! ```
//!
//! The server applies [`validate_submission`] again on submit, so a client
//! that bypasses the state machine still cannot store an invalid label.

use crate::editing::{apply_cell_edit, validate_annotations};
use crate::error::CoreError;
use crate::row::{Column, Flag, Row};

/// Check that a row may be submitted as labeled.
///
/// Step and intent are required. A reason is required unless the flag is
/// GREEN. Flag and score cells must hold valid values.
pub fn validate_submission(row: &Row) -> Result<(), CoreError> {
    let mut missing = Vec::new();
    if row.step.trim().is_empty() {
        missing.push(Column::Step.name());
    }
    if row.intent_of_optum.trim().is_empty() {
        missing.push(Column::IntentOfOptum.name());
    }

    let flag = Flag::parse_cell(&row.flag)?;
    if flag != Some(Flag::Green) && row.reason_for_flag.trim().is_empty() {
        missing.push(Column::ReasonForFlag.name());
    }

    if !missing.is_empty() {
        return Err(CoreError::Validation(format!(
            "Please fill all required fields: {}",
            missing.join(", ")
        )));
    }

    validate_annotations(row)
}

/// Client-side state of a labeling session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelingSession {
    /// Waiting for the server to assign a row.
    Loading,
    /// A row is assigned and being edited.
    Ready(Row),
    /// The edited row has been sent; waiting for the server.
    Submitting(Row),
    /// Every row of the dataset is labeled by this user.
    NoMoreRows,
    /// A request failed. Recoverable with [`LabelingSession::retry`].
    Error(String),
}

impl Default for LabelingSession {
    fn default() -> Self {
        Self::Loading
    }
}

impl LabelingSession {
    pub fn new() -> Self {
        Self::Loading
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Ready(_) => "ready",
            Self::Submitting(_) => "submitting",
            Self::NoMoreRows => "no_more_rows",
            Self::Error(_) => "error",
        }
    }

    /// The row currently shown, if any.
    pub fn current_row(&self) -> Option<&Row> {
        match self {
            Self::Ready(row) | Self::Submitting(row) => Some(row),
            _ => None,
        }
    }

    fn invalid(&self, action: &str) -> CoreError {
        CoreError::Conflict(format!("cannot {action} while {}", self.name()))
    }

    /// The server answered the "next row" request.
    pub fn loaded(&mut self, row: Option<Row>) -> Result<(), CoreError> {
        if !matches!(self, Self::Loading) {
            return Err(self.invalid("load a row"));
        }
        *self = match row {
            Some(row) => Self::Ready(row),
            None => Self::NoMoreRows,
        };
        Ok(())
    }

    /// Edit one annotation cell of the row being labeled.
    pub fn edit(&mut self, column: Column, value: &str) -> Result<(), CoreError> {
        match self {
            Self::Ready(row) => {
                *row = apply_cell_edit(row, column, value)?;
                Ok(())
            }
            _ => Err(self.invalid("edit")),
        }
    }

    /// Start submitting the current row.
    ///
    /// Returns the row to send. When validation fails the session stays in
    /// `Ready` and nothing should be sent.
    pub fn submit(&mut self) -> Result<Row, CoreError> {
        let Self::Ready(row) = &mut *self else {
            return Err(self.invalid("submit"));
        };
        validate_submission(row)?;
        let row = row.clone();
        *self = Self::Submitting(row.clone());
        Ok(row)
    }

    /// The submission was stored; `next` is the following assignment.
    pub fn submitted(&mut self, next: Option<Row>) -> Result<(), CoreError> {
        if !matches!(self, Self::Submitting(_)) {
            return Err(self.invalid("complete a submission"));
        }
        *self = match next {
            Some(row) => Self::Ready(row),
            None => Self::NoMoreRows,
        };
        Ok(())
    }

    /// Abandon the current row without saving edits.
    ///
    /// Returns the abandoned row's id so the caller can release it and ask
    /// for the row after it.
    pub fn skip(&mut self) -> Result<i32, CoreError> {
        let Self::Ready(row) = &mut *self else {
            return Err(self.invalid("skip"));
        };
        let row_id = row.id;
        *self = Self::Loading;
        Ok(row_id)
    }

    /// A request made while loading or submitting failed.
    pub fn failed(&mut self, message: impl Into<String>) -> Result<(), CoreError> {
        if !matches!(self, Self::Loading | Self::Submitting(_)) {
            return Err(self.invalid("record a failure"));
        }
        *self = Self::Error(message.into());
        Ok(())
    }

    /// Leave the error state and ask for a row again.
    pub fn retry(&mut self) -> Result<(), CoreError> {
        if !matches!(self, Self::Error(_)) {
            return Err(self.invalid("retry"));
        }
        *self = Self::Loading;
        Ok(())
    }
}
