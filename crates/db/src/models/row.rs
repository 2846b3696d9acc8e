//! Row records: a source row joined with one user's annotations.

use eyelabel_core::row::Row;
use eyelabel_core::types::DbId;
use sqlx::FromRow;

/// A source row merged with one labeler's annotation copy.
///
/// Annotation columns are `''` when the user has not saved the row yet.
#[derive(Debug, Clone, FromRow)]
pub struct RowRecord {
    pub row_index: i32,
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

impl From<RowRecord> for Row {
    fn from(r: RowRecord) -> Self {
        Row {
            id: r.row_index,
            engagement_id: r.engagement_id,
            timestamp: r.timestamp,
            r_sph: r.r_sph,
            r_cyl: r.r_cyl,
            r_axis: r.r_axis,
            r_add: r.r_add,
            l_sph: r.l_sph,
            l_cyl: r.l_cyl,
            l_axis: r.l_axis,
            l_add: r.l_add,
            pd: r.pd,
            chart_number: r.chart_number,
            occluder_state: r.occluder_state,
            chart_display: r.chart_display,
            speaker: r.speaker,
            utterance_text: r.utterance_text,
            step: r.step,
            substep: r.substep,
            intent_of_optum: r.intent_of_optum,
            confidence_of_optum: r.confidence_of_optum,
            patient_confidence_score: r.patient_confidence_score,
            flag: r.flag,
            reason_for_flag: r.reason_for_flag,
        }
    }
}

/// A row record together with the labeler who saved it.
#[derive(Debug, Clone, FromRow)]
pub struct OwnedRowRecord {
    pub user_id: DbId,
    pub user_email: String,
    #[sqlx(flatten)]
    pub record: RowRecord,
}
