//! Row assignment model for the one-row-at-a-time labeling flow.

use eyelabel_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `row_assignments` table. One per (dataset, user).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RowAssignment {
    pub id: DbId,
    pub dataset_id: DbId,
    pub user_id: DbId,
    pub row_index: i32,
    pub assigned_at: Timestamp,
    pub expires_at: Timestamp,
}
