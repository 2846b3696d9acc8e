//! Dataset entity, its stored upload, and DTOs.

use eyelabel_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `datasets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Dataset {
    pub id: DbId,
    pub name: String,
    pub total_rows: i32,
    pub uploaded_by: Option<DbId>,
    pub uploaded_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// The original uploaded file, kept verbatim.
#[derive(Debug, Clone, FromRow)]
pub struct DatasetUpload {
    pub dataset_id: DbId,
    pub file_name: String,
    pub content: Vec<u8>,
    pub size_bytes: i64,
    pub created_at: Timestamp,
}

/// DTO for creating a dataset together with its upload blob.
#[derive(Debug)]
pub struct CreateDataset {
    pub name: String,
    pub uploaded_by: Option<DbId>,
    pub file_name: String,
    pub content: Vec<u8>,
}
