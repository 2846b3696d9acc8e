//! Handlers for a labeler's rows: the labeling grid and its two save modes.
//!
//! "Save All" sends every dirty row at once (`PUT .../rows`); write-through
//! editing sends one cell at a time (`PATCH .../rows/{row_index}`). Both
//! write only the caller's own annotation copy.

use axum::extract::{Path, Query, State};
use axum::Json;
use eyelabel_core::editing::{apply_cell_edit, validate_annotations};
use eyelabel_core::error::CoreError;
use eyelabel_core::row::{changed_columns, Column, Row};
use eyelabel_core::types::DbId;
use eyelabel_db::repositories::RowRepo;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::datasets::find_dataset;
use crate::middleware::auth::AuthUser;
use crate::query::UserScopeParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// A row plus the display hints of the grid.
#[derive(Debug, Serialize)]
pub struct RowView {
    #[serde(flatten)]
    pub row: Row,
    /// The row shows the instrument's default configuration.
    pub is_default: bool,
    /// Compare columns that differ from the previous row.
    pub changed_fields: Vec<&'static str>,
}

impl RowView {
    pub fn new(row: Row, previous: Option<&Row>) -> Self {
        let changed_fields = changed_columns(&row, previous)
            .into_iter()
            .map(Column::name)
            .collect();
        Self {
            is_default: row.is_default(),
            changed_fields,
            row,
        }
    }
}

/// Request body for `PUT /datasets/{id}/rows`.
#[derive(Debug, Deserialize)]
pub struct SaveRowsRequest {
    pub rows: Vec<Row>,
}

#[derive(Debug, Serialize)]
pub struct SaveRowsResponse {
    pub saved: u64,
}

/// Request body for `PATCH /datasets/{id}/rows/{row_index}`.
#[derive(Debug, Deserialize)]
pub struct CellEditRequest {
    pub field: String,
    pub value: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/datasets/{id}/rows[?user_id=]
///
/// The caller's rows in order. Admins may pass `user_id` to review another
/// labeler's copy.
pub async fn list_rows(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(dataset_id): Path<DbId>,
    Query(params): Query<UserScopeParams>,
) -> AppResult<Json<DataResponse<Vec<RowView>>>> {
    let user_id = auth.target_user(params.user_id)?;
    find_dataset(&state, dataset_id).await?;

    let rows: Vec<Row> = RowRepo::list_for_user(&state.pool, dataset_id, user_id)
        .await?
        .into_iter()
        .map(Row::from)
        .collect();

    let views = rows
        .iter()
        .enumerate()
        .map(|(i, row)| RowView::new(row.clone(), i.checked_sub(1).map(|p| &rows[p])))
        .collect();

    Ok(Json(DataResponse { data: views }))
}

/// PUT /api/v1/datasets/{id}/rows
///
/// Save the annotation fields of many rows at once. Every row is validated
/// before anything is written; source fields in the body are ignored.
pub async fn save_rows(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(dataset_id): Path<DbId>,
    Json(input): Json<SaveRowsRequest>,
) -> AppResult<Json<DataResponse<SaveRowsResponse>>> {
    find_dataset(&state, dataset_id).await?;

    for row in &input.rows {
        validate_annotations(row).map_err(|e| match e {
            CoreError::Validation(msg) => {
                CoreError::Validation(format!("Row {}: {msg}", row.id))
            }
            other => other,
        })?;
    }

    let saved = RowRepo::upsert_annotations(&state.pool, dataset_id, auth.user_id, &input.rows)
        .await?;
    tracing::debug!(dataset_id, user_id = auth.user_id, saved, "Rows saved");

    Ok(Json(DataResponse {
        data: SaveRowsResponse { saved },
    }))
}

/// PATCH /api/v1/datasets/{id}/rows/{row_index}
///
/// Write-through edit of a single annotation cell. Returns the updated row.
pub async fn edit_cell(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((dataset_id, row_index)): Path<(DbId, i32)>,
    Json(input): Json<CellEditRequest>,
) -> AppResult<Json<DataResponse<RowView>>> {
    let column = Column::from_name(&input.field).ok_or_else(|| {
        AppError::Core(CoreError::Validation(format!(
            "Unknown field '{}'",
            input.field
        )))
    })?;

    let current = find_row(&state, dataset_id, auth.user_id, row_index).await?;
    let edited = apply_cell_edit(&current, column, &input.value)?;
    if edited != current {
        RowRepo::upsert_annotation(&state.pool, dataset_id, auth.user_id, &edited).await?;
    }

    let view = row_view(&state, dataset_id, auth.user_id, edited).await?;
    Ok(Json(DataResponse { data: view }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load one row of the caller's copy, or 404.
pub(crate) async fn find_row(
    state: &AppState,
    dataset_id: DbId,
    user_id: DbId,
    row_index: i32,
) -> AppResult<Row> {
    RowRepo::find_for_user(&state.pool, dataset_id, user_id, row_index)
        .await?
        .map(Row::from)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "row",
            id: DbId::from(row_index),
        }))
}

/// Wrap `row` with display hints computed against its predecessor.
pub(crate) async fn row_view(
    state: &AppState,
    dataset_id: DbId,
    user_id: DbId,
    row: Row,
) -> AppResult<RowView> {
    let previous = RowRepo::find_for_user(&state.pool, dataset_id, user_id, row.id - 1)
        .await?
        .map(Row::from);
    Ok(RowView::new(row, previous.as_ref()))
}
