//! Handlers for one-row-at-a-time labeling.
//!
//! The server hands each labeler one row at a time through a short-lived
//! assignment. A submission is accepted only for the row currently
//! assigned to the caller and only if it passes [`validate_submission`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use eyelabel_core::error::CoreError;
use eyelabel_core::labeling::validate_submission;
use eyelabel_core::row::Row;
use eyelabel_core::types::{DbId, Timestamp};
use eyelabel_db::models::assignment::RowAssignment;
use eyelabel_db::repositories::{AssignmentRepo, RowRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::datasets::find_dataset;
use crate::handlers::rows::{find_row, row_view, RowView};
use crate::middleware::auth::AuthUser;
use crate::query::NextRowParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// The row a labeler is working on and when the hold lapses.
#[derive(Debug, Serialize)]
pub struct AssignedRow {
    pub row: RowView,
    pub expires_at: Timestamp,
}

/// Response of a successful submission: the next row, if any remain.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub saved_row_index: i32,
    pub next: Option<AssignedRow>,
}

/// Request body for `POST .../labeling/release`.
#[derive(Debug, Deserialize)]
pub struct ReleaseRequest {
    pub row_index: i32,
}

/// POST /api/v1/datasets/{id}/labeling/next[?after=]
///
/// Without `after`, a live assignment is returned as is. With `after`
/// (skip), the next unlabeled row past it is assigned, wrapping around.
/// 404 when the caller has labeled every row.
pub async fn next_row(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(dataset_id): Path<DbId>,
    Query(params): Query<NextRowParams>,
) -> AppResult<Json<DataResponse<AssignedRow>>> {
    find_dataset(&state, dataset_id).await?;

    let existing = match params.after {
        None => AssignmentRepo::find_active(&state.pool, dataset_id, auth.user_id).await?,
        Some(_) => None,
    };
    let assignment = match existing {
        Some(assignment) => Some(assignment),
        None => assign(&state, dataset_id, auth.user_id, params.after).await?,
    };

    let assignment = assignment.ok_or(AppError::Core(CoreError::NotFound {
        entity: "unlabeled row in dataset",
        id: dataset_id,
    }))?;
    Ok(Json(DataResponse {
        data: assigned_row(&state, assignment).await?,
    }))
}

/// POST /api/v1/datasets/{id}/labeling/submit
///
/// Body is the edited row. Only annotation fields are stored.
pub async fn submit_row(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(dataset_id): Path<DbId>,
    Json(row): Json<Row>,
) -> AppResult<Json<DataResponse<SubmitResponse>>> {
    find_dataset(&state, dataset_id).await?;
    validate_submission(&row)?;

    let assignment = AssignmentRepo::find_active(&state.pool, dataset_id, auth.user_id).await?;
    if assignment.as_ref().map(|a| a.row_index) != Some(row.id) {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Row {} is not currently assigned to you",
            row.id
        ))));
    }

    RowRepo::upsert_annotation(&state.pool, dataset_id, auth.user_id, &row).await?;
    AssignmentRepo::release(&state.pool, dataset_id, auth.user_id, row.id).await?;
    tracing::info!(dataset_id, user_id = auth.user_id, row_index = row.id, "Row labeled");

    let next = match assign(&state, dataset_id, auth.user_id, Some(row.id)).await? {
        Some(assignment) => Some(assigned_row(&state, assignment).await?),
        None => None,
    };

    Ok(Json(DataResponse {
        data: SubmitResponse {
            saved_row_index: row.id,
            next,
        },
    }))
}

/// POST /api/v1/datasets/{id}/labeling/release
///
/// Give up the assigned row without saving. Returns 204 No Content.
pub async fn release_row(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(dataset_id): Path<DbId>,
    Json(input): Json<ReleaseRequest>,
) -> AppResult<StatusCode> {
    find_dataset(&state, dataset_id).await?;
    if !AssignmentRepo::release(&state.pool, dataset_id, auth.user_id, input.row_index).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "assignment for row",
            id: DbId::from(input.row_index),
        }));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn assign(
    state: &AppState,
    dataset_id: DbId,
    user_id: DbId,
    after: Option<i32>,
) -> AppResult<Option<RowAssignment>> {
    Ok(AssignmentRepo::assign_next(
        &state.pool,
        dataset_id,
        user_id,
        after,
        state.config.assignment_timeout_mins,
    )
    .await?)
}

async fn assigned_row(state: &AppState, assignment: RowAssignment) -> AppResult<AssignedRow> {
    let row = find_row(
        state,
        assignment.dataset_id,
        assignment.user_id,
        assignment.row_index,
    )
    .await?;
    Ok(AssignedRow {
        row: row_view(state, assignment.dataset_id, assignment.user_id, row).await?,
        expires_at: assignment.expires_at,
    })
}
