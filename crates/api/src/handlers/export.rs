//! Export of labeled rows as CSV or JSON downloads.

use axum::extract::{Path, Query, State};
use axum::response::Response;
use eyelabel_core::export::{file_name, render, ExportFilter, ExportFormat, ExportRow};
use eyelabel_core::roles::Capability;
use eyelabel_core::row::Row;
use eyelabel_core::types::DbId;
use eyelabel_db::repositories::RowRepo;

use crate::error::AppResult;
use crate::handlers::datasets::find_dataset;
use crate::middleware::auth::AuthUser;
use crate::query::{ExportParams, FilteredExportParams};
use crate::response::attachment;
use crate::state::AppState;

/// GET /api/v1/datasets/{id}/export?format=csv|json[&user_id=]
///
/// Every saved row of the dataset. Admins get all users' copies unless they
/// pick one with `user_id`; labelers always get their own.
pub async fn export_all(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(dataset_id): Path<DbId>,
    Query(params): Query<ExportParams>,
) -> AppResult<Response> {
    find_dataset(&state, dataset_id).await?;
    let owner = export_scope(&auth, params.user_id)?;
    let rows = load_rows(&state, dataset_id, owner).await?;
    respond(dataset_id, &rows, false, params.format)
}

/// GET /api/v1/datasets/{id}/export/filtered?format=&flag=&step=&user=
///
/// Rows with a step, substep or flag, narrowed by flag, step and labeler email.
pub async fn export_filtered(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(dataset_id): Path<DbId>,
    Query(params): Query<FilteredExportParams>,
) -> AppResult<Response> {
    find_dataset(&state, dataset_id).await?;
    let owner = export_scope(&auth, None)?;
    let filter = ExportFilter::from_params(
        params.flag.as_deref(),
        params.step.as_deref(),
        params.user.as_deref(),
    );
    let rows = filter.apply(load_rows(&state, dataset_id, owner).await?);
    tracing::debug!(dataset_id, rows = rows.len(), ?filter, "Filtered export");
    respond(dataset_id, &rows, true, params.format)
}

/// `None` means every user's rows.
fn export_scope(auth: &AuthUser, requested: Option<DbId>) -> AppResult<Option<DbId>> {
    if auth.role.can(Capability::ExportAnyUser) {
        Ok(requested)
    } else {
        Ok(Some(auth.target_user(requested)?))
    }
}

async fn load_rows(
    state: &AppState,
    dataset_id: DbId,
    owner: Option<DbId>,
) -> AppResult<Vec<ExportRow>> {
    let records = RowRepo::list_owned(&state.pool, dataset_id, owner).await?;
    Ok(records
        .into_iter()
        .map(|r| ExportRow {
            user_id: r.user_id,
            user_email: r.user_email,
            row: Row::from(r.record),
        })
        .collect())
}

fn respond(
    dataset_id: DbId,
    rows: &[ExportRow],
    filtered: bool,
    format: ExportFormat,
) -> AppResult<Response> {
    let body = render(rows, format)?;
    Ok(attachment(
        format.content_type(),
        &file_name(dataset_id, filtered, format),
        body,
    ))
}
