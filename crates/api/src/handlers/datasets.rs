//! Handlers for the `/datasets` resource: upload, list, get, delete and
//! download of the original file.

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use eyelabel_core::error::CoreError;
use eyelabel_core::ingest::{ingest_csv, IngestReport};
use eyelabel_core::progress::{aggregate, dataset_visible, DatasetProgress, OwnedRow};
use eyelabel_core::roles::{Capability, Role};
use eyelabel_core::row::Row;
use eyelabel_core::types::{DbId, Timestamp};
use eyelabel_db::models::dataset::{CreateDataset, Dataset};
use eyelabel_db::repositories::{DatasetRepo, RowRepo};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::CreateDatasetParams;
use crate::response::{attachment, DataResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// A dataset as shown in the dataset list.
#[derive(Debug, Serialize)]
pub struct DatasetSummary {
    pub id: DbId,
    pub name: String,
    pub total_rows: i32,
    /// Rows the caller has labeled.
    pub labeled_count: i64,
    /// Users who have labeled every row.
    pub completed_users: usize,
    pub uploaded_by: Option<DbId>,
    pub uploaded_at: Timestamp,
}

/// Response of a successful upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub dataset: DatasetSummary,
    pub report: IngestReport,
    pub ignored_columns: Vec<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/datasets?name=
///
/// Multipart upload with a `file` field holding a `.csv`. The file is
/// ingested, deduplicated and stored with all surviving rows in one
/// transaction.
pub async fn upload_dataset(
    State(state): State<AppState>,
    admin: AuthUser,
    Query(params): Query<CreateDatasetParams>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<UploadResponse>>)> {
    admin.require(Capability::UploadDataset)?;

    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("").to_string();
        let data = field.bytes().await.map_err(multipart_error)?;
        upload = Some((file_name, data.to_vec()));
    }

    let (file_name, content) =
        upload.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;

    if !file_name.to_lowercase().ends_with(".csv") {
        return Err(AppError::BadRequest(format!(
            "Only .csv files are accepted, got '{file_name}'"
        )));
    }
    if content.len() > state.config.max_upload_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "File exceeds the {} byte upload limit",
            state.config.max_upload_bytes
        )));
    }

    let text = std::str::from_utf8(&content)
        .map_err(|_| AppError::BadRequest("File is not valid UTF-8 text".into()))?;
    let ingestion = ingest_csv(text)?;

    let name = params
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| file_name.trim_end_matches(".csv").to_string());

    let dataset = DatasetRepo::create_with_rows(
        &state.pool,
        &CreateDataset {
            name,
            uploaded_by: Some(admin.user_id),
            file_name,
            content,
        },
        &ingestion.rows,
    )
    .await?;

    tracing::info!(
        dataset_id = dataset.id,
        parsed = ingestion.report.parsed,
        kept = ingestion.report.kept,
        dropped_blank = ingestion.report.dropped_blank,
        dropped_duplicate = ingestion.report.dropped_duplicate,
        "Dataset uploaded",
    );

    let response = UploadResponse {
        dataset: summarize(dataset, None, admin.user_id),
        report: ingestion.report,
        ignored_columns: ingestion.ignored_columns,
    };
    Ok((StatusCode::CREATED, Json(DataResponse { data: response })))
}

/// GET /api/v1/datasets
///
/// Datasets visible to the caller, newest first. Labelers do not see datasets
/// that enough users have already completed.
pub async fn list_datasets(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<Vec<DatasetSummary>>>> {
    let datasets = DatasetRepo::list(&state.pool).await?;

    let mut summaries = Vec::with_capacity(datasets.len());
    for dataset in datasets {
        let progress = dataset_progress(&state, &dataset).await?;
        if !dataset_visible(
            auth.role,
            progress.completed_users,
            state.config.completion_hide_threshold,
        ) {
            continue;
        }
        summaries.push(summarize(dataset, Some(&progress), auth.user_id));
    }

    Ok(Json(DataResponse { data: summaries }))
}

/// GET /api/v1/datasets/{id}
pub async fn get_dataset(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<DatasetSummary>>> {
    let dataset = find_dataset(&state, id).await?;
    let progress = dataset_progress(&state, &dataset).await?;
    ensure_visible(auth.role, &progress, state.config.completion_hide_threshold)?;
    Ok(Json(DataResponse {
        data: summarize(dataset, Some(&progress), auth.user_id),
    }))
}

/// DELETE /api/v1/datasets/{id}
///
/// Removes the dataset with its rows, annotations, assignments and upload.
pub async fn delete_dataset(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    auth.require(Capability::DeleteDataset)?;
    if !DatasetRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound { entity: "dataset", id }));
    }
    tracing::info!(dataset_id = id, by = auth.user_id, "Dataset deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/datasets/{id}/source
///
/// The CSV exactly as it was uploaded.
pub async fn download_source(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Response> {
    auth.require(Capability::DownloadSourceFile)?;
    let upload = DatasetRepo::find_upload(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "dataset", id }))?;
    Ok(attachment("text/csv; charset=utf-8", &upload.file_name, upload.content))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) async fn find_dataset(state: &AppState, id: DbId) -> AppResult<Dataset> {
    DatasetRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "dataset", id }))
}

/// Recompute per-user progress for a dataset from the stored annotations.
pub(crate) async fn dataset_progress(
    state: &AppState,
    dataset: &Dataset,
) -> AppResult<DatasetProgress> {
    let records = RowRepo::list_owned(&state.pool, dataset.id, None).await?;
    let owned: Vec<(DbId, String, Row)> = records
        .into_iter()
        .map(|r| (r.user_id, r.user_email, Row::from(r.record)))
        .collect();

    Ok(aggregate(
        dataset.id,
        i64::from(dataset.total_rows),
        owned.iter().map(|(user_id, email, row)| OwnedRow {
            user_id: *user_id,
            email,
            row,
        }),
    ))
}

fn summarize(dataset: Dataset, progress: Option<&DatasetProgress>, viewer: DbId) -> DatasetSummary {
    let labeled_count = progress
        .and_then(|p| p.users.iter().find(|u| u.user_id == viewer))
        .map_or(0, |u| u.labeled_count);
    DatasetSummary {
        id: dataset.id,
        name: dataset.name,
        total_rows: dataset.total_rows,
        labeled_count,
        completed_users: progress.map_or(0, |p| p.completed_users),
        uploaded_by: dataset.uploaded_by,
        uploaded_at: dataset.uploaded_at,
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(err.body_text())
    }
}

/// Reject roles that may not see a dataset with this much completion.
fn ensure_visible(role: Role, progress: &DatasetProgress, threshold: usize) -> AppResult<()> {
    if dataset_visible(role, progress.completed_users, threshold) {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Forbidden(
            "This dataset has been completed by enough labelers".into(),
        )))
    }
}
