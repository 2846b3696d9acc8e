//! Handlers for labeling progress. Everything is recomputed from the stored
//! annotations on each request.

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use eyelabel_core::error::CoreError;
use eyelabel_core::progress::{progress_report_csv, DatasetProgress, UserProgress};
use eyelabel_core::roles::Capability;
use eyelabel_core::types::DbId;
use eyelabel_db::repositories::{DatasetRepo, UserRepo};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::handlers::datasets::{dataset_progress, find_dataset};
use crate::middleware::auth::AuthUser;
use crate::response::{attachment, DataResponse};
use crate::state::AppState;

const REPORT_FILE_NAME: &str = "labeling_progress.csv";

/// Progress of one dataset, named, for the admin dashboard.
#[derive(Debug, Serialize)]
pub struct NamedProgress {
    pub dataset_name: String,
    #[serde(flatten)]
    pub progress: DatasetProgress,
}

/// GET /api/v1/datasets/{id}/progress
pub async fn get_dataset_progress(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(dataset_id): Path<DbId>,
) -> AppResult<Json<DataResponse<DatasetProgress>>> {
    auth.require(Capability::ViewProgress)?;
    let dataset = find_dataset(&state, dataset_id).await?;
    let progress = dataset_progress(&state, &dataset).await?;
    Ok(Json(DataResponse { data: progress }))
}

/// GET /api/v1/datasets/{id}/progress/me
pub async fn my_progress(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(dataset_id): Path<DbId>,
) -> AppResult<Json<DataResponse<UserProgress>>> {
    let dataset = find_dataset(&state, dataset_id).await?;
    let progress = dataset_progress(&state, &dataset).await?;

    let mine = match progress.users.into_iter().find(|u| u.user_id == auth.user_id) {
        Some(mine) => mine,
        None => {
            let user = UserRepo::find_by_id(&state.pool, auth.user_id)
                .await?
                .ok_or(AppError::Core(CoreError::NotFound {
                    entity: "user",
                    id: auth.user_id,
                }))?;
            UserProgress::new(user.id, user.email, 0, progress.total_rows)
        }
    };
    Ok(Json(DataResponse { data: mine }))
}

/// GET /api/v1/progress
///
/// Every dataset's progress, newest dataset first.
pub async fn all_progress(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<Vec<NamedProgress>>>> {
    auth.require(Capability::ViewProgress)?;
    Ok(Json(DataResponse {
        data: collect_progress(&state).await?,
    }))
}

/// GET /api/v1/progress/report.csv
pub async fn progress_report(State(state): State<AppState>, auth: AuthUser) -> AppResult<Response> {
    auth.require(Capability::ViewProgress)?;
    let entries = collect_progress(&state).await?;
    let csv = progress_report_csv(
        entries
            .iter()
            .map(|e| (e.dataset_name.as_str(), &e.progress)),
    );
    Ok(attachment("text/csv; charset=utf-8", REPORT_FILE_NAME, csv))
}

async fn collect_progress(state: &AppState) -> AppResult<Vec<NamedProgress>> {
    let datasets = DatasetRepo::list(&state.pool).await?;
    let mut entries = Vec::with_capacity(datasets.len());
    for dataset in datasets {
        let progress = dataset_progress(state, &dataset).await?;
        entries.push(NamedProgress {
            dataset_name: dataset.name,
            progress,
        });
    }
    Ok(entries)
}
