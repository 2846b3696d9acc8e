//! Route definitions for `/datasets` and everything nested under one dataset.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::{datasets, export, labeling, progress, rows};
use crate::state::AppState;

/// Routes mounted at `/datasets`.
///
/// ```text
/// GET    /                             -> list_datasets
/// POST   /                             -> upload_dataset (admin, multipart)
/// GET    /{id}                         -> get_dataset
/// DELETE /{id}                         -> delete_dataset (admin)
/// GET    /{id}/source                  -> download_source (admin)
///
/// GET    /{id}/rows                    -> list_rows
/// PUT    /{id}/rows                    -> save_rows
/// PATCH  /{id}/rows/{row_index}        -> edit_cell
///
/// POST   /{id}/labeling/next           -> next_row
/// POST   /{id}/labeling/submit         -> submit_row
/// POST   /{id}/labeling/release        -> release_row
///
/// GET    /{id}/progress                -> get_dataset_progress (admin)
/// GET    /{id}/progress/me             -> my_progress
///
/// GET    /{id}/export                  -> export_all
/// GET    /{id}/export/filtered         -> export_filtered
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(datasets::list_datasets).post(datasets::upload_dataset),
        )
        .route(
            "/{id}",
            get(datasets::get_dataset).delete(datasets::delete_dataset),
        )
        .route("/{id}/source", get(datasets::download_source))
        .route("/{id}/rows", get(rows::list_rows).put(rows::save_rows))
        .route("/{id}/rows/{row_index}", patch(rows::edit_cell))
        .route("/{id}/labeling/next", post(labeling::next_row))
        .route("/{id}/labeling/submit", post(labeling::submit_row))
        .route("/{id}/labeling/release", post(labeling::release_row))
        .route("/{id}/progress", get(progress::get_dataset_progress))
        .route("/{id}/progress/me", get(progress::my_progress))
        .route("/{id}/export", get(export::export_all))
        .route("/{id}/export/filtered", get(export::export_filtered))
}
