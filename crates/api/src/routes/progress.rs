//! Route definitions for the `/progress` dashboard resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::progress;
use crate::state::AppState;

/// Routes mounted at `/progress`. Admin only.
///
/// ```text
/// GET /            -> all_progress
/// GET /report.csv  -> progress_report
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(progress::all_progress))
        .route("/report.csv", get(progress::progress_report))
}
