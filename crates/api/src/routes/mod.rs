pub mod admin;
pub mod auth;
pub mod datasets;
pub mod health;
pub mod progress;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /auth/register, /auth/login, /auth/refresh       public
/// /auth/logout, /auth/me                           requires auth
///
/// /admin/users                                     list (admin)
/// /admin/users/{id}/role                           change role (admin)
/// /admin/users/{id}                                deactivate (admin)
///
/// /datasets                                        list, upload
/// /datasets/{id}                                   get, delete
/// /datasets/{id}/source                            original CSV
/// /datasets/{id}/rows                              grid rows, save all
/// /datasets/{id}/rows/{row_index}                  single-cell edit
/// /datasets/{id}/labeling/{next,submit,release}    one-row labeling
/// /datasets/{id}/progress[/me]                     progress
/// /datasets/{id}/export[/filtered]                 downloads
///
/// /progress                                        all datasets (admin)
/// /progress/report.csv                             CSV report (admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/admin", admin::router())
        .nest("/datasets", datasets::router())
        .nest("/progress", progress::router())
}
