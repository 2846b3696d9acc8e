//! Route definitions for the `/admin` resource.

use axum::routing::{delete, get, put};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`. All require the admin role.
///
/// ```text
/// GET    /users            -> list_users
/// PUT    /users/{id}/role  -> update_role
/// DELETE /users/{id}       -> deactivate_user
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/{id}/role", put(admin::update_role))
        .route("/users/{id}", delete(admin::deactivate_user))
}
