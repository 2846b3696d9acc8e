//! Handlers for the `/admin` resource (user management).
//!
//! All handlers require the user-management capability via [`RequireUserManager`].

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use eyelabel_core::error::CoreError;
use eyelabel_core::roles::Role;
use eyelabel_core::types::DbId;
use eyelabel_db::models::user::{UpdateUser, UserResponse};
use eyelabel_db::repositories::{SessionRepo, UserRepo};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireUserManager;
use crate::state::AppState;

/// Request body for `PUT /admin/users/{id}/role`.
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

/// GET /api/v1/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    RequireUserManager(_admin): RequireUserManager,
) -> AppResult<Json<Vec<UserResponse>>> {
    let users = UserRepo::list(&state.pool).await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// PUT /api/v1/admin/users/{id}/role
///
/// Change a user's role. Admins cannot demote themselves.
pub async fn update_role(
    State(state): State<AppState>,
    RequireUserManager(admin): RequireUserManager,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateRoleRequest>,
) -> AppResult<Json<UserResponse>> {
    if id == admin.user_id && input.role != Role::Admin {
        return Err(AppError::Core(CoreError::Conflict(
            "Admins cannot remove their own admin role".into(),
        )));
    }

    let user = UserRepo::update(
        &state.pool,
        id,
        &UpdateUser {
            role: Some(input.role),
            ..UpdateUser::default()
        },
    )
    .await?
    .ok_or(AppError::Core(CoreError::NotFound { entity: "user", id }))?;

    // Access tokens keep the old role until they expire.
    SessionRepo::revoke_all_for_user(&state.pool, id).await?;
    tracing::info!(user_id = id, role = %input.role, by = admin.user_id, "User role changed");

    Ok(Json(UserResponse::from(&user)))
}

/// DELETE /api/v1/admin/users/{id}
///
/// Soft-deactivate a user and revoke their sessions. Returns 204 No Content.
pub async fn deactivate_user(
    State(state): State<AppState>,
    RequireUserManager(admin): RequireUserManager,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if id == admin.user_id {
        return Err(AppError::Core(CoreError::Conflict(
            "Admins cannot deactivate themselves".into(),
        )));
    }

    if !UserRepo::deactivate(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound { entity: "user", id }));
    }
    SessionRepo::revoke_all_for_user(&state.pool, id).await?;
    tracing::info!(user_id = id, by = admin.user_id, "User deactivated");

    Ok(StatusCode::NO_CONTENT)
}
