//! Capability-gated extractors wrapping [`AuthUser`].

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use eyelabel_core::roles::Capability;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires [`Capability::ManageUsers`]. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn list_users(RequireUserManager(admin): RequireUserManager) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireUserManager(pub AuthUser);

impl FromRequestParts<AppState> for RequireUserManager {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        user.require(Capability::ManageUsers)?;
        Ok(RequireUserManager(user))
    }
}
