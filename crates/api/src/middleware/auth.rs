//! Bearer-token extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use eyelabel_core::error::CoreError;
use eyelabel_core::roles::{Capability, Role};
use eyelabel_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// The authenticated caller, taken from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    pub role: Role,
}

impl AuthUser {
    /// Fail with 403 unless the caller's role grants `capability`.
    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        Ok(self.role.require(capability)?)
    }

    /// Whose data a request may touch.
    ///
    /// Callers see their own rows unless they may view other users' work and
    /// asked for someone else.
    pub fn target_user(&self, requested: Option<DbId>) -> Result<DbId, AppError> {
        match requested {
            Some(id) if id != self.user_id => {
                self.require(Capability::ViewOtherUsersWork)?;
                Ok(id)
            }
            _ => Ok(self.user_id),
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        let role = claims.role.parse::<Role>().map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Token carries an unknown role".into()))
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
            role,
        })
    }
}
