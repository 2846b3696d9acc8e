//! Startup provisioning of the first administrator account.
//!
//! Self-registration only ever creates labelers, so an empty deployment
//! needs one admin from configuration.

use eyelabel_core::error::CoreError;
use eyelabel_db::repositories::UserRepo;
use eyelabel_db::DbPool;

use crate::auth::password::{hash_password, validate_password_strength, MIN_PASSWORD_LENGTH};
use crate::error::{AppError, AppResult};

const DEFAULT_ADMIN_NAME: &str = "Administrator";

/// Credentials of the admin to ensure on startup.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl BootstrapAdmin {
    /// Read `ADMIN_EMAIL`, `ADMIN_PASSWORD` and `ADMIN_NAME`.
    ///
    /// Returns `None` unless both email and password are set and non-empty.
    pub fn from_env() -> Option<Self> {
        let email = std::env::var("ADMIN_EMAIL").ok()?.trim().to_lowercase();
        let password = std::env::var("ADMIN_PASSWORD").ok()?;
        if email.is_empty() || password.is_empty() {
            return None;
        }
        let name = std::env::var("ADMIN_NAME")
            .ok()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ADMIN_NAME.to_string());

        Some(Self {
            email,
            password,
            name,
        })
    }
}

/// Create the configured admin or promote and reactivate the existing account.
pub async fn ensure_admin(pool: &DbPool, admin: &BootstrapAdmin) -> AppResult<()> {
    validate_password_strength(&admin.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    let password_hash = hash_password(&admin.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::ensure_admin(pool, &admin.email, &admin.name, &password_hash).await?;
    tracing::info!(user_id = user.id, email = %user.email, "Bootstrap admin ensured");
    Ok(())
}
