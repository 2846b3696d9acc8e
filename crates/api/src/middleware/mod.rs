//! Request extractors for authentication and authorization.
//!
//! - [`auth::AuthUser`] -- the caller, decoded from a Bearer token.
//! - [`rbac::RequireUserManager`] -- the caller, who must be allowed to manage users.
//!
//! Every other permission check calls [`auth::AuthUser::require`] inside the handler.

pub mod auth;
pub mod rbac;
