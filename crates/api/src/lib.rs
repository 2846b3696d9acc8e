//! eyelabel API server library.
//!
//! Exposes config, state, error handling, auth and routes so integration
//! tests and the binary entrypoint build the same application.

pub mod auth;
pub mod background;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
