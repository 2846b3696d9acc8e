//! Domain logic for the eye-test transcript labeling service.
//!
//! Everything in this crate is pure: no database, no async, no I/O. The
//! `db` and `api` crates feed it rows and persist what it returns.

pub mod csv;
pub mod editing;
pub mod error;
pub mod export;
pub mod ingest;
pub mod labeling;
pub mod progress;
pub mod roles;
pub mod row;
pub mod types;
