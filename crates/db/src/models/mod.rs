//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - A create DTO for inserts
//! - An update DTO (all `Option` fields) for patches where the entity has one

pub mod assignment;
pub mod dataset;
pub mod row;
pub mod session;
pub mod user;
