//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod assignment_repo;
pub mod dataset_repo;
pub mod row_repo;
pub mod session_repo;
pub mod user_repo;

pub use assignment_repo::AssignmentRepo;
pub use dataset_repo::DatasetRepo;
pub use row_repo::RowRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
