//! Query-string parameter types shared by handlers.

use eyelabel_core::export::ExportFormat;
use eyelabel_core::types::DbId;
use serde::Deserialize;

/// `?user_id=` on endpoints where an admin may act on another user's copy.
#[derive(Debug, Default, Deserialize)]
pub struct UserScopeParams {
    pub user_id: Option<DbId>,
}

/// `?name=` for dataset upload. Defaults to the file name.
#[derive(Debug, Default, Deserialize)]
pub struct CreateDatasetParams {
    pub name: Option<String>,
}

/// `?after=` when skipping to the next row.
#[derive(Debug, Default, Deserialize)]
pub struct NextRowParams {
    pub after: Option<i32>,
}

/// `?format=&user_id=` for the "all" export.
#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    #[serde(default)]
    pub format: ExportFormat,
    pub user_id: Option<DbId>,
}

/// `?format=&flag=&step=&user=` for the filtered export.
///
/// `user` is an email address; `all` or absent disables a filter.
#[derive(Debug, Default, Deserialize)]
pub struct FilteredExportParams {
    #[serde(default)]
    pub format: ExportFormat,
    pub flag: Option<String>,
    pub step: Option<String>,
    pub user: Option<String>,
}
