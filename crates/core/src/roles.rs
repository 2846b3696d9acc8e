//! User roles and the capability table.
//!
//! Every permission decision in the service goes through [`Role::can`].
//! Handlers never compare role strings directly.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Role names as persisted in `users.role`.
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_LABELER: &str = "labeler";

/// The two kinds of account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Labeler,
}

/// An action that only some roles may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    UploadDataset,
    DeleteDataset,
    DownloadSourceFile,
    ViewOtherUsersWork,
    ViewProgress,
    ExportAnyUser,
    ManageUsers,
    SeeCompletedDatasets,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => ROLE_ADMIN,
            Self::Labeler => ROLE_LABELER,
        }
    }

    /// Whether this role grants `capability`.
    pub fn can(self, capability: Capability) -> bool {
        match self {
            Self::Admin => true,
            Self::Labeler => match capability {
                Capability::UploadDataset
                | Capability::DeleteDataset
                | Capability::DownloadSourceFile
                | Capability::ViewOtherUsersWork
                | Capability::ViewProgress
                | Capability::ExportAnyUser
                | Capability::ManageUsers
                | Capability::SeeCompletedDatasets => false,
            },
        }
    }

    /// Like [`Role::can`] but yields a `Forbidden` error for the caller to propagate.
    pub fn require(self, capability: Capability) -> Result<(), CoreError> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "{} role may not {}",
                self.as_str(),
                capability.describe()
            )))
        }
    }
}

impl Capability {
    fn describe(self) -> &'static str {
        match self {
            Self::UploadDataset => "upload datasets",
            Self::DeleteDataset => "delete datasets",
            Self::DownloadSourceFile => "download source files",
            Self::ViewOtherUsersWork => "view other users' work",
            Self::ViewProgress => "view labeling progress",
            Self::ExportAnyUser => "export other users' labels",
            Self::ManageUsers => "manage users",
            Self::SeeCompletedDatasets => "see completed datasets",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            ROLE_ADMIN => Ok(Self::Admin),
            ROLE_LABELER => Ok(Self::Labeler),
            other => Err(CoreError::Validation(format!("Unknown role '{other}'"))),
        }
    }
}
