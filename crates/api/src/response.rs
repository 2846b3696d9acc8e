//! Response types shared by handlers.
//!
//! JSON responses use a `{ "data": ... }` envelope via [`DataResponse`].
//! File downloads (exports, the original upload, the progress report) go
//! through [`attachment`].

use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// A downloadable body with `Content-Disposition: attachment`.
pub fn attachment(content_type: &str, file_name: &str, body: impl Into<axum::body::Body>) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", file_name.replace('"', ""));
    (
        [
            (CONTENT_TYPE, content_type.to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        body.into(),
    )
        .into_response()
}
