use axum::response::{IntoResponse, Response};
use common_http_errors::ApiError;
use thiserror::Error;

use crate::roles::Role;

#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("requires role '{required}'")]
    Forbidden { required: Role },
    #[error("authenticated subject has no account")]
    UnknownSubject,
    #[error("unknown role '{0}'")]
    UnknownRole(String),
    #[error("role lookup failed: {0}")]
    Directory(String),
}

impl From<SecurityError> for ApiError {
    fn from(e: SecurityError) -> Self {
        match e {
            SecurityError::Forbidden { required } => ApiError::forbidden(
                "missing_role",
                format!("this operation requires the {required} role"),
            ),
            SecurityError::UnknownSubject => {
                ApiError::forbidden("forbidden", "this operation is not permitted")
            }
            SecurityError::UnknownRole(_) | SecurityError::Directory(_) => ApiError::internal(e),
        }
    }
}

impl IntoResponse for SecurityError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
