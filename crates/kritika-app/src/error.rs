use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde_json::json;
use tracing::error;

use crate::mail::MailError;

pub type ApiResult<T, E = ApiError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Dal(#[from] kritika_dal::Error),

    #[error(transparent)]
    Token(#[from] kritika_auth::Error),

    #[error("Validation failed")]
    Validation(#[from] garde::Report),

    /// Field level failure reported under the field's name, the way the
    /// validation framework reports per field errors.
    #[error("{1}")]
    Field(&'static str, String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Permission denied")]
    Forbidden,

    #[error(transparent)]
    Mail(#[from] MailError),
}

fn detail(status: StatusCode, message: impl AsRef<str>) -> Response {
    (status, Json(json!({"detail": message.as_ref()}))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use kritika_dal::Error as DalError;
        match self {
            ApiError::Dal(e) => match e {
                DalError::RecordNotFound(what) => {
                    detail(StatusCode::NOT_FOUND, format!("{what} not found"))
                }
                DalError::AlreadyExists(what) => {
                    detail(StatusCode::CONFLICT, format!("{what} already exists"))
                }
                DalError::IdentityConflict(message) => detail(StatusCode::BAD_REQUEST, message),
                DalError::UnknownReference(what) => {
                    detail(StatusCode::BAD_REQUEST, format!("{what} does not exist"))
                }
                DalError::InvalidOrderByField(field) => {
                    detail(StatusCode::BAD_REQUEST, format!("Cannot order by {field}"))
                }
                DalError::DatabaseError(e) => {
                    error!("Database error: {e}");
                    detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
                }
            },
            ApiError::Token(e) => {
                error!("Token error: {e}");
                detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
            }
            ApiError::Validation(report) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(report)).into_response()
            }
            ApiError::Field(field, message) => {
                let mut body = serde_json::Map::new();
                body.insert(field.to_string(), serde_json::Value::String(message));
                (StatusCode::BAD_REQUEST, Json(serde_json::Value::Object(body))).into_response()
            }
            ApiError::BadRequest(message) => detail(StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized => detail(StatusCode::UNAUTHORIZED, "Authentication required"),
            ApiError::Forbidden => detail(StatusCode::FORBIDDEN, "Permission denied"),
            ApiError::Mail(e) => {
                error!("Mail delivery failed: {e}");
                detail(StatusCode::BAD_GATEWAY, "Could not deliver confirmation email")
            }
        }
    }
}
