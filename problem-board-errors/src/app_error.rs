use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum AppError {
    #[error("User not logged in")]
    LoginRequired,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Problem not found")]
    NotFound,

    #[error("Transaction aborted after repeated conflicts")]
    Conflict,

    #[error("Database error: {0}")]
    Store(String),

    #[error("Integrity check failed: {0}")]
    Integrity(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn user_message(&self) -> &str {
        match self {
            Self::LoginRequired => "You must be logged in to do that.",
            Self::InvalidInput(_) => "Please check what you entered and try again.",
            Self::NotFound => "That problem no longer exists.",
            Self::Conflict => "Too many people are updating this right now. Try again.",
            Self::Store(_) => "Could not reach the database. Try again later.",
            Self::Integrity(_) => "Could not check the installed files.",
            Self::Internal(_) => "Something went wrong. Try again later.",
        }
    }

    /// The underlying failure text, for variants that carry one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::InvalidInput(detail)
            | Self::Store(detail)
            | Self::Integrity(detail)
            | Self::Internal(detail) => Some(detail),
            Self::LoginRequired | Self::NotFound | Self::Conflict => None,
        }
    }
}

/// JSON shape of an error sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<&AppError> for ErrorBody {
    fn from(err: &AppError) -> Self {
        Self {
            message: err.user_message().to_string(),
            detail: err.detail().map(str::to_string),
        }
    }
}

#[cfg(feature = "http")]
mod http_impl {
    use super::{AppError, ErrorBody};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::Json;

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let status = match &self {
                AppError::LoginRequired => StatusCode::UNAUTHORIZED,
                AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                AppError::NotFound => StatusCode::NOT_FOUND,
                AppError::Conflict => StatusCode::CONFLICT,
                AppError::Store(_) => StatusCode::BAD_GATEWAY,
                AppError::Integrity(_) | AppError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            (status, Json(ErrorBody::from(&self))).into_response()
        }
    }
}
