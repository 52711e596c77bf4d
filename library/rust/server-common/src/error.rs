//! Error codes and the JSON error envelope returned by the movies API.
//!
//! Codes follow `MOVIES_{ERROR}` for catalog endpoints and `MOVIES_RATING_{ERROR}`
//! for rating endpoints, e.g. `MOVIES_SLUG_CONFLICT`, `MOVIES_RATING_MISSING_USER`.
//!
//! ```json
//! { "error": { "code": "MOVIES_NOT_FOUND", "message": "movie not found", "request_id": "..." } }
//! ```

use serde::Serialize;

/// ErrorCode is the machine-readable part of an error response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCode(String);

impl ErrorCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// `{AREA}_NOT_FOUND`
    pub fn not_found(area: &str) -> Self {
        Self::in_area(area, "NOT_FOUND")
    }

    /// `{AREA}_VALIDATION_FAILED`
    pub fn validation(area: &str) -> Self {
        Self::in_area(area, "VALIDATION_FAILED")
    }

    /// `{AREA}_INTERNAL_ERROR`
    pub fn internal(area: &str) -> Self {
        Self::in_area(area, "INTERNAL_ERROR")
    }

    fn in_area(area: &str, suffix: &str) -> Self {
        Self(format!("{}_{}", area.to_uppercase(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ErrorCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl From<&str> for ErrorCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// ErrorDetail points at one rejected field.
///
/// `{ "field": "yearOfRelease", "reason": "in_future", "message": "..." }`
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub field: String,
    pub reason: String,
    pub message: String,
}

impl ErrorDetail {
    pub fn new(
        field: impl Into<String>,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorDetail>,
}

/// ErrorResponse wraps ErrorBody in an `{ "error": ... }` envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

impl ErrorResponse {
    pub fn new(
        code: impl Into<ErrorCode>,
        message: impl Into<String>,
        details: Vec<ErrorDetail>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                request_id: uuid::Uuid::new_v4().to_string(),
                details,
            },
        }
    }
}

/// 内部エラー時にクライアントへ返す固定メッセージ。
pub const INTERNAL_MESSAGE: &str = "internal server error";

/// ServiceError is what movies handlers return on failure.
///
/// With the `axum` feature enabled it renders as [`ErrorResponse`] with the matching status.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// 404
    #[error("{message}")]
    NotFound { code: ErrorCode, message: String },

    /// 400. 入力検証の失敗はフィールドごとの詳細を持つ
    #[error("{message}")]
    BadRequest {
        code: ErrorCode,
        message: String,
        details: Vec<ErrorDetail>,
    },

    /// 401. 認証自体は movies-auth が返すため、ここはトークンの内容が足りない場合のみ
    #[error("{message}")]
    Unauthorized { code: ErrorCode, message: String },

    /// 409
    #[error("{message}")]
    Conflict {
        code: ErrorCode,
        message: String,
        details: Vec<ErrorDetail>,
    },

    /// 500
    #[error("{message}")]
    Internal { code: ErrorCode, message: String },
}

impl ServiceError {
    pub fn not_found(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            message: message.into(),
        }
    }

    /// Validation failure in `area` with one detail per rejected field.
    pub fn validation(area: &str, details: Vec<ErrorDetail>) -> Self {
        Self::BadRequest {
            code: ErrorCode::validation(area),
            message: "validation failed".to_string(),
            details,
        }
    }

    pub fn unauthorized(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            code,
            message: message.into(),
        }
    }

    pub fn conflict(code: ErrorCode, message: impl Into<String>, details: Vec<ErrorDetail>) -> Self {
        Self::Conflict {
            code,
            message: message.into(),
            details,
        }
    }

    /// 原因は呼び出し側でログに出し、クライアントには固定メッセージだけを返す。
    pub fn internal(area: &str) -> Self {
        Self::Internal {
            code: ErrorCode::internal(area),
            message: INTERNAL_MESSAGE.to_string(),
        }
    }

    pub fn code(&self) -> &ErrorCode {
        match self {
            ServiceError::NotFound { code, .. }
            | ServiceError::BadRequest { code, .. }
            | ServiceError::Unauthorized { code, .. }
            | ServiceError::Conflict { code, .. }
            | ServiceError::Internal { code, .. } => code,
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        match self {
            ServiceError::NotFound { code, message }
            | ServiceError::Unauthorized { code, message }
            | ServiceError::Internal { code, message } => {
                ErrorResponse::new(code.clone(), message.clone(), vec![])
            }
            ServiceError::BadRequest {
                code,
                message,
                details,
            }
            | ServiceError::Conflict {
                code,
                message,
                details,
            } => ErrorResponse::new(code.clone(), message.clone(), details.clone()),
        }
    }
}

#[cfg(feature = "axum")]
impl ServiceError {
    pub fn status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;

        match self {
            ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ServiceError::Conflict { .. } => StatusCode::CONFLICT,
            ServiceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), axum::Json(self.to_error_response())).into_response()
    }
}

/// Codes for `/api/movies` endpoints.
pub mod movies {
    use super::ErrorCode;

    pub const AREA: &str = "MOVIES";

    pub fn not_found() -> ErrorCode {
        ErrorCode::not_found(AREA)
    }

    pub fn slug_conflict() -> ErrorCode {
        ErrorCode::new("MOVIES_SLUG_CONFLICT")
    }
}

/// Codes for rating endpoints.
pub mod ratings {
    use super::ErrorCode;

    pub const AREA: &str = "MOVIES_RATING";

    pub fn not_found() -> ErrorCode {
        ErrorCode::not_found(AREA)
    }

    pub fn missing_user() -> ErrorCode {
        ErrorCode::new("MOVIES_RATING_MISSING_USER")
    }
}
