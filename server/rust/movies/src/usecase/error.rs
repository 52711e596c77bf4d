/// ValidationFailure は入力検証で見つかった 1 件の問題。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub field: String,
    pub reason: String,
    pub message: String,
}

impl ValidationFailure {
    pub fn new(field: &str, reason: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.to_string(),
            message: message.into(),
        }
    }
}

/// CatalogError はカタログ系ユースケースのエラー型。
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("movie not found: {0}")]
    NotFound(String),

    #[error("validation failed")]
    Validation(Vec<ValidationFailure>),

    #[error("slug already exists: {0}")]
    SlugConflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CatalogError {
    pub fn validation(field: &str, reason: &str, message: impl Into<String>) -> Self {
        CatalogError::Validation(vec![ValidationFailure::new(field, reason, message)])
    }
}

impl From<anyhow::Error> for CatalogError {
    fn from(e: anyhow::Error) -> Self {
        CatalogError::Internal(e.to_string())
    }
}
