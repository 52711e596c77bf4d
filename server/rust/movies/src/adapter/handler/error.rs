use movies_server_common::error::{movies, ratings};
use movies_server_common::{ErrorDetail, ServiceError};
use tracing::error;

use crate::usecase::{CatalogError, ValidationFailure};

fn to_details(failures: Vec<ValidationFailure>) -> Vec<ErrorDetail> {
    failures
        .into_iter()
        .map(|f| ErrorDetail::new(f.field, f.reason, f.message))
        .collect()
}

fn internal(area: &str, msg: &str) -> ServiceError {
    // 内部エラーの詳細はログにのみ出す
    error!(error = %msg, "catalog operation failed");
    ServiceError::internal(area)
}

impl From<CatalogError> for ServiceError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound(_) => ServiceError::not_found(movies::not_found(), "movie not found"),
            CatalogError::Validation(failures) => {
                ServiceError::validation(movies::AREA, to_details(failures))
            }
            CatalogError::SlugConflict(slug) => ServiceError::conflict(
                movies::slug_conflict(),
                "a movie with the same slug already exists",
                vec![ErrorDetail::new("slug", "duplicate", slug)],
            ),
            CatalogError::Internal(msg) => internal(movies::AREA, &msg),
        }
    }
}

/// 評価系エンドポイント用のエラー変換。NotFound を評価エリアのコードにする。
pub fn rating_error(e: CatalogError) -> ServiceError {
    match e {
        CatalogError::NotFound(_) => {
            ServiceError::not_found(ratings::not_found(), "movie or rating not found")
        }
        CatalogError::Validation(failures) => {
            ServiceError::validation(ratings::AREA, to_details(failures))
        }
        CatalogError::Internal(msg) => internal(ratings::AREA, &msg),
        other => ServiceError::from(other),
    }
}

/// トークンに userid Claim がない場合のエラー。
pub fn missing_user() -> ServiceError {
    ServiceError::unauthorized(ratings::missing_user(), "token does not carry a user id")
}
