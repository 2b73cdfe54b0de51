use crate::application::catalog::CatalogError;
use crate::application::lending::{EntityKind, LendingError};
use crate::ports::StorageError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub enum ApiError {
    Lending(LendingError),
    Catalog(CatalogError),
}

impl From<LendingError> for ApiError {
    fn from(err: LendingError) -> Self {
        ApiError::Lending(err)
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

/// ストレージ障害のレスポンス
///
/// 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
fn storage_failure(err: &StorageError) -> Response {
    if err.is_integrity_violation() {
        tracing::error!(error = %err, "integrity violation");
        return integrity_violation();
    }
    tracing::error!(error = ?err, "storage error: {}", err);
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse::new(
            "STORAGE_UNAVAILABLE",
            "Storage is temporarily unavailable, please retry",
        )),
    )
        .into_response()
}

fn integrity_violation() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(
            "INTEGRITY_VIOLATION",
            "An internal consistency check failed",
        )),
    )
        .into_response()
}

fn lending_response(err: LendingError) -> Response {
    let message = err.to_string();
    let (status, error_type) = match err {
        // 404 Not Found - パスで指定された貸出が存在しない
        LendingError::NotFound(EntityKind::Loan(_)) => (StatusCode::NOT_FOUND, "LOAN_NOT_FOUND"),

        // 422 Unprocessable Entity - リクエスト本文の参照先が存在しない、ビジネスルール違反
        LendingError::NotFound(EntityKind::Book(_)) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "BOOK_NOT_FOUND")
        }
        LendingError::NotFound(EntityKind::Borrower(_)) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "BORROWER_NOT_FOUND")
        }
        LendingError::Unavailable(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BOOK_UNAVAILABLE"),
        LendingError::AlreadyReturned(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "ALREADY_RETURNED")
        }

        // 5xx - システム障害
        LendingError::Storage(ref e) => return storage_failure(e),
        LendingError::IntegrityViolation(ref detail) => {
            tracing::error!(%detail, "integrity violation");
            return integrity_violation();
        }
    };

    (status, Json(ErrorResponse::new(error_type, message))).into_response()
}

fn catalog_response(err: CatalogError) -> Response {
    let message = err.to_string();
    let (status, error_type) = match err {
        // 400 Bad Request - 入力検証エラー（項目ごとの詳細を付ける）
        CatalogError::Validation(validation) => {
            let body = ErrorResponse::new("VALIDATION_FAILED", message)
                .with_details(validation.errors().to_vec());
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }

        // 404 Not Found
        CatalogError::BookNotFound(_) => (StatusCode::NOT_FOUND, "BOOK_NOT_FOUND"),
        CatalogError::BorrowerNotFound(_) => (StatusCode::NOT_FOUND, "BORROWER_NOT_FOUND"),

        // 409 Conflict
        CatalogError::DuplicateIsbn(_) => (StatusCode::CONFLICT, "DUPLICATE_ISBN"),
        CatalogError::DuplicateMembershipId(_) => {
            (StatusCode::CONFLICT, "DUPLICATE_MEMBERSHIP_ID")
        }
        CatalogError::Conflict(_) => (StatusCode::CONFLICT, "VERSION_CONFLICT"),

        CatalogError::Storage(ref e) => return storage_failure(e),
    };

    (status, Json(ErrorResponse::new(error_type, message))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Lending(err) => lending_response(err),
            ApiError::Catalog(err) => catalog_response(err),
        }
    }
}
