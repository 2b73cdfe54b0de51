use crate::domain::ValidationError;
use crate::domain::value_objects::{BookId, BorrowerId};
use crate::ports::StorageError;
use thiserror::Error;

/// 書籍・利用者管理のエラー
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("book {0} not found")]
    BookNotFound(BookId),

    #[error("borrower {0} not found")]
    BorrowerNotFound(BorrowerId),

    #[error("a book with ISBN {0} already exists")]
    DuplicateIsbn(String),

    #[error("a borrower with membership id {0} already exists")]
    DuplicateMembershipId(String),

    /// 楽観ロックの不一致
    #[error("record was modified concurrently: {0}")]
    Conflict(String),

    #[error("storage error")]
    Storage(#[source] StorageError),
}

impl From<StorageError> for CatalogError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict(msg) => CatalogError::Conflict(msg),
            other => CatalogError::Storage(other),
        }
    }
}

/// カタログ管理の Result型
pub type Result<T> = std::result::Result<T, CatalogError>;
