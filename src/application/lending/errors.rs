use crate::domain::value_objects::{BookId, BorrowerId, LoanId};
use crate::ports::StorageError;
use thiserror::Error;

/// 見つからなかったエンティティ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Book(BookId),
    Borrower(BorrowerId),
    Loan(LoanId),
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Book(id) => write!(f, "book {}", id),
            EntityKind::Borrower(id) => write!(f, "borrower {}", id),
            EntityKind::Loan(id) => write!(f, "loan {}", id),
        }
    }
}

/// 貸出エンジンのエラー
///
/// ドメインエラー（NotFound, Unavailable, AlreadyReturned）は呼び出し側で対処可能で、
/// 再試行されない。Storageは一時的な障害、IntegrityViolationは不変条件違反を表す。
#[derive(Debug, Error)]
pub enum LendingError {
    #[error("{0} not found")]
    NotFound(EntityKind),

    /// 在庫なし
    #[error("book {0} has no copies available")]
    Unavailable(BookId),

    #[error("loan {0} has already been returned")]
    AlreadyReturned(LoanId),

    #[error("storage error")]
    Storage(#[source] StorageError),

    /// 起きてはならない状態。ログに記録し、状態の修復は行わない
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),
}

impl LendingError {
    pub fn is_domain_error(&self) -> bool {
        matches!(
            self,
            LendingError::NotFound(_)
                | LendingError::Unavailable(_)
                | LendingError::AlreadyReturned(_)
        )
    }

    /// 操作全体の再試行で解消しうる障害か
    pub fn is_transient(&self) -> bool {
        matches!(self, LendingError::Storage(_))
    }

    pub(crate) fn is_retryable(&self) -> bool {
        matches!(self, LendingError::Storage(e) if e.is_retryable())
    }
}

/// CHECK制約違反・不正な保存データは不変条件違反に昇格する
impl From<StorageError> for LendingError {
    fn from(err: StorageError) -> Self {
        if err.is_integrity_violation() {
            LendingError::IntegrityViolation(err.to_string())
        } else {
            LendingError::Storage(err)
        }
    }
}

/// 貸出エンジンの Result型
pub type Result<T> = std::result::Result<T, LendingError>;
