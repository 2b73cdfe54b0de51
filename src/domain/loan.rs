use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::book::Book;
use super::borrower::Borrower;
use super::{
    BookBorrowed, BookId, BookReturned, BorrowBookError, BorrowerId, DomainEvent, LoanId,
    ReturnBookError,
};

/// 貸出期間（日数）
pub const LOAN_PERIOD_DAYS: i64 = 7;

// ============================================================================
// 型安全な状態パターン
// ============================================================================

/// Loanの共通フィールド
///
/// 貸出中・返却済みのどちらの状態でも共有されるコアデータ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanCore {
    pub loan_id: LoanId,

    // 他の集約への参照（IDのみ）
    pub book_id: BookId,
    pub borrower_id: BorrowerId,

    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
}

/// 貸出中状態
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenLoan {
    #[serde(flatten)]
    pub core: LoanCore,
}

impl std::ops::Deref for OpenLoan {
    type Target = LoanCore;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

/// 返却済み状態（終端）
///
/// ビジネスルール：
/// - returned_atが必須（型で保証）
/// - returned_at >= borrowed_at
/// - これ以上の状態遷移はない
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedLoan {
    #[serde(flatten)]
    pub core: LoanCore,
    pub returned_at: DateTime<Utc>,
}

impl std::ops::Deref for ClosedLoan {
    type Target = LoanCore;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

/// Loanの統合型
///
/// 状態は Open → Closed の一方向のみ。
/// `is_returned`と`returned_at`の整合性は型で保証される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Loan {
    Open(OpenLoan),
    Closed(ClosedLoan),
}

impl Loan {
    pub fn core(&self) -> &LoanCore {
        match self {
            Loan::Open(open) => &open.core,
            Loan::Closed(closed) => &closed.core,
        }
    }

    pub fn loan_id(&self) -> LoanId {
        self.core().loan_id
    }

    pub fn book_id(&self) -> BookId {
        self.core().book_id
    }

    pub fn borrower_id(&self) -> BorrowerId {
        self.core().borrower_id
    }

    pub fn is_returned(&self) -> bool {
        matches!(self, Loan::Closed(_))
    }

    pub fn returned_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Loan::Open(_) => None,
            Loan::Closed(closed) => Some(closed.returned_at),
        }
    }

    /// 永続化された行からLoanを復元する
    ///
    /// `is_returned`と`returned_at`が食い違う行、または
    /// `returned_at < borrowed_at`の行は不変条件違反としてエラーを返す。
    pub fn restore(
        core: LoanCore,
        is_returned: bool,
        returned_at: Option<DateTime<Utc>>,
    ) -> Result<Loan, LoanStateError> {
        match (is_returned, returned_at) {
            (false, None) => Ok(Loan::Open(OpenLoan { core })),
            (true, Some(returned_at)) if returned_at >= core.borrowed_at => {
                Ok(Loan::Closed(ClosedLoan { core, returned_at }))
            }
            (true, Some(_)) => Err(LoanStateError::ReturnedBeforeBorrowed(core.loan_id)),
            _ => Err(LoanStateError::InconsistentReturnFlag(core.loan_id)),
        }
    }
}

impl From<OpenLoan> for Loan {
    fn from(open: OpenLoan) -> Self {
        Loan::Open(open)
    }
}

impl From<ClosedLoan> for Loan {
    fn from(closed: ClosedLoan) -> Self {
        Loan::Closed(closed)
    }
}

/// 不正な貸出状態
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoanStateError {
    /// is_returnedとreturned_atが一致しない
    #[error("loan {0} has inconsistent is_returned/returned_at")]
    InconsistentReturnFlag(LoanId),
    /// 返却日時が貸出日時より前
    #[error("loan {0} was returned before it was borrowed")]
    ReturnedBeforeBorrowed(LoanId),
    /// 許可されていない状態遷移（例：返却済みを再度返却）
    #[error("{event} cannot be applied to loan {loan_id}")]
    InvalidTransition { loan_id: LoanId, event: &'static str },
}

// ============================================================================
// 純粋関数
// ============================================================================

/// 純粋関数：書籍を貸し出す
///
/// ビジネスルール：
/// - 在庫（quantity）が1冊以上あること
/// - 貸出期間は7日間
/// - 状態はOpen
///
/// 副作用なし。在庫の減算と貸出記録の作成は、返されたイベントを
/// 永続化層が1トランザクションで適用することで行われる。
pub fn borrow_book(
    book: &Book,
    borrower: &Borrower,
    borrowed_at: DateTime<Utc>,
) -> Result<(OpenLoan, BookBorrowed), BorrowBookError> {
    // バリデーション：在庫確認（減算可能か）
    book.quantity.decrement()?;

    let loan_id = LoanId::new();
    let due_at = borrowed_at + Duration::days(LOAN_PERIOD_DAYS);

    let loan = OpenLoan {
        core: LoanCore {
            loan_id,
            book_id: book.book_id,
            borrower_id: borrower.borrower_id,
            borrowed_at,
            due_at,
        },
    };

    let event = BookBorrowed {
        loan_id,
        book_id: book.book_id,
        borrower_id: borrower.borrower_id,
        borrowed_at,
        due_at,
    };

    Ok((loan, event))
}

/// 純粋関数：書籍を返却する
///
/// ビジネスルール：
/// - Open状態のみ返却可能
/// - returned_atは貸出日時より前にならない（時計のずれは貸出日時に丸める）
///
/// 副作用なし。ClosedLoanとイベントを返す。
pub fn return_book(
    loan: Loan,
    returned_at: DateTime<Utc>,
) -> Result<(ClosedLoan, BookReturned), ReturnBookError> {
    let open = match loan {
        Loan::Open(open) => open,
        Loan::Closed(_) => return Err(ReturnBookError::AlreadyReturned),
    };

    let returned_at = returned_at.max(open.borrowed_at);

    let event = BookReturned {
        loan_id: open.loan_id,
        book_id: open.book_id,
        borrower_id: open.borrower_id,
        returned_at,
    };

    let closed = ClosedLoan {
        core: open.core,
        returned_at,
    };

    Ok((closed, event))
}

/// イベントを適用して新しい状態を生成する純粋関数
///
/// 永続化層がイベントから貸出記録を作成・更新する際に使用する。
/// 不正な遷移（既存の貸出への再作成、返却済みの再返却、IDの不一致）はエラーになる。
pub fn apply_event(loan: Option<Loan>, event: &DomainEvent) -> Result<Loan, LoanStateError> {
    match (loan, event) {
        // BookBorrowed: 初期状態（None）からのみ受け入れる
        (None, DomainEvent::BookBorrowed(e)) => Ok(Loan::Open(OpenLoan {
            core: LoanCore {
                loan_id: e.loan_id,
                book_id: e.book_id,
                borrower_id: e.borrower_id,
                borrowed_at: e.borrowed_at,
                due_at: e.due_at,
            },
        })),

        // BookReturned: Open状態からのみ可能
        (Some(Loan::Open(open)), DomainEvent::BookReturned(e)) if open.loan_id == e.loan_id => {
            if e.returned_at < open.borrowed_at {
                return Err(LoanStateError::ReturnedBeforeBorrowed(open.loan_id));
            }
            Ok(Loan::Closed(ClosedLoan {
                core: open.core,
                returned_at: e.returned_at,
            }))
        }

        // 不正な状態遷移
        (_, event) => Err(LoanStateError::InvalidTransition {
            loan_id: event.loan_id(),
            event: event.event_type(),
        }),
    }
}
