use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, BorrowerId, LoanId};

/// イベント：書籍が貸し出された
///
/// 在庫の減算と貸出記録の作成を1つの単位として表す。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookBorrowed {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub borrower_id: BorrowerId,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
}

/// イベント：書籍が返却された
///
/// 貸出記録のクローズと在庫の加算を1つの単位として表す。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookReturned {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub borrower_id: BorrowerId,
    pub returned_at: DateTime<Utc>,
}

/// ドメインイベント統合型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainEvent {
    BookBorrowed(BookBorrowed),
    BookReturned(BookReturned),
}

impl DomainEvent {
    pub fn loan_id(&self) -> LoanId {
        match self {
            DomainEvent::BookBorrowed(e) => e.loan_id,
            DomainEvent::BookReturned(e) => e.loan_id,
        }
    }

    /// イベント種別（永続化時の識別子）
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::BookBorrowed(_) => "BookBorrowed",
            DomainEvent::BookReturned(_) => "BookReturned",
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::BookBorrowed(e) => e.borrowed_at,
            DomainEvent::BookReturned(e) => e.returned_at,
        }
    }
}
