use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::lending::LoanRecord;
use crate::domain::FieldError;
use crate::domain::book::{BookChanges, BookSummary};
use crate::domain::borrower::BorrowerSummary;
use crate::domain::commands::BorrowBook;
use crate::domain::loan::{ClosedLoan, Loan};
use crate::domain::value_objects::{BookId, BorrowerId};

/// 貸出リクエスト（POST /api/borrow）
#[derive(Debug, Deserialize)]
pub struct BorrowRequest {
    pub book_id: Uuid,
    pub borrower_id: Uuid,
}

impl BorrowRequest {
    pub fn to_command(&self, borrowed_at: DateTime<Utc>) -> BorrowBook {
        BorrowBook {
            book_id: BookId::from_uuid(self.book_id),
            borrower_id: BorrowerId::from_uuid(self.borrower_id),
            borrowed_at,
        }
    }
}

/// 貸出レスポンス
#[derive(Debug, Serialize)]
pub struct LoanResponse {
    pub loan_id: Uuid,
    pub book_id: Uuid,
    pub borrower_id: Uuid,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub is_returned: bool,
}

impl From<&Loan> for LoanResponse {
    fn from(loan: &Loan) -> Self {
        let core = loan.core();
        Self {
            loan_id: core.loan_id.value(),
            book_id: core.book_id.value(),
            borrower_id: core.borrower_id.value(),
            borrowed_at: core.borrowed_at,
            due_at: core.due_at,
            returned_at: loan.returned_at(),
            is_returned: loan.is_returned(),
        }
    }
}

/// 返却レスポンス（POST /api/borrow/return/:id）
#[derive(Debug, Serialize)]
pub struct ReturnResponse {
    pub loan_id: Uuid,
    pub returned_at: DateTime<Utc>,
}

impl From<&ClosedLoan> for ReturnResponse {
    fn from(loan: &ClosedLoan) -> Self {
        Self {
            loan_id: loan.loan_id.value(),
            returned_at: loan.returned_at,
        }
    }
}

/// 貸出記録（GET /api/borrow/records）
#[derive(Debug, Serialize)]
pub struct LoanRecordResponse {
    #[serde(flatten)]
    pub loan: LoanResponse,
    pub book: Option<BookSummary>,
    pub borrower: Option<BorrowerSummary>,
}

impl From<LoanRecord> for LoanRecordResponse {
    fn from(record: LoanRecord) -> Self {
        Self {
            loan: LoanResponse::from(&record.loan),
            book: record.book,
            borrower: record.borrower,
        }
    }
}

/// 書籍更新リクエスト（PUT /api/books/:id）
///
/// `version`を指定すると、その版から変更されていない場合のみ更新する。
#[derive(Debug, Deserialize)]
pub struct UpdateBookRequest {
    #[serde(flatten)]
    pub changes: BookChanges,
    pub version: Option<i64>,
}

/// エラーレスポンス
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<FieldError>) -> Self {
        self.details = Some(details);
        self
    }
}
