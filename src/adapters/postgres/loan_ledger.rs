use crate::domain::loan::{ClosedLoan, Loan, LoanCore, OpenLoan};
use crate::domain::value_objects::{BookId, BorrowerId, LoanId};
use crate::ports::loan_ledger::LoanLedger as LoanLedgerTrait;
use crate::ports::{Result, StorageError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use super::errors::map_sqlx_error;

const LOAN_COLUMNS: &str =
    "loan_id, book_id, borrower_id, borrowed_at, due_at, returned_at, is_returned";

/// PostgreSQLの行データをLoanに変換する
///
/// is_returned / returned_atの組み合わせが不正な行はInvalidDataとする。
pub(crate) fn map_row_to_loan(row: &PgRow) -> Result<Loan> {
    let core = LoanCore {
        loan_id: LoanId::from_uuid(row.try_get("loan_id").map_err(map_sqlx_error)?),
        book_id: BookId::from_uuid(row.try_get("book_id").map_err(map_sqlx_error)?),
        borrower_id: BorrowerId::from_uuid(row.try_get("borrower_id").map_err(map_sqlx_error)?),
        borrowed_at: row.try_get("borrowed_at").map_err(map_sqlx_error)?,
        due_at: row.try_get("due_at").map_err(map_sqlx_error)?,
    };
    let is_returned: bool = row.try_get("is_returned").map_err(map_sqlx_error)?;
    let returned_at: Option<DateTime<Utc>> = row.try_get("returned_at").map_err(map_sqlx_error)?;

    Loan::restore(core, is_returned, returned_at)
        .map_err(|e| StorageError::InvalidData(e.to_string()))
}

/// LoanLedgerのPostgreSQL実装
///
/// 貸出・返却の通常経路はLendingUnitOfWorkを通る。
/// ここでの書き込みは単独の行操作のみ。
pub struct LoanLedger {
    pool: PgPool,
}

impl LoanLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanLedgerTrait for LoanLedger {
    async fn get_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        let row = sqlx::query(&format!("SELECT {} FROM loans WHERE loan_id = $1", LOAN_COLUMNS))
            .bind(loan_id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Loan>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM loans ORDER BY borrowed_at DESC, loan_id ASC",
            LOAN_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(map_row_to_loan).collect()
    }

    async fn insert(&self, loan: OpenLoan) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO loans (loan_id, book_id, borrower_id, borrowed_at, due_at, returned_at, is_returned)
            VALUES ($1, $2, $3, $4, $5, NULL, FALSE)
            "#,
        )
        .bind(loan.loan_id.value())
        .bind(loan.book_id.value())
        .bind(loan.borrower_id.value())
        .bind(loan.borrowed_at)
        .bind(loan.due_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    /// Open状態の行のみクローズする
    async fn update(&self, loan: ClosedLoan) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET is_returned = TRUE, returned_at = $2
            WHERE loan_id = $1 AND is_returned = FALSE
            "#,
        )
        .bind(loan.loan_id.value())
        .bind(loan.returned_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
