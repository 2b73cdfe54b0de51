use crate::domain::events::{BookBorrowed, BookReturned, DomainEvent};
use crate::domain::value_objects::LoanId;
use crate::ports::lending_unit_of_work::LendingUnitOfWork as LendingUnitOfWorkTrait;
use crate::ports::{BorrowOutcome, Result, ReturnOutcome};
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use super::errors::{map_json_error, map_sqlx_error};

/// イベントログに1件追記する
///
/// 呼び出し側のトランザクション内で実行され、状態変更と同時にコミットされる。
pub(crate) async fn append_event(conn: &mut PgConnection, event: &DomainEvent) -> Result<()> {
    let event_data = serde_json::to_value(event).map_err(map_json_error)?;

    sqlx::query(
        r#"
        INSERT INTO lending_events (loan_id, event_type, event_data, occurred_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(event.loan_id().value())
    .bind(event.event_type())
    .bind(event_data)
    .bind(event.occurred_at())
    .execute(conn)
    .await
    .map_err(map_sqlx_error)?;

    Ok(())
}

/// 貸出・返却の書き込みを1トランザクションで適用するPostgreSQL実装
///
/// 在庫の判定は条件付きUPDATE（`quantity > 0`）で行うため、
/// READ COMMITTEDでも同時貸出で在庫が負になることはない。
pub struct LendingUnitOfWork {
    pool: PgPool,
}

impl LendingUnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 貸出のイベント履歴を記録順に読み込む
    pub async fn load_events(&self, loan_id: LoanId) -> Result<Vec<DomainEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT event_data
            FROM lending_events
            WHERE loan_id = $1
            ORDER BY sequence_number ASC
            "#,
        )
        .bind(loan_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| {
                let event_data: serde_json::Value =
                    row.try_get("event_data").map_err(map_sqlx_error)?;
                serde_json::from_value(event_data).map_err(map_json_error)
            })
            .collect()
    }
}

#[async_trait]
impl LendingUnitOfWorkTrait for LendingUnitOfWork {
    async fn commit_borrow(&self, event: &BookBorrowed) -> Result<BorrowOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // 利用者の削除と競合しないよう共有ロックを取る
        let borrower: Option<Uuid> =
            sqlx::query_scalar("SELECT borrower_id FROM borrowers WHERE borrower_id = $1 FOR SHARE")
                .bind(event.borrower_id.value())
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

        if borrower.is_none() {
            return Ok(BorrowOutcome::BorrowerMissing);
        }

        let decremented = sqlx::query(
            r#"
            UPDATE books
            SET quantity = quantity - 1,
                version = version + 1,
                updated_at = NOW()
            WHERE book_id = $1 AND quantity > 0
            "#,
        )
        .bind(event.book_id.value())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if decremented.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE book_id = $1)")
                    .bind(event.book_id.value())
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;

            return Ok(if exists {
                BorrowOutcome::StockExhausted
            } else {
                BorrowOutcome::BookMissing
            });
        }

        sqlx::query(
            r#"
            INSERT INTO loans (loan_id, book_id, borrower_id, borrowed_at, due_at, returned_at, is_returned)
            VALUES ($1, $2, $3, $4, $5, NULL, FALSE)
            "#,
        )
        .bind(event.loan_id.value())
        .bind(event.book_id.value())
        .bind(event.borrower_id.value())
        .bind(event.borrowed_at)
        .bind(event.due_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        append_event(&mut *tx, &DomainEvent::BookBorrowed(event.clone())).await?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(BorrowOutcome::Committed)
    }

    async fn commit_return(&self, event: &BookReturned) -> Result<ReturnOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // クローズは未返却の行に対してのみ成立する
        let closed: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE loans
            SET is_returned = TRUE, returned_at = $2
            WHERE loan_id = $1 AND is_returned = FALSE
            RETURNING book_id
            "#,
        )
        .bind(event.loan_id.value())
        .bind(event.returned_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let Some(book_id) = closed else {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM loans WHERE loan_id = $1)")
                    .bind(event.loan_id.value())
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;

            return Ok(if exists {
                ReturnOutcome::AlreadyClosed
            } else {
                ReturnOutcome::LoanMissing
            });
        };

        let restocked = sqlx::query(
            r#"
            UPDATE books
            SET quantity = quantity + 1,
                version = version + 1,
                updated_at = NOW()
            WHERE book_id = $1
            "#,
        )
        .bind(book_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        append_event(&mut *tx, &DomainEvent::BookReturned(event.clone())).await?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(ReturnOutcome::Closed {
            stock_restored: restocked.rows_affected() > 0,
        })
    }
}
