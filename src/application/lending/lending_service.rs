use crate::application::ServiceDependencies;
use crate::domain::book::BookSummary;
use crate::domain::borrower::BorrowerSummary;
use crate::domain::commands::{BorrowBook, ReturnBook};
use crate::domain::loan::{self, ClosedLoan, Loan, OpenLoan};
use crate::domain::{BorrowBookError, ReturnBookError};
use crate::ports::{BorrowOutcome, ReturnOutcome};
use serde::Serialize;
use std::collections::HashMap;

use super::errors::{EntityKind, LendingError, Result};

/// 一覧表示用の貸出記録
///
/// 参照先の書籍・利用者が削除されている場合は要約がNoneになる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoanRecord {
    pub loan: Loan,
    pub book: Option<BookSummary>,
    pub borrower: Option<BorrowerSummary>,
}

/// 書籍を貸し出す
///
/// ビジネスルール：
/// - 書籍が存在すること
/// - 利用者が存在すること
/// - 在庫が1冊以上あること
///
/// 在庫の減算と貸出記録の作成は1つの単位としてコミットされる。
/// 検証後に在庫が尽きた場合もUnavailableになる。
pub async fn borrow_book(deps: &ServiceDependencies, cmd: BorrowBook) -> Result<OpenLoan> {
    deps.retry_policy
        .run("borrow_book", || attempt_borrow(deps, &cmd))
        .await
}

async fn attempt_borrow(deps: &ServiceDependencies, cmd: &BorrowBook) -> Result<OpenLoan> {
    // 1. 書籍の存在確認
    let book = deps
        .catalog_store
        .get_by_id(cmd.book_id)
        .await?
        .ok_or(LendingError::NotFound(EntityKind::Book(cmd.book_id)))?;

    // 2. 利用者の存在確認
    let borrower = deps
        .borrower_store
        .get_by_id(cmd.borrower_id)
        .await?
        .ok_or(LendingError::NotFound(EntityKind::Borrower(cmd.borrower_id)))?;

    // 3. ドメイン層の純粋関数を呼び出し（在庫確認）
    let (open_loan, event) = loan::borrow_book(&book, &borrower, cmd.borrowed_at).map_err(
        |e| match e {
            BorrowBookError::Unavailable => LendingError::Unavailable(cmd.book_id),
        },
    )?;

    // 4. 在庫の減算・貸出記録・イベントを1トランザクションで適用
    match deps.lending_unit.commit_borrow(&event).await? {
        BorrowOutcome::Committed => {
            tracing::info!(
                loan_id = %open_loan.loan_id,
                book_id = %open_loan.book_id,
                borrower_id = %open_loan.borrower_id,
                due_at = %open_loan.due_at,
                "book borrowed"
            );
            Ok(open_loan)
        }
        BorrowOutcome::StockExhausted => Err(LendingError::Unavailable(cmd.book_id)),
        BorrowOutcome::BookMissing => Err(LendingError::NotFound(EntityKind::Book(cmd.book_id))),
        BorrowOutcome::BorrowerMissing => Err(LendingError::NotFound(EntityKind::Borrower(
            cmd.borrower_id,
        ))),
    }
}

/// 書籍を返却する
///
/// ビジネスルール：
/// - 貸出が存在すること
/// - 貸出が未返却であること
///
/// 貸出記録のクローズと在庫の加算は1つの単位としてコミットされる。
/// 書籍が削除済みの場合は在庫の加算のみスキップする。
pub async fn return_book(deps: &ServiceDependencies, cmd: ReturnBook) -> Result<ClosedLoan> {
    deps.retry_policy
        .run("return_book", || attempt_return(deps, &cmd))
        .await
}

async fn attempt_return(deps: &ServiceDependencies, cmd: &ReturnBook) -> Result<ClosedLoan> {
    // 1. 貸出の取得
    let current = deps
        .loan_ledger
        .get_by_id(cmd.loan_id)
        .await?
        .ok_or(LendingError::NotFound(EntityKind::Loan(cmd.loan_id)))?;

    // 2. ドメイン層の純粋関数を呼び出し
    let (closed_loan, event) =
        loan::return_book(current, cmd.returned_at).map_err(|e| match e {
            ReturnBookError::AlreadyReturned => LendingError::AlreadyReturned(cmd.loan_id),
        })?;

    // 3. クローズ・在庫加算・イベントを1トランザクションで適用
    match deps.lending_unit.commit_return(&event).await? {
        ReturnOutcome::Closed { stock_restored } => {
            if !stock_restored {
                tracing::warn!(
                    loan_id = %closed_loan.loan_id,
                    book_id = %closed_loan.book_id,
                    "book no longer exists, stock reconciliation skipped"
                );
            }
            tracing::info!(
                loan_id = %closed_loan.loan_id,
                book_id = %closed_loan.book_id,
                borrower_id = %closed_loan.borrower_id,
                "book returned"
            );
            Ok(closed_loan)
        }
        // 同時返却に負けた
        ReturnOutcome::AlreadyClosed => Err(LendingError::AlreadyReturned(cmd.loan_id)),
        ReturnOutcome::LoanMissing => Err(LendingError::NotFound(EntityKind::Loan(cmd.loan_id))),
    }
}

/// 全貸出を書籍・利用者の要約と結合して返す（貸出日時の降順）
pub async fn list_loans(deps: &ServiceDependencies) -> Result<Vec<LoanRecord>> {
    deps.retry_policy
        .run("list_loans", || attempt_list(deps))
        .await
}

async fn attempt_list(deps: &ServiceDependencies) -> Result<Vec<LoanRecord>> {
    let (mut loans, books, borrowers) = futures::try_join!(
        deps.loan_ledger.list_all(),
        deps.catalog_store.list_all(),
        deps.borrower_store.list_all(),
    )?;

    let books: HashMap<_, _> = books
        .iter()
        .map(|book| (book.book_id, BookSummary::from(book)))
        .collect();
    let borrowers: HashMap<_, _> = borrowers
        .iter()
        .map(|borrower| (borrower.borrower_id, BorrowerSummary::from(borrower)))
        .collect();

    loans.sort_by(|a, b| b.core().borrowed_at.cmp(&a.core().borrowed_at));

    Ok(loans
        .into_iter()
        .map(|loan| LoanRecord {
            book: books.get(&loan.book_id()).cloned(),
            borrower: borrowers.get(&loan.borrower_id()).cloned(),
            loan,
        })
        .collect())
}
