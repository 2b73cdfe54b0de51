use async_trait::async_trait;
use chrono::{Duration, Utc};
use rusty_library_lending::adapters::memory::InMemoryLibrary;
use rusty_library_lending::application::{
    RetryPolicy, ServiceDependencies, catalog,
    lending::{self, EntityKind, LendingError},
};
use rusty_library_lending::domain::commands::{BorrowBook, ReturnBook};
use rusty_library_lending::domain::events::{BookBorrowed, BookReturned, DomainEvent};
use rusty_library_lending::domain::loan::{LOAN_PERIOD_DAYS, Loan};
use rusty_library_lending::domain::value_objects::{BookId, BorrowerId, LoanId};
use rusty_library_lending::ports::{
    BorrowOutcome, LendingUnitOfWork, LoanLedger, ReturnOutcome, StorageError,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

mod common;

fn borrow_cmd(book_id: BookId, borrower_id: BorrowerId) -> BorrowBook {
    BorrowBook {
        book_id,
        borrower_id,
        borrowed_at: Utc::now(),
    }
}

fn return_cmd(loan_id: LoanId) -> ReturnBook {
    ReturnBook {
        loan_id,
        returned_at: Utc::now(),
    }
}

async fn quantity_of(deps: &ServiceDependencies, book_id: BookId) -> u32 {
    catalog::get_book(deps, book_id)
        .await
        .expect("book should exist")
        .quantity
        .value()
}

// ============================================================================
// 失敗を注入するユニットオブワーク
// ============================================================================

/// 最初のN回のコミットで指定したエラーを返し、その後は内部のストアに委譲する
struct FlakyUnit {
    inner: Arc<InMemoryLibrary>,
    failures_left: AtomicU32,
    calls: AtomicU32,
    error: fn() -> StorageError,
}

impl FlakyUnit {
    fn new(inner: Arc<InMemoryLibrary>, failures: u32, error: fn() -> StorageError) -> Self {
        Self {
            inner,
            failures_left: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
            error,
        }
    }

    fn should_fail(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl LendingUnitOfWork for FlakyUnit {
    async fn commit_borrow(
        &self,
        event: &BookBorrowed,
    ) -> rusty_library_lending::ports::Result<BorrowOutcome> {
        if self.should_fail() {
            return Err((self.error)());
        }
        self.inner.commit_borrow(event).await
    }

    async fn commit_return(
        &self,
        event: &BookReturned,
    ) -> rusty_library_lending::ports::Result<ReturnOutcome> {
        if self.should_fail() {
            return Err((self.error)());
        }
        self.inner.commit_return(event).await
    }
}

fn with_unit(
    library: Arc<InMemoryLibrary>,
    unit: Arc<FlakyUnit>,
    policy: RetryPolicy,
) -> ServiceDependencies {
    ServiceDependencies {
        lending_unit: unit,
        ..ServiceDependencies::from_store(library, policy)
    }
}

// ============================================================================
// 貸出・返却の正常系
// ============================================================================

#[tokio::test]
async fn test_borrow_and_return_round_trip() {
    let (library, deps) = common::in_memory_deps();
    let book = common::seed_book(&deps, "978-0-00-000001-1", 3).await;
    let borrower = common::seed_borrower(&deps, "M-001").await;

    // 貸出
    let loan = lending::borrow_book(&deps, borrow_cmd(book.book_id, borrower.borrower_id))
        .await
        .expect("borrow should succeed");

    assert_eq!(loan.book_id, book.book_id);
    assert_eq!(loan.borrower_id, borrower.borrower_id);
    assert_eq!(loan.due_at, loan.borrowed_at + Duration::days(LOAN_PERIOD_DAYS));
    assert_eq!(quantity_of(&deps, book.book_id).await, 2);

    let stored = LoanLedger::get_by_id(&*library, loan.loan_id)
        .await
        .unwrap()
        .expect("loan should be stored");
    assert!(!stored.is_returned());
    assert_eq!(stored.returned_at(), None);

    // 返却
    let closed = lending::return_book(&deps, return_cmd(loan.loan_id))
        .await
        .expect("return should succeed");

    assert!(closed.returned_at >= closed.borrowed_at);
    assert_eq!(quantity_of(&deps, book.book_id).await, 3);

    let stored = LoanLedger::get_by_id(&*library, loan.loan_id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_returned());
    assert_eq!(stored.returned_at(), Some(closed.returned_at));

    // コミットされた単位ごとにイベントが1件
    let events = library.events().unwrap();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], DomainEvent::BookBorrowed(_)));
    assert!(matches!(events[1], DomainEvent::BookReturned(_)));
}

#[tokio::test]
async fn test_borrow_last_copy() {
    let (_, deps) = common::in_memory_deps();
    let book = common::seed_book(&deps, "978-0-00-000002-8", 1).await;
    let borrower = common::seed_borrower(&deps, "M-002").await;

    lending::borrow_book(&deps, borrow_cmd(book.book_id, borrower.borrower_id))
        .await
        .unwrap();

    assert_eq!(quantity_of(&deps, book.book_id).await, 0);
}

// ============================================================================
// 貸出の異常系
// ============================================================================

#[tokio::test]
async fn test_borrow_unknown_book_changes_nothing() {
    let (library, deps) = common::in_memory_deps();
    let borrower = common::seed_borrower(&deps, "M-003").await;
    let missing = BookId::new();

    let result = lending::borrow_book(&deps, borrow_cmd(missing, borrower.borrower_id)).await;

    assert!(matches!(
        result,
        Err(LendingError::NotFound(EntityKind::Book(id))) if id == missing
    ));
    assert!(LoanLedger::list_all(&*library).await.unwrap().is_empty());
    assert!(library.events().unwrap().is_empty());
}

#[tokio::test]
async fn test_borrow_unknown_borrower() {
    let (library, deps) = common::in_memory_deps();
    let book = common::seed_book(&deps, "978-0-00-000003-5", 2).await;
    let missing = BorrowerId::new();

    let result = lending::borrow_book(&deps, borrow_cmd(book.book_id, missing)).await;

    assert!(matches!(
        result,
        Err(LendingError::NotFound(EntityKind::Borrower(id))) if id == missing
    ));
    assert_eq!(quantity_of(&deps, book.book_id).await, 2);
    assert!(library.events().unwrap().is_empty());
}

#[tokio::test]
async fn test_book_is_checked_before_borrower() {
    let (_, deps) = common::in_memory_deps();

    let result = lending::borrow_book(&deps, borrow_cmd(BookId::new(), BorrowerId::new())).await;

    assert!(matches!(
        result,
        Err(LendingError::NotFound(EntityKind::Book(_)))
    ));
}

#[tokio::test]
async fn test_borrow_out_of_stock_book() {
    let (library, deps) = common::in_memory_deps();
    let book = common::seed_book(&deps, "978-0-00-000004-2", 0).await;
    let borrower = common::seed_borrower(&deps, "M-004").await;

    let result = lending::borrow_book(&deps, borrow_cmd(book.book_id, borrower.borrower_id)).await;

    assert!(matches!(result, Err(LendingError::Unavailable(id)) if id == book.book_id));
    assert_eq!(quantity_of(&deps, book.book_id).await, 0);
    assert!(LoanLedger::list_all(&*library).await.unwrap().is_empty());
    // 在庫の変更がないのでversionも変わらない
    assert_eq!(
        catalog::get_book(&deps, book.book_id).await.unwrap().version,
        book.version
    );
}

// ============================================================================
// 返却の異常系
// ============================================================================

#[tokio::test]
async fn test_return_twice_fails_without_touching_stock() {
    let (library, deps) = common::in_memory_deps();
    let book = common::seed_book(&deps, "978-0-00-000005-9", 1).await;
    let borrower = common::seed_borrower(&deps, "M-005").await;

    let loan = lending::borrow_book(&deps, borrow_cmd(book.book_id, borrower.borrower_id))
        .await
        .unwrap();

    lending::return_book(&deps, return_cmd(loan.loan_id))
        .await
        .expect("first return should succeed");
    let second = lending::return_book(&deps, return_cmd(loan.loan_id)).await;

    assert!(matches!(second, Err(LendingError::AlreadyReturned(id)) if id == loan.loan_id));
    assert_eq!(quantity_of(&deps, book.book_id).await, 1);
    assert_eq!(library.events().unwrap().len(), 2);
}

#[tokio::test]
async fn test_return_unknown_loan() {
    let (_, deps) = common::in_memory_deps();
    let missing = LoanId::new();

    let result = lending::return_book(&deps, return_cmd(missing)).await;

    assert!(matches!(
        result,
        Err(LendingError::NotFound(EntityKind::Loan(id))) if id == missing
    ));
}

#[tokio::test]
async fn test_return_after_book_deleted_closes_loan() {
    let (library, deps) = common::in_memory_deps();
    let book = common::seed_book(&deps, "978-0-00-000006-6", 1).await;
    let borrower = common::seed_borrower(&deps, "M-006").await;

    let loan = lending::borrow_book(&deps, borrow_cmd(book.book_id, borrower.borrower_id))
        .await
        .unwrap();
    catalog::delete_book(&deps, book.book_id).await.unwrap();

    let closed = lending::return_book(&deps, return_cmd(loan.loan_id))
        .await
        .expect("return should succeed even without the book");

    assert_eq!(closed.loan_id, loan.loan_id);
    let stored = LoanLedger::get_by_id(&*library, loan.loan_id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_returned());
    assert!(matches!(
        library.events().unwrap().last(),
        Some(DomainEvent::BookReturned(_))
    ));
}

#[tokio::test]
async fn test_returned_at_is_never_before_borrowed_at() {
    let (_, deps) = common::in_memory_deps();
    let book = common::seed_book(&deps, "978-0-00-000007-3", 1).await;
    let borrower = common::seed_borrower(&deps, "M-007").await;

    let loan = lending::borrow_book(&deps, borrow_cmd(book.book_id, borrower.borrower_id))
        .await
        .unwrap();

    // 時計のずれで貸出より前の時刻が渡された場合
    let closed = lending::return_book(
        &deps,
        ReturnBook {
            loan_id: loan.loan_id,
            returned_at: loan.borrowed_at - Duration::minutes(5),
        },
    )
    .await
    .unwrap();

    assert_eq!(closed.returned_at, loan.borrowed_at);
}

// ============================================================================
// 貸出一覧
// ============================================================================

#[tokio::test]
async fn test_list_loans_newest_first_with_summaries() {
    let (_, deps) = common::in_memory_deps();
    let book = common::seed_book(&deps, "978-0-00-000008-0", 5).await;
    let reader = common::seed_borrower(&deps, "M-008").await;
    let leaver = common::seed_borrower(&deps, "M-009").await;

    let earlier = Utc::now() - Duration::days(2);
    let first = lending::borrow_book(
        &deps,
        BorrowBook {
            book_id: book.book_id,
            borrower_id: reader.borrower_id,
            borrowed_at: earlier,
        },
    )
    .await
    .unwrap();
    let second = lending::borrow_book(&deps, borrow_cmd(book.book_id, leaver.borrower_id))
        .await
        .unwrap();
    lending::return_book(&deps, return_cmd(first.loan_id))
        .await
        .unwrap();

    // 利用者を削除しても貸出記録は残る
    catalog::delete_borrower(&deps, leaver.borrower_id)
        .await
        .unwrap();

    let records = lending::list_loans(&deps).await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].loan.loan_id(), second.loan_id);
    assert!(records[0].borrower.is_none());
    assert_eq!(
        records[0].book.as_ref().map(|b| b.isbn.as_str()),
        Some("978-0-00-000008-0")
    );
    assert_eq!(records[1].loan.loan_id(), first.loan_id);
    assert!(matches!(records[1].loan, Loan::Closed(_)));
    assert_eq!(
        records[1].borrower.as_ref().map(|b| b.membership_id.as_str()),
        Some("M-008")
    );
}

// ============================================================================
// 再試行
// ============================================================================

#[tokio::test]
async fn test_transient_conflicts_are_retried() {
    let (library, base) = common::in_memory_deps();
    let book = common::seed_book(&base, "978-0-00-000009-7", 2).await;
    let borrower = common::seed_borrower(&base, "M-010").await;

    let unit = Arc::new(FlakyUnit::new(library.clone(), 2, || {
        StorageError::Conflict("could not serialize access".into())
    }));
    let deps = with_unit(library.clone(), unit.clone(), base.retry_policy);

    let loan = lending::borrow_book(&deps, borrow_cmd(book.book_id, borrower.borrower_id))
        .await
        .expect("third attempt should succeed");

    assert_eq!(unit.calls.load(Ordering::SeqCst), 3);
    assert_eq!(quantity_of(&deps, book.book_id).await, 1);
    let loans = LoanLedger::list_all(&*library).await.unwrap();
    assert_eq!(loans.len(), 1);
    assert_eq!(loans[0].loan_id(), loan.loan_id);
}

#[tokio::test]
async fn test_retry_budget_exhausted_returns_storage_error() {
    let (library, base) = common::in_memory_deps();
    let book = common::seed_book(&base, "978-0-00-000010-3", 2).await;
    let borrower = common::seed_borrower(&base, "M-011").await;

    let unit = Arc::new(FlakyUnit::new(library.clone(), 10, || StorageError::Timeout));
    let deps = with_unit(library.clone(), unit.clone(), base.retry_policy);

    let result = lending::borrow_book(&deps, borrow_cmd(book.book_id, borrower.borrower_id)).await;

    let err = result.expect_err("all attempts should fail");
    assert!(err.is_transient());
    assert!(!err.is_domain_error());
    assert!(matches!(err, LendingError::Storage(StorageError::Timeout)));
    assert_eq!(unit.calls.load(Ordering::SeqCst), 3);
    assert_eq!(quantity_of(&deps, book.book_id).await, 2);
    assert!(LoanLedger::list_all(&*library).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_backend_errors_are_not_retried() {
    let (library, base) = common::in_memory_deps();
    let book = common::seed_book(&base, "978-0-00-000011-0", 1).await;
    let borrower = common::seed_borrower(&base, "M-012").await;

    let unit = Arc::new(FlakyUnit::new(library.clone(), 1, || {
        StorageError::backend(std::io::Error::other("connection reset"))
    }));
    let deps = with_unit(library.clone(), unit.clone(), base.retry_policy);

    let result = lending::borrow_book(&deps, borrow_cmd(book.book_id, borrower.borrower_id)).await;

    assert!(matches!(result, Err(LendingError::Storage(StorageError::Backend(_)))));
    assert_eq!(unit.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_check_violation_surfaces_as_integrity_violation() {
    let (library, base) = common::in_memory_deps();
    let book = common::seed_book(&base, "978-0-00-000012-7", 1).await;
    let borrower = common::seed_borrower(&base, "M-013").await;

    let unit = Arc::new(FlakyUnit::new(library.clone(), 1, || StorageError::CheckViolation {
        constraint: "books_quantity_check".into(),
    }));
    let deps = with_unit(library.clone(), unit.clone(), base.retry_policy);

    let result = lending::borrow_book(&deps, borrow_cmd(book.book_id, borrower.borrower_id)).await;

    assert!(matches!(result, Err(LendingError::IntegrityViolation(_))));
    assert_eq!(unit.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_return_is_retried_after_conflict() {
    let (library, base) = common::in_memory_deps();
    let book = common::seed_book(&base, "978-0-00-000013-4", 1).await;
    let borrower = common::seed_borrower(&base, "M-014").await;
    let loan = lending::borrow_book(&base, borrow_cmd(book.book_id, borrower.borrower_id))
        .await
        .unwrap();

    let unit = Arc::new(FlakyUnit::new(library.clone(), 1, || {
        StorageError::Conflict("deadlock detected".into())
    }));
    let deps = with_unit(library.clone(), unit.clone(), base.retry_policy);

    lending::return_book(&deps, return_cmd(loan.loan_id))
        .await
        .expect("second attempt should succeed");

    assert_eq!(unit.calls.load(Ordering::SeqCst), 2);
    assert_eq!(quantity_of(&deps, book.book_id).await, 1);
}
