use crate::domain::book::{Book, BookFilter};
use crate::domain::borrower::Borrower;
use crate::domain::events::{BookBorrowed, BookReturned, DomainEvent};
use crate::domain::loan::{self, ClosedLoan, Loan, OpenLoan};
use crate::domain::value_objects::{BookId, BorrowerId, LoanId};
use crate::ports::{
    BorrowOutcome, BorrowerStore, CatalogStore, LendingUnitOfWork, LoanLedger, Result,
    ReturnOutcome, StorageError,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct LibraryState {
    books: HashMap<BookId, Book>,
    borrowers: HashMap<BorrowerId, Borrower>,
    loans: HashMap<LoanId, Loan>,
    events: Vec<DomainEvent>,
}

/// すべてのストレージポートのインメモリ実装
///
/// 書籍・利用者・貸出・イベントログを1つのMutexで保護し、
/// 貸出/返却の単位をアトミックに適用する。条件付き更新の振る舞いは
/// PostgreSQLアダプターと同じ。テストとDATABASE_URL未設定時に使用する。
#[derive(Debug, Default)]
pub struct InMemoryLibrary {
    state: Mutex<LibraryState>,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, LibraryState>> {
        self.state
            .lock()
            .map_err(|_| StorageError::Backend("in-memory library mutex poisoned".into()))
    }

    /// 記録順のイベントログのスナップショット
    pub fn events(&self) -> Result<Vec<DomainEvent>> {
        Ok(self.state()?.events.clone())
    }
}

fn sorted_books(books: impl Iterator<Item = Book>) -> Vec<Book> {
    let mut books: Vec<Book> = books.collect();
    books.sort_by(|a, b| a.title.cmp(&b.title).then(a.isbn.cmp(&b.isbn)));
    books
}

#[async_trait]
impl CatalogStore for InMemoryLibrary {
    async fn get_by_id(&self, book_id: BookId) -> Result<Option<Book>> {
        Ok(self.state()?.books.get(&book_id).cloned())
    }

    async fn get_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        Ok(self
            .state()?
            .books
            .values()
            .find(|b| b.isbn == isbn)
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<Book>> {
        Ok(sorted_books(self.state()?.books.values().cloned()))
    }

    async fn search(&self, filter: &BookFilter) -> Result<Vec<Book>> {
        Ok(sorted_books(
            self.state()?
                .books
                .values()
                .filter(|b| filter.matches(b))
                .cloned(),
        ))
    }

    /// books.isbnの一意制約と同じくISBNの重複を拒否する
    async fn insert(&self, book: Book) -> Result<()> {
        let mut state = self.state()?;
        if state.books.values().any(|b| b.isbn == book.isbn) {
            return Err(StorageError::UniqueViolation {
                constraint: "books_isbn_key".to_string(),
            });
        }
        state.books.insert(book.book_id, book);
        Ok(())
    }

    async fn update(&self, book: Book) -> Result<Option<Book>> {
        let mut state = self.state()?;
        let Some(stored) = state.books.get_mut(&book.book_id) else {
            return Ok(None);
        };
        if stored.version != book.version {
            return Err(StorageError::Conflict(format!(
                "book {} version {} is stale (current {})",
                book.book_id, book.version, stored.version
            )));
        }
        *stored = Book {
            version: book.version + 1,
            ..book
        };
        Ok(Some(stored.clone()))
    }

    async fn delete(&self, book_id: BookId) -> Result<bool> {
        Ok(self.state()?.books.remove(&book_id).is_some())
    }
}

#[async_trait]
impl BorrowerStore for InMemoryLibrary {
    async fn get_by_id(&self, borrower_id: BorrowerId) -> Result<Option<Borrower>> {
        Ok(self.state()?.borrowers.get(&borrower_id).cloned())
    }

    async fn get_by_membership_id(&self, membership_id: &str) -> Result<Option<Borrower>> {
        Ok(self
            .state()?
            .borrowers
            .values()
            .find(|b| b.membership_id == membership_id)
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<Borrower>> {
        let mut borrowers: Vec<Borrower> = self.state()?.borrowers.values().cloned().collect();
        borrowers.sort_by(|a, b| a.name.cmp(&b.name).then(a.membership_id.cmp(&b.membership_id)));
        Ok(borrowers)
    }

    async fn insert(&self, borrower: Borrower) -> Result<()> {
        let mut state = self.state()?;
        if state
            .borrowers
            .values()
            .any(|b| b.membership_id == borrower.membership_id)
        {
            return Err(StorageError::UniqueViolation {
                constraint: "borrowers_membership_id_key".to_string(),
            });
        }
        state.borrowers.insert(borrower.borrower_id, borrower);
        Ok(())
    }

    async fn update(&self, borrower: Borrower) -> Result<Option<Borrower>> {
        let mut state = self.state()?;
        if !state.borrowers.contains_key(&borrower.borrower_id) {
            return Ok(None);
        }
        if state.borrowers.values().any(|b| {
            b.borrower_id != borrower.borrower_id && b.membership_id == borrower.membership_id
        }) {
            return Err(StorageError::UniqueViolation {
                constraint: "borrowers_membership_id_key".to_string(),
            });
        }
        state.borrowers.insert(borrower.borrower_id, borrower.clone());
        Ok(Some(borrower))
    }

    async fn delete(&self, borrower_id: BorrowerId) -> Result<bool> {
        Ok(self.state()?.borrowers.remove(&borrower_id).is_some())
    }
}

#[async_trait]
impl LoanLedger for InMemoryLibrary {
    async fn get_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        Ok(self.state()?.loans.get(&loan_id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Loan>> {
        let mut loans: Vec<Loan> = self.state()?.loans.values().cloned().collect();
        loans.sort_by(|a, b| b.core().borrowed_at.cmp(&a.core().borrowed_at));
        Ok(loans)
    }

    async fn insert(&self, loan: OpenLoan) -> Result<()> {
        let mut state = self.state()?;
        if state.loans.contains_key(&loan.loan_id) {
            return Err(StorageError::UniqueViolation {
                constraint: "loans_pkey".to_string(),
            });
        }
        state.loans.insert(loan.loan_id, Loan::Open(loan));
        Ok(())
    }

    async fn update(&self, loan: ClosedLoan) -> Result<bool> {
        let mut state = self.state()?;
        match state.loans.get(&loan.loan_id) {
            Some(Loan::Open(_)) => {
                state.loans.insert(loan.loan_id, Loan::Closed(loan));
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl LendingUnitOfWork for InMemoryLibrary {
    async fn commit_borrow(&self, event: &BookBorrowed) -> Result<BorrowOutcome> {
        let mut state = self.state()?;

        if !state.borrowers.contains_key(&event.borrower_id) {
            return Ok(BorrowOutcome::BorrowerMissing);
        }
        let Some(book) = state.books.get(&event.book_id) else {
            return Ok(BorrowOutcome::BookMissing);
        };
        // 条件付き減算：quantity > 0 の場合のみ
        let Ok(remaining) = book.quantity.decrement() else {
            return Ok(BorrowOutcome::StockExhausted);
        };

        let domain_event = DomainEvent::BookBorrowed(event.clone());
        let existing = state.loans.get(&event.loan_id).cloned();
        let loan = loan::apply_event(existing, &domain_event)
            .map_err(|e| StorageError::InvalidData(e.to_string()))?;

        // ここから先の書き込みは失敗しない
        if let Some(book) = state.books.get_mut(&event.book_id) {
            book.quantity = remaining;
            book.version += 1;
        }
        state.loans.insert(event.loan_id, loan);
        state.events.push(domain_event);

        Ok(BorrowOutcome::Committed)
    }

    async fn commit_return(&self, event: &BookReturned) -> Result<ReturnOutcome> {
        let mut state = self.state()?;

        let existing = match state.loans.get(&event.loan_id) {
            None => return Ok(ReturnOutcome::LoanMissing),
            Some(Loan::Closed(_)) => return Ok(ReturnOutcome::AlreadyClosed),
            Some(open) => open.clone(),
        };

        let domain_event = DomainEvent::BookReturned(event.clone());
        let loan = loan::apply_event(Some(existing), &domain_event)
            .map_err(|e| StorageError::InvalidData(e.to_string()))?;
        let restored = state
            .books
            .get(&event.book_id)
            .map(|book| book.quantity.increment())
            .transpose()
            .map_err(|e| StorageError::InvalidData(format!("book {}: {}", event.book_id, e)))?;

        // ここから先の書き込みは失敗しない
        state.loans.insert(event.loan_id, loan);
        let stock_restored = match (state.books.get_mut(&event.book_id), restored) {
            (Some(book), Some(quantity)) => {
                book.quantity = quantity;
                book.version += 1;
                true
            }
            _ => false,
        };
        state.events.push(domain_event);

        Ok(ReturnOutcome::Closed { stock_restored })
    }
}
