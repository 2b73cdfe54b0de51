mod errors;
mod lending_service;
mod retry;

pub use errors::{EntityKind, LendingError, Result};
pub use lending_service::{LoanRecord, borrow_book, list_loans, return_book};
pub use retry::{DEFAULT_BACKOFF, DEFAULT_MAX_ATTEMPTS, RetryPolicy};
