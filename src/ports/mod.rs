pub mod borrower_store;
pub mod catalog_store;
pub mod errors;
pub mod lending_unit_of_work;
pub mod loan_ledger;

pub use borrower_store::BorrowerStore;
pub use catalog_store::CatalogStore;
pub use errors::{Result, StorageError};
pub use lending_unit_of_work::{BorrowOutcome, LendingUnitOfWork, ReturnOutcome};
pub use loan_ledger::LoanLedger;
