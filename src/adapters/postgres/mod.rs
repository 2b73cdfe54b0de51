pub mod borrower_store;
pub mod catalog_store;
pub mod errors;
pub mod lending_unit_of_work;
pub mod loan_ledger;

// パブリックに型を再エクスポート
pub use borrower_store::BorrowerStore as PostgresBorrowerStore;
pub use catalog_store::CatalogStore as PostgresCatalogStore;
pub use lending_unit_of_work::LendingUnitOfWork as PostgresLendingUnitOfWork;
pub use loan_ledger::LoanLedger as PostgresLoanLedger;
