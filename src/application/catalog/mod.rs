mod book_service;
mod borrower_service;
mod errors;

pub use book_service::{add_book, delete_book, get_book, list_books, search_books, update_book};
pub use borrower_service::{
    add_borrower, delete_borrower, get_borrower, list_borrowers, update_borrower,
};
pub use errors::{CatalogError, Result};
