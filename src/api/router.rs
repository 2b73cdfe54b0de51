use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::catalog_handlers::{
    create_book, create_borrower, delete_book, delete_borrower, get_book, get_borrower,
    list_books, list_borrowers, search_books, update_book, update_borrower,
};
use super::handlers::{AppState, borrow_book, list_loan_records, return_book};

/// Creates the API router
///
/// Lending endpoints:
/// - POST /api/borrow - Borrow a book
/// - POST /api/borrow/return/:id - Return a borrowed book
/// - GET /api/borrow/records - List all loans with book and borrower summaries
///
/// Catalog endpoints:
/// - /api/books, /api/books/search, /api/books/:id
/// - /api/borrowers, /api/borrowers/:id
///
/// `allowed_origin` is the front-end origin allowed by CORS.
pub fn create_router(state: Arc<AppState>, allowed_origin: HeaderValue) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // Lending
        .route("/api/borrow", post(borrow_book))
        .route("/api/borrow/return/:id", post(return_book))
        .route("/api/borrow/records", get(list_loan_records))
        // Books
        .route("/api/books", get(list_books).post(create_book))
        .route("/api/books/search", get(search_books))
        .route(
            "/api/books/:id",
            get(get_book).put(update_book).delete(delete_book),
        )
        // Borrowers
        .route("/api/borrowers", get(list_borrowers).post(create_borrower))
        .route(
            "/api/borrowers/:id",
            get(get_borrower).put(update_borrower).delete(delete_borrower),
        )
        // Add tracing and CORS middleware (outermost first)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
