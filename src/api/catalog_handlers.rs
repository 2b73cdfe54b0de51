use crate::application::catalog;
use crate::domain::book::{Book, BookFilter, NewBook};
use crate::domain::borrower::{Borrower, BorrowerDetails};
use crate::domain::value_objects::{BookId, BorrowerId};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{error::ApiError, handlers::AppState, types::UpdateBookRequest};

// ============================================================================
// Books
// ============================================================================

/// GET /api/books
pub async fn list_books(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Book>>, ApiError> {
    Ok(Json(catalog::list_books(&state.service_deps).await?))
}

/// GET /api/books/search?title=&author=&genre=
pub async fn search_books(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<BookFilter>,
) -> Result<Json<Vec<Book>>, ApiError> {
    Ok(Json(catalog::search_books(&state.service_deps, &filter).await?))
}

/// GET /api/books/:id
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<Book>, ApiError> {
    let book = catalog::get_book(&state.service_deps, BookId::from_uuid(book_id)).await?;
    Ok(Json(book))
}

/// POST /api/books
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewBook>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let book = catalog::add_book(&state.service_deps, req).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// PUT /api/books/:id
pub async fn update_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
    Json(req): Json<UpdateBookRequest>,
) -> Result<Json<Book>, ApiError> {
    let book = catalog::update_book(
        &state.service_deps,
        BookId::from_uuid(book_id),
        req.changes,
        req.version,
    )
    .await?;
    Ok(Json(book))
}

/// DELETE /api/books/:id
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    catalog::delete_book(&state.service_deps, BookId::from_uuid(book_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Borrowers
// ============================================================================

/// GET /api/borrowers
pub async fn list_borrowers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Borrower>>, ApiError> {
    Ok(Json(catalog::list_borrowers(&state.service_deps).await?))
}

/// GET /api/borrowers/:id
pub async fn get_borrower(
    State(state): State<Arc<AppState>>,
    Path(borrower_id): Path<Uuid>,
) -> Result<Json<Borrower>, ApiError> {
    let borrower =
        catalog::get_borrower(&state.service_deps, BorrowerId::from_uuid(borrower_id)).await?;
    Ok(Json(borrower))
}

/// POST /api/borrowers
pub async fn create_borrower(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BorrowerDetails>,
) -> Result<(StatusCode, Json<Borrower>), ApiError> {
    let borrower = catalog::add_borrower(&state.service_deps, req).await?;
    Ok((StatusCode::CREATED, Json(borrower)))
}

/// PUT /api/borrowers/:id
pub async fn update_borrower(
    State(state): State<Arc<AppState>>,
    Path(borrower_id): Path<Uuid>,
    Json(req): Json<BorrowerDetails>,
) -> Result<Json<Borrower>, ApiError> {
    let borrower = catalog::update_borrower(
        &state.service_deps,
        BorrowerId::from_uuid(borrower_id),
        req,
    )
    .await?;
    Ok(Json(borrower))
}

/// DELETE /api/borrowers/:id
pub async fn delete_borrower(
    State(state): State<Arc<AppState>>,
    Path(borrower_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    catalog::delete_borrower(&state.service_deps, BorrowerId::from_uuid(borrower_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
