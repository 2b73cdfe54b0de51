use crate::application::ServiceDependencies;
use crate::application::lending::{
    borrow_book as execute_borrow_book, list_loans as execute_list_loans,
    return_book as execute_return_book,
};
use crate::domain::commands::ReturnBook;
use crate::domain::loan::Loan;
use crate::domain::value_objects::LoanId;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    error::ApiError,
    types::{BorrowRequest, LoanRecordResponse, LoanResponse, ReturnResponse},
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
}

// ============================================================================
// Lending handlers
// ============================================================================

/// POST /api/borrow - 書籍を貸し出す
///
/// 強制されるビジネスルール:
/// - 書籍・利用者が存在すること
/// - 在庫が1冊以上あること
pub async fn borrow_book(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BorrowRequest>,
) -> Result<(StatusCode, Json<LoanResponse>), ApiError> {
    let cmd = req.to_command(chrono::Utc::now());

    let open_loan = execute_borrow_book(&state.service_deps, cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanResponse::from(&Loan::Open(open_loan))),
    ))
}

/// POST /api/borrow/return/:id - 書籍を返却する
///
/// 強制されるビジネスルール:
/// - 貸出が存在すること
/// - 既に返却済みでないこと
pub async fn return_book(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<ReturnResponse>, ApiError> {
    let cmd = ReturnBook {
        loan_id: LoanId::from_uuid(loan_id),
        returned_at: chrono::Utc::now(),
    };

    let closed_loan = execute_return_book(&state.service_deps, cmd).await?;

    Ok(Json(ReturnResponse::from(&closed_loan)))
}

/// GET /api/borrow/records - 全貸出記録（貸出日時の降順）
pub async fn list_loan_records(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LoanRecordResponse>>, ApiError> {
    let records = execute_list_loans(&state.service_deps).await?;

    Ok(Json(
        records.into_iter().map(LoanRecordResponse::from).collect(),
    ))
}
