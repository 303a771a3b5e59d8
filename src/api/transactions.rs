use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Duration;
use serde::Deserialize;
use serde_json::json;

use super::error_response;
use crate::domain::clock::{format_timestamp, parse_due_date};
use crate::domain::{DomainError, TransactionFilter, TransactionStatus};
use crate::infrastructure::AppState;

#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    pub borrower_id: Option<i32>,
    pub book_id: Option<i32>,
    pub status: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/transactions",
    params(
        ("borrower_id" = Option<i32>, Query, description = "Only this borrower's loans"),
        ("book_id" = Option<i32>, Query, description = "Only loans of this book"),
        ("status" = Option<String>, Query, description = "issued, overdue or returned")
    ),
    responses((status = 200, description = "Transactions, newest issue first"))
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<ListTransactionsQuery>,
) -> impl IntoResponse {
    let status = match query.status.as_deref().map(str::parse::<TransactionStatus>) {
        Some(Ok(status)) => Some(status),
        Some(Err(e)) => return error_response(e),
        None => None,
    };

    let filter = TransactionFilter {
        borrower_id: query.borrower_id,
        book_id: query.book_id,
        status,
    };

    match state.transaction_repo.find(filter).await {
        Ok(transactions) => Json(json!({
            "total": transactions.len(),
            "transactions": transactions,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match state.transaction_repo.find_by_id(id).await {
        Ok(Some(transaction)) => Json(json!({ "transaction": transaction })).into_response(),
        Ok(None) => error_response(DomainError::NotFound),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct IssueBookRequest {
    pub book_id: i32,
    pub borrower_id: i32,
    /// Librarian or admin performing the issue
    pub issuer_id: i32,
    /// `YYYY-MM-DD` (due by end of day) or RFC 3339; defaults to the configured loan length
    pub due_date: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/transactions",
    request_body = IssueBookRequest,
    responses(
        (status = 201, description = "Copy issued"),
        (status = 400, description = "Due date not after issue date"),
        (status = 404, description = "Book or borrower not found"),
        (status = 409, description = "Out of stock or already on loan to this borrower")
    )
)]
pub async fn issue_book(
    State(state): State<AppState>,
    Json(payload): Json<IssueBookRequest>,
) -> impl IntoResponse {
    let due_date = match payload.due_date.as_deref() {
        Some(raw) => match parse_due_date(raw) {
            Ok(due) => due,
            Err(e) => return error_response(e),
        },
        None => {
            let now = state.lending.now();
            match now.checked_add_signed(Duration::days(state.default_loan_days)) {
                Some(due) => due,
                None => {
                    return error_response(DomainError::InvalidRange(format!(
                        "a {}-day loan from {} is out of range",
                        state.default_loan_days,
                        format_timestamp(now)
                    )));
                }
            }
        }
    };

    match state
        .lending
        .issue_book(
            payload.book_id,
            payload.borrower_id,
            payload.issuer_id,
            due_date,
        )
        .await
    {
        Ok(transaction) => (
            StatusCode::CREATED,
            Json(json!({
                "transaction": transaction,
                "message": "Book issued successfully"
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    put,
    path = "/api/transactions/{id}/return",
    params(("id" = i32, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Loan closed, copy back on the shelf"),
        (status = 404, description = "Transaction not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_book(State(state): State<AppState>, Path(id): Path<i32>) -> impl IntoResponse {
    match state.lending.return_book(id).await {
        Ok(transaction) => Json(json!({
            "transaction": transaction,
            "message": "Book returned successfully"
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    post,
    path = "/api/transactions/sweep",
    responses((status = 200, description = "Number of loans newly marked overdue"))
)]
pub async fn sweep_overdue(State(state): State<AppState>) -> impl IntoResponse {
    let now = state.lending.now();
    match state.lending.sweep_overdue(now).await {
        Ok(transitioned) => Json(json!({
            "transitioned": transitioned,
            "swept_at": format_timestamp(now)
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}
