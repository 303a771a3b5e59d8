pub mod books;
pub mod health;
pub mod members;
pub mod stats;
pub mod transactions;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::json;

use crate::domain::DomainError;
use crate::infrastructure::AppState;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Catalog / inventory
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/categories", get(books::list_categories))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        .route("/books/:id/copies", put(books::adjust_copies))
        // Ledger
        .route(
            "/transactions",
            get(transactions::list_transactions).post(transactions::issue_book),
        )
        .route("/transactions/sweep", post(transactions::sweep_overdue))
        .route("/transactions/:id", get(transactions::get_transaction))
        .route("/transactions/:id/return", put(transactions::return_book))
        // Members
        .route(
            "/members",
            get(members::list_members).post(members::create_member),
        )
        .route("/members/:id/transactions", get(members::member_history))
        .route("/members/:id/summary", get(members::member_summary))
        // Statistics
        .route("/stats", get(stats::get_stats))
        .route("/stats/categories", get(stats::get_category_stats))
        .route("/stats/audit", get(stats::get_inventory_audit))
        .with_state(state)
}

/// Map a domain failure to its HTTP status and a `{"error", "kind"}` body
pub fn error_response(e: DomainError) -> Response {
    let status = match &e {
        DomainError::NotFound => StatusCode::NOT_FOUND,
        DomainError::OutOfStock | DomainError::Conflict(_) | DomainError::InvalidState(_) => {
            StatusCode::CONFLICT
        }
        DomainError::InvalidRange(_) | DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!("Request failed: {}", e);
    }

    (
        status,
        Json(json!({ "error": e.to_string(), "kind": e.kind() })),
    )
        .into_response()
}
