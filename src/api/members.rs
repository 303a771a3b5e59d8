use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use super::error_response;
use crate::domain::{DomainError, NewMember};
use crate::infrastructure::AppState;
use crate::services;

pub async fn list_members(State(state): State<AppState>) -> impl IntoResponse {
    match state.members.find_all().await {
        Ok(members) => Json(json!({
            "total": members.len(),
            "members": members,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn create_member(
    State(state): State<AppState>,
    Json(payload): Json<NewMember>,
) -> impl IntoResponse {
    match state.members.register(payload).await {
        Ok(member) => (StatusCode::CREATED, Json(json!({ "member": member }))).into_response(),
        Err(e) => error_response(e),
    }
}

/// A borrower's loans with book details, newest first
#[utoipa::path(
    get,
    path = "/api/members/{id}/transactions",
    params(("id" = i32, Path, description = "Member id")),
    responses(
        (status = 200, description = "Loan history"),
        (status = 404, description = "Member not found")
    )
)]
pub async fn member_history(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match state.members.find_by_id(id).await {
        Ok(Some(_)) => {}
        Ok(None) => return error_response(DomainError::NotFound),
        Err(e) => return error_response(e),
    }

    match state.transaction_repo.history(id).await {
        Ok(loans) => Json(json!({
            "total": loans.len(),
            "transactions": loans,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn member_summary(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match state.members.find_by_id(id).await {
        Ok(Some(_)) => {}
        Ok(None) => return error_response(DomainError::NotFound),
        Err(e) => return error_response(e),
    }

    match services::borrower_summary(state.db(), id).await {
        Ok(summary) => Json(json!({ "summary": summary })).into_response(),
        Err(e) => error_response(e),
    }
}
