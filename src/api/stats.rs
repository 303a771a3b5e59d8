use axum::{Json, extract::State, response::IntoResponse};
use sea_orm::DatabaseConnection;
use serde_json::json;

use super::error_response;
use crate::infrastructure::AppState;
use crate::services;

#[utoipa::path(
    get,
    path = "/api/stats",
    responses((status = 200, description = "Library-wide counters", body = crate::services::LibraryStats))
)]
pub async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    match services::library_stats(state.db(), state.members.as_ref()).await {
        Ok(stats) => Json(json!({ "stats": stats })).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get_category_stats(State(db): State<DatabaseConnection>) -> impl IntoResponse {
    match services::category_breakdown(&db).await {
        Ok(categories) => Json(json!({ "categories": categories })).into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    get,
    path = "/api/stats/audit",
    responses((status = 200, description = "Books whose availability disagrees with the ledger"))
)]
pub async fn get_inventory_audit(State(db): State<DatabaseConnection>) -> impl IntoResponse {
    match services::inventory_audit(&db).await {
        Ok(discrepancies) => Json(json!({
            "consistent": discrepancies.is_empty(),
            "discrepancies": discrepancies,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}
