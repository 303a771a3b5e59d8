//! Catalog API handlers using repository pattern

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use super::error_response;
use crate::domain::{BookUpdate, NewBook};
use crate::infrastructure::AppState;

#[derive(Debug, Deserialize)]
pub struct ListBooksQuery {
    pub category: Option<String>,
}

/// List the catalog, optionally restricted to one category
#[utoipa::path(
    get,
    path = "/api/books",
    params(("category" = Option<String>, Query, description = "Only books in this category")),
    responses((status = 200, description = "Books ordered by title"))
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<ListBooksQuery>,
) -> impl IntoResponse {
    let result = match query.category.as_deref() {
        Some(category) if !category.is_empty() => state.book_repo.find_by_category(category).await,
        _ => state.book_repo.find_all().await,
    };

    match result {
        Ok(books) => Json(json!({
            "total": books.len(),
            "books": books,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn list_categories(State(state): State<AppState>) -> impl IntoResponse {
    match state.book_repo.categories().await {
        Ok(categories) => Json(json!({ "categories": categories })).into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    get,
    path = "/api/books/{id}",
    params(("id" = i32, Path, description = "Book id")),
    responses(
        (status = 200, description = "The book"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(State(state): State<AppState>, Path(id): Path<i32>) -> impl IntoResponse {
    match state.book_repo.find_by_id(id).await {
        Ok(Some(book)) => Json(json!({ "book": book })).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Book not found", "kind": "not_found"})),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    post,
    path = "/api/books",
    request_body = NewBook,
    responses(
        (status = 201, description = "Book created with every copy available"),
        (status = 400, description = "Missing fields or fewer than one copy")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    Json(payload): Json<NewBook>,
) -> impl IntoResponse {
    match state.book_repo.create(payload).await {
        Ok(book) => (
            StatusCode::CREATED,
            Json(json!({
                "book": book,
                "message": "Book created successfully"
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    put,
    path = "/api/books/{id}",
    request_body = BookUpdate,
    params(("id" = i32, Path, description = "Book id")),
    responses(
        (status = 200, description = "Book updated"),
        (status = 400, description = "New total below the copies on loan"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<BookUpdate>,
) -> impl IntoResponse {
    match state.book_repo.update(id, payload).await {
        Ok(book) => Json(json!({ "book": book })).into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    delete,
    path = "/api/books/{id}",
    params(("id" = i32, Path, description = "Book id")),
    responses(
        (status = 200, description = "Book deleted"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book has active loans")
    )
)]
pub async fn delete_book(State(state): State<AppState>, Path(id): Path<i32>) -> impl IntoResponse {
    match state.book_repo.delete(id).await {
        Ok(()) => Json(json!({"message": "Book deleted successfully"})).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AdjustCopiesRequest {
    pub total_copies: i32,
}

#[utoipa::path(
    put,
    path = "/api/books/{id}/copies",
    request_body = AdjustCopiesRequest,
    params(("id" = i32, Path, description = "Book id")),
    responses(
        (status = 200, description = "Total and available copies shifted by the same delta"),
        (status = 400, description = "Total below one or below the copies on loan"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn adjust_copies(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<AdjustCopiesRequest>,
) -> impl IntoResponse {
    match state
        .lending
        .adjust_total_copies(id, payload.total_copies)
        .await
    {
        Ok(book) => Json(json!({ "book": book })).into_response(),
        Err(e) => error_response(e),
    }
}
