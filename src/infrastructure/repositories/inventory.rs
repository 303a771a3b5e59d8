//! Atomic copy-counter statements
//!
//! Every write to `books.available_copies` goes through one of these
//! conditional updates. The guard lives in the `WHERE` clause, so the check
//! and the write are a single statement and two callers can never both act
//! on the same stale count. Zero affected rows means the guard failed; callers
//! re-read the row to tell "missing" apart from "out of range".

use sea_orm::sea_query::{Expr, Query};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};

use crate::domain::{DomainError, TransactionStatus, validate_total_copies};
use crate::models::book::{Column, Entity as BookEntity};
use crate::models::transaction;

/// Take one copy off the shelf. Returns `false` when none is available
/// (or the book does not exist).
pub async fn take_copy<C: ConnectionTrait>(
    conn: &C,
    book_id: i32,
    now: &str,
) -> Result<bool, DbErr> {
    let result = BookEntity::update_many()
        .col_expr(
            Column::AvailableCopies,
            Expr::col(Column::AvailableCopies).sub(1),
        )
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::Id.eq(book_id))
        .filter(Column::AvailableCopies.gt(0))
        .exec(conn)
        .await?;

    Ok(result.rows_affected == 1)
}

/// Put one copy back, never exceeding `total_copies`.
/// Returns `false` when the cap held the counter back.
pub async fn restore_copy<C: ConnectionTrait>(
    conn: &C,
    book_id: i32,
    now: &str,
) -> Result<bool, DbErr> {
    let result = BookEntity::update_many()
        .col_expr(
            Column::AvailableCopies,
            Expr::col(Column::AvailableCopies).add(1),
        )
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::Id.eq(book_id))
        .filter(Expr::col(Column::AvailableCopies).lt(Expr::col(Column::TotalCopies)))
        .exec(conn)
        .await?;

    Ok(result.rows_affected == 1)
}

/// Set `total_copies` and shift `available_copies` by the same delta.
///
/// Rejects totals below one and reductions that would leave fewer copies
/// than are currently on loan. Never clamps.
pub async fn resize<C: ConnectionTrait>(
    conn: &C,
    book_id: i32,
    new_total: i32,
    now: &str,
) -> Result<(), DomainError> {
    validate_total_copies(new_total)?;

    // available + (new_total - total), evaluated against the pre-update row
    let shifted = Expr::col(Column::AvailableCopies)
        .add(new_total)
        .sub(Expr::col(Column::TotalCopies));

    let result = BookEntity::update_many()
        .col_expr(Column::AvailableCopies, shifted.clone())
        .col_expr(Column::TotalCopies, Expr::value(new_total))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::Id.eq(book_id))
        .filter(Expr::expr(shifted).gte(0))
        .exec(conn)
        .await?;

    if result.rows_affected == 1 {
        return Ok(());
    }

    let book = BookEntity::find_by_id(book_id)
        .one(conn)
        .await?
        .ok_or(DomainError::NotFound)?;

    Err(DomainError::InvalidRange(format!(
        "cannot reduce total_copies of book {} to {}: {} copies are on loan",
        book_id,
        new_total,
        book.total_copies - book.available_copies
    )))
}

/// Delete a book unless an active loan references it.
pub async fn delete_if_idle<C: ConnectionTrait>(conn: &C, book_id: i32) -> Result<(), DomainError> {
    let active_loans = Query::select()
        .column(transaction::Column::BookId)
        .from(transaction::Entity)
        .and_where(transaction::Column::Status.is_in(TransactionStatus::active_values()))
        .to_owned();

    let result = BookEntity::delete_many()
        .filter(Column::Id.eq(book_id))
        .filter(Column::Id.not_in_subquery(active_loans))
        .exec(conn)
        .await?;

    if result.rows_affected == 1 {
        return Ok(());
    }

    match BookEntity::find_by_id(book_id).one(conn).await? {
        Some(_) => Err(DomainError::Conflict(format!(
            "book {} has active loans",
            book_id
        ))),
        None => Err(DomainError::NotFound),
    }
}
