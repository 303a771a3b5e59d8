//! Lending Service - issue, return and overdue sweep
//!
//! Every operation that touches both the inventory and the ledger runs inside
//! one store transaction. Validation happens before the first write; any
//! failure drops the transaction, which rolls it back.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::*;
use std::sync::Arc;

use crate::domain::clock::{ensure_storable, format_timestamp};
use crate::domain::{Clock, DomainError, TransactionStatus};
use crate::infrastructure::repositories::inventory;
use crate::models::Book;
use crate::models::Transaction;
use crate::models::book::Entity as BookEntity;
use crate::models::member::Entity as MemberEntity;
use crate::models::transaction::{self, Entity as TransactionEntity};

/// Coordinates copy counters and the transaction ledger.
///
/// Holds no state besides the connection and time source; every call reads
/// the store afresh.
#[derive(Clone)]
pub struct LendingService {
    db: DatabaseConnection,
    clock: Arc<dyn Clock>,
}

impl LendingService {
    pub fn new(db: DatabaseConnection, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Lend one copy of `book_id` to `borrower_id`.
    ///
    /// Checks, in order: due date after now, book exists, borrower exists,
    /// no active loan of this book to this borrower, a copy is on the shelf.
    pub async fn issue_book(
        &self,
        book_id: i32,
        borrower_id: i32,
        issuer_id: i32,
        due_date: DateTime<Utc>,
    ) -> Result<Transaction, DomainError> {
        let issued_at = self.clock.now();
        let due_date = ensure_storable(due_date)?;
        if due_date <= issued_at {
            return Err(DomainError::InvalidRange(format!(
                "due date {} must be after issue date {}",
                format_timestamp(due_date),
                format_timestamp(issued_at)
            )));
        }
        let now = format_timestamp(issued_at);

        let txn = self.db.begin().await?;

        // The counter write comes first so the transaction holds the write
        // lock before it reads anything; its outcome is reported only after
        // the other checks.
        let reserved = inventory::take_copy(&txn, book_id, &now).await?;

        let book = BookEntity::find_by_id(book_id)
            .one(&txn)
            .await?
            .ok_or(DomainError::NotFound)?;

        MemberEntity::find_by_id(borrower_id)
            .one(&txn)
            .await?
            .ok_or(DomainError::NotFound)?;

        let already_lent = TransactionEntity::find()
            .filter(transaction::Column::BookId.eq(book_id))
            .filter(transaction::Column::BorrowerId.eq(borrower_id))
            .filter(transaction::Column::Status.is_in(TransactionStatus::active_values()))
            .count(&txn)
            .await?;
        if already_lent > 0 {
            return Err(DomainError::Conflict(format!(
                "borrower {} already has '{}' on loan",
                borrower_id, book.title
            )));
        }

        if !reserved {
            tracing::info!(
                "Issue of book {} to borrower {} refused: out of stock",
                book_id,
                borrower_id
            );
            return Err(DomainError::OutOfStock);
        }

        let new_loan = transaction::ActiveModel {
            book_id: Set(book_id),
            borrower_id: Set(borrower_id),
            issued_by: Set(issuer_id),
            issue_date: Set(now.clone()),
            due_date: Set(format_timestamp(due_date)),
            return_date: Set(None),
            status: Set(TransactionStatus::Issued.as_str().to_owned()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let saved = new_loan.insert(&txn).await.map_err(|e| match e.sql_err() {
            // Lost a race with an identical issue on another connection
            Some(SqlErr::UniqueConstraintViolation(_)) => DomainError::Conflict(format!(
                "borrower {} already has '{}' on loan",
                borrower_id, book.title
            )),
            _ => DomainError::from(e),
        })?;

        txn.commit().await?;

        tracing::info!(
            "Issued book {} '{}' to borrower {} (transaction {}, due {})",
            book_id,
            book.title,
            borrower_id,
            saved.id,
            saved.due_date
        );

        Transaction::try_from(saved)
    }

    /// Close a loan and put its copy back on the shelf.
    pub async fn return_book(&self, transaction_id: i32) -> Result<Transaction, DomainError> {
        let now = format_timestamp(self.clock.now());

        let txn = self.db.begin().await?;

        // Conditioned on the status still being active, so a concurrent
        // return that committed first makes this one fail instead of
        // restoring the copy twice.
        let result = TransactionEntity::update_many()
            .col_expr(
                transaction::Column::Status,
                Expr::value(TransactionStatus::Returned.as_str()),
            )
            .col_expr(transaction::Column::ReturnDate, Expr::value(Some(now.clone())))
            .col_expr(transaction::Column::UpdatedAt, Expr::value(now.clone()))
            .filter(transaction::Column::Id.eq(transaction_id))
            .filter(
                transaction::Column::Status
                    .is_in(TransactionStatus::sources_of(TransactionStatus::Returned)),
            )
            .exec(&txn)
            .await?;

        let loan = TransactionEntity::find_by_id(transaction_id)
            .one(&txn)
            .await?
            .ok_or(DomainError::NotFound)?;

        if result.rows_affected == 0 {
            return Err(DomainError::InvalidState(format!(
                "transaction {} is already {}",
                transaction_id, loan.status
            )));
        }

        if !inventory::restore_copy(&txn, loan.book_id, &now).await? {
            tracing::warn!(
                "Book {} already had every copy on the shelf when transaction {} was returned",
                loan.book_id,
                transaction_id
            );
        }

        txn.commit().await?;

        tracing::info!(
            "Returned transaction {} (book {}, borrower {})",
            transaction_id,
            loan.book_id,
            loan.borrower_id
        );

        Transaction::try_from(loan)
    }

    /// Mark every issued loan whose due date is before `now` as overdue.
    ///
    /// Idempotent for a given `now`. Copy counters are untouched: overdue
    /// copies are still out.
    pub async fn sweep_overdue(&self, now: DateTime<Utc>) -> Result<u64, DomainError> {
        let now = format_timestamp(now);

        let result = TransactionEntity::update_many()
            .col_expr(
                transaction::Column::Status,
                Expr::value(TransactionStatus::Overdue.as_str()),
            )
            .col_expr(transaction::Column::UpdatedAt, Expr::value(now.clone()))
            .filter(
                transaction::Column::Status
                    .is_in(TransactionStatus::sources_of(TransactionStatus::Overdue)),
            )
            .filter(transaction::Column::DueDate.lt(now.clone()))
            .exec(&self.db)
            .await?;

        if result.rows_affected > 0 {
            tracing::info!(
                "Overdue sweep at {} flagged {} transaction(s)",
                now,
                result.rows_affected
            );
        } else {
            tracing::debug!("Overdue sweep at {} found nothing", now);
        }

        Ok(result.rows_affected)
    }

    /// Sweep against the service clock
    pub async fn sweep_overdue_now(&self) -> Result<u64, DomainError> {
        self.sweep_overdue(self.clock.now()).await
    }

    /// Change how many copies of a book the library owns.
    ///
    /// Availability moves by the same delta; reductions below the number on
    /// loan fail with `InvalidRange` instead of clamping.
    pub async fn adjust_total_copies(
        &self,
        book_id: i32,
        new_total: i32,
    ) -> Result<Book, DomainError> {
        let now = format_timestamp(self.clock.now());

        let txn = self.db.begin().await?;
        inventory::resize(&txn, book_id, new_total, &now).await?;
        let book = BookEntity::find_by_id(book_id)
            .one(&txn)
            .await?
            .ok_or(DomainError::NotFound)?;
        txn.commit().await?;

        tracing::info!(
            "Book {} now has {} copies ({} available)",
            book_id,
            book.total_copies,
            book.available_copies
        );

        Ok(Book::from(book))
    }
}
