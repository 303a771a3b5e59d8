//! Statistics Service - read-only summaries over the catalog and the ledger
//!
//! Recomputed on every call. Nothing here writes.

use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::{DomainError, MemberDirectory, Role, TransactionStatus};
use crate::models::book::{self, Entity as Book};
use crate::models::transaction::{self, Entity as Transaction};

/// Library-wide counters (admin dashboard)
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct LibraryStats {
    pub total_books: u64,
    pub total_copies: i64,
    pub available_copies: i64,
    pub active_issues: u64,
    pub overdue_books: u64,
    pub returned_loans: u64,
    pub total_members: u64,
    pub admins: u64,
    pub librarians: u64,
    pub students: u64,
}

/// Copies per category
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct CategoryStats {
    pub category: String,
    pub titles: u64,
    pub total_copies: i64,
    pub available_copies: i64,
}

/// One borrower's counters (student dashboard)
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct BorrowerSummary {
    pub borrower_id: i32,
    pub active: u64,
    pub overdue: u64,
    pub total_borrowed: u64,
}

/// A book whose stored availability disagrees with its ledger
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct InventoryDiscrepancy {
    pub book_id: i32,
    pub title: String,
    pub total_copies: i32,
    pub available_copies: i32,
    pub active_loans: i64,
    pub expected_available: i64,
}

async fn count_status<C: ConnectionTrait>(
    db: &C,
    status: TransactionStatus,
) -> Result<u64, DomainError> {
    let count = Transaction::find()
        .filter(transaction::Column::Status.eq(status.as_str()))
        .count(db)
        .await?;
    Ok(count)
}

/// Library-wide statistics; role counts come from the member directory
pub async fn library_stats(
    db: &DatabaseConnection,
    members: &dyn MemberDirectory,
) -> Result<LibraryStats, DomainError> {
    let copies: Vec<(i32, i32)> = Book::find()
        .select_only()
        .column(book::Column::TotalCopies)
        .column(book::Column::AvailableCopies)
        .into_tuple()
        .all(db)
        .await?;

    let total_copies: i64 = copies.iter().map(|(total, _)| i64::from(*total)).sum();
    let available_copies: i64 = copies.iter().map(|(_, available)| i64::from(*available)).sum();

    let role_counts = members.count_by_role().await?;
    let role_count = |role: Role| role_counts.get(&role).copied().unwrap_or(0);

    Ok(LibraryStats {
        total_books: copies.len() as u64,
        total_copies,
        available_copies,
        active_issues: count_status(db, TransactionStatus::Issued).await?,
        overdue_books: count_status(db, TransactionStatus::Overdue).await?,
        returned_loans: count_status(db, TransactionStatus::Returned).await?,
        total_members: role_counts.values().sum(),
        admins: role_count(Role::Admin),
        librarians: role_count(Role::Librarian),
        students: role_count(Role::Student),
    })
}

/// Titles and copies per category, sorted by category name
pub async fn category_breakdown(db: &DatabaseConnection) -> Result<Vec<CategoryStats>, DomainError> {
    let books = Book::find().all(db).await?;

    let mut by_category: BTreeMap<String, CategoryStats> = BTreeMap::new();
    for book in books {
        let entry = by_category
            .entry(book.category.clone())
            .or_insert_with(|| CategoryStats {
                category: book.category.clone(),
                titles: 0,
                total_copies: 0,
                available_copies: 0,
            });
        entry.titles += 1;
        entry.total_copies += i64::from(book.total_copies);
        entry.available_copies += i64::from(book.available_copies);
    }

    Ok(by_category.into_values().collect())
}

/// Active, overdue and lifetime loan counts for one borrower
pub async fn borrower_summary(
    db: &DatabaseConnection,
    borrower_id: i32,
) -> Result<BorrowerSummary, DomainError> {
    let statuses: Vec<String> = Transaction::find()
        .select_only()
        .column(transaction::Column::Status)
        .filter(transaction::Column::BorrowerId.eq(borrower_id))
        .into_tuple()
        .all(db)
        .await?;

    let mut summary = BorrowerSummary {
        borrower_id,
        active: 0,
        overdue: 0,
        total_borrowed: statuses.len() as u64,
    };

    for status in statuses {
        match status.parse::<TransactionStatus>()? {
            TransactionStatus::Issued => summary.active += 1,
            TransactionStatus::Overdue => summary.overdue += 1,
            TransactionStatus::Returned => {}
        }
    }

    Ok(summary)
}

/// Books where `available_copies != total_copies - active loans`.
///
/// Empty whenever every write went through the lending engine.
pub async fn inventory_audit(
    db: &DatabaseConnection,
) -> Result<Vec<InventoryDiscrepancy>, DomainError> {
    let books = Book::find()
        .order_by_asc(book::Column::Id)
        .all(db)
        .await?;

    let active: Vec<(i32, i64)> = Transaction::find()
        .select_only()
        .column(transaction::Column::BookId)
        .column_as(Expr::col(transaction::Column::Id).count(), "active_loans")
        .filter(transaction::Column::Status.is_in(TransactionStatus::active_values()))
        .group_by(transaction::Column::BookId)
        .into_tuple()
        .all(db)
        .await?;
    let active: BTreeMap<i32, i64> = active.into_iter().collect();

    let discrepancies = books
        .into_iter()
        .filter_map(|book| {
            let active_loans = active.get(&book.id).copied().unwrap_or(0);
            let expected_available = i64::from(book.total_copies) - active_loans;
            (expected_available != i64::from(book.available_copies)).then(|| {
                InventoryDiscrepancy {
                    book_id: book.id,
                    title: book.title,
                    total_copies: book.total_copies,
                    available_copies: book.available_copies,
                    active_loans,
                    expected_available,
                }
            })
        })
        .collect::<Vec<_>>();

    for d in &discrepancies {
        tracing::warn!(
            "Inventory drift on book {}: {} available, {} expected",
            d.book_id,
            d.available_copies,
            d.expected_available
        );
    }

    Ok(discrepancies)
}
