//! Repository trait definitions
//!
//! These traits define the contract for data access.
//! Implementations live in the infrastructure layer.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::{DomainError, Role, TransactionStatus};
use crate::models::book::Book;
use crate::models::member::Member;
use crate::models::transaction::Transaction;

/// Input for cataloguing a new book
#[derive(Debug, Clone, serde::Deserialize, utoipa::ToSchema)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub category: String,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub description: Option<String>,
    pub total_copies: i32,
}

impl NewBook {
    /// Required fields present and at least one copy
    pub fn validate(&self) -> Result<(), DomainError> {
        for (field, value) in [
            ("title", &self.title),
            ("author", &self.author),
            ("isbn", &self.isbn),
            ("category", &self.category),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::Validation(format!("{} is required", field)));
            }
        }
        validate_total_copies(self.total_copies)
    }
}

/// Partial update of a catalog entry.
///
/// `None` leaves a field untouched; `Some(None)` clears an optional field.
#[derive(Debug, Default, Clone, serde::Deserialize, utoipa::ToSchema)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<String>)]
    pub publisher: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<i32>)]
    pub publication_year: Option<Option<i32>>,
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub total_copies: Option<i32>,
}

// `"field": null` becomes `Some(None)`; an absent field stays `None`
fn explicit_null<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

pub fn validate_total_copies(total_copies: i32) -> Result<(), DomainError> {
    if total_copies < 1 {
        return Err(DomainError::InvalidRange(format!(
            "total_copies must be at least 1, got {}",
            total_copies
        )));
    }
    Ok(())
}

/// Filter criteria for ledger queries
#[derive(Debug, Default, Clone)]
pub struct TransactionFilter {
    pub borrower_id: Option<i32>,
    pub book_id: Option<i32>,
    pub status: Option<TransactionStatus>,
}

/// Ledger row joined with the catalog entry it lends
#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct LoanRecord {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub book_title: String,
    pub book_author: String,
    pub book_isbn: String,
}

/// Input for registering a member with the directory
#[derive(Debug, Clone, serde::Deserialize, utoipa::ToSchema)]
pub struct NewMember {
    pub full_name: String,
    pub email: String,
    pub role: Role,
}

/// Repository trait for the book inventory
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Full catalog, ordered by title
    async fn find_all(&self) -> Result<Vec<Book>, DomainError>;

    /// Find a single book by ID
    async fn find_by_id(&self, id: i32) -> Result<Option<Book>, DomainError>;

    async fn find_by_category(&self, category: &str) -> Result<Vec<Book>, DomainError>;

    /// Distinct categories, sorted
    async fn categories(&self) -> Result<Vec<String>, DomainError>;

    /// Create a new book with every copy available
    async fn create(&self, book: NewBook) -> Result<Book, DomainError>;

    /// Update metadata and, when `total_copies` changes, shift availability by the delta
    async fn update(&self, id: i32, update: BookUpdate) -> Result<Book, DomainError>;

    /// Delete a book that has no active loans
    async fn delete(&self, id: i32) -> Result<(), DomainError>;
}

/// Read side of the transaction ledger. Writes go through the lending engine.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<Transaction>, DomainError>;

    /// Matching transactions, newest issue first
    async fn find(&self, filter: TransactionFilter) -> Result<Vec<Transaction>, DomainError>;

    /// A borrower's loans with book details, newest issue first
    async fn history(&self, borrower_id: i32) -> Result<Vec<LoanRecord>, DomainError>;
}

/// The lending core's window onto the authorization collaborator
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Member>, DomainError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<Member>, DomainError>;

    async fn register(&self, member: NewMember) -> Result<Member, DomainError>;

    /// Member count per role; roles without members report zero
    async fn count_by_role(&self) -> Result<BTreeMap<Role, u64>, DomainError>;
}
