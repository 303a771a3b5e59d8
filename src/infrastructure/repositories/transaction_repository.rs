//! SeaORM implementation of TransactionRepository

use async_trait::async_trait;
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use crate::domain::{DomainError, LoanRecord, TransactionFilter, TransactionRepository};
use crate::models::Transaction;
use crate::models::book::Entity as BookEntity;
use crate::models::transaction::{Column, Entity as TransactionEntity};

/// SeaORM-based implementation of TransactionRepository
pub struct SeaOrmTransactionRepository {
    db: DatabaseConnection,
}

impl SeaOrmTransactionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TransactionRepository for SeaOrmTransactionRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<Transaction>, DomainError> {
        TransactionEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Transaction::try_from)
            .transpose()
    }

    async fn find(&self, filter: TransactionFilter) -> Result<Vec<Transaction>, DomainError> {
        let mut condition = Condition::all();

        if let Some(borrower_id) = filter.borrower_id {
            condition = condition.add(Column::BorrowerId.eq(borrower_id));
        }

        if let Some(book_id) = filter.book_id {
            condition = condition.add(Column::BookId.eq(book_id));
        }

        if let Some(status) = filter.status {
            condition = condition.add(Column::Status.eq(status.as_str()));
        }

        let transactions = TransactionEntity::find()
            .filter(condition)
            .order_by_desc(Column::IssueDate)
            .order_by_desc(Column::Id)
            .all(&self.db)
            .await?;

        transactions.into_iter().map(Transaction::try_from).collect()
    }

    async fn history(&self, borrower_id: i32) -> Result<Vec<LoanRecord>, DomainError> {
        let loans_with_books = TransactionEntity::find()
            .filter(Column::BorrowerId.eq(borrower_id))
            .order_by_desc(Column::IssueDate)
            .order_by_desc(Column::Id)
            .find_also_related(BookEntity)
            .all(&self.db)
            .await?;

        loans_with_books
            .into_iter()
            .map(|(loan, book)| {
                let (book_title, book_author, book_isbn) = book
                    .map(|b| (b.title, b.author, b.isbn))
                    .unwrap_or_else(|| {
                        ("Unknown".to_string(), "Unknown".to_string(), String::new())
                    });

                Ok(LoanRecord {
                    transaction: Transaction::try_from(loan)?,
                    book_title,
                    book_author,
                    book_isbn,
                })
            })
            .collect()
    }
}
