//! SeaORM implementation of BookRepository

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;

use super::inventory;
use crate::domain::clock::format_timestamp;
use crate::domain::{
    BookRepository, BookUpdate, Clock, DomainError, NewBook, validate_total_copies,
};
use crate::models::Book;
use crate::models::book::{ActiveModel, Column, Entity as BookEntity};

/// SeaORM-based implementation of BookRepository
pub struct SeaOrmBookRepository {
    db: DatabaseConnection,
    clock: Arc<dyn Clock>,
}

impl SeaOrmBookRepository {
    pub fn new(db: DatabaseConnection, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }
}

#[async_trait]
impl BookRepository for SeaOrmBookRepository {
    async fn find_all(&self) -> Result<Vec<Book>, DomainError> {
        let books = BookEntity::find()
            .order_by_asc(Column::Title)
            .all(&self.db)
            .await?;

        Ok(books.into_iter().map(Book::from).collect())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Book>, DomainError> {
        let book = BookEntity::find_by_id(id).one(&self.db).await?;
        Ok(book.map(Book::from))
    }

    async fn find_by_category(&self, category: &str) -> Result<Vec<Book>, DomainError> {
        let books = BookEntity::find()
            .filter(Column::Category.eq(category))
            .order_by_asc(Column::Title)
            .all(&self.db)
            .await?;

        Ok(books.into_iter().map(Book::from).collect())
    }

    async fn categories(&self) -> Result<Vec<String>, DomainError> {
        let categories: Vec<String> = BookEntity::find()
            .select_only()
            .column(Column::Category)
            .distinct()
            .order_by_asc(Column::Category)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(categories)
    }

    async fn create(&self, book: NewBook) -> Result<Book, DomainError> {
        book.validate()?;
        let now = format_timestamp(self.clock.now());

        let new_book = ActiveModel {
            title: Set(book.title),
            author: Set(book.author),
            isbn: Set(book.isbn),
            category: Set(book.category),
            publisher: Set(book.publisher),
            publication_year: Set(book.publication_year),
            description: Set(book.description),
            total_copies: Set(book.total_copies),
            available_copies: Set(book.total_copies),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = new_book.insert(&self.db).await?;
        tracing::info!(
            "Catalogued book {} '{}' with {} copies",
            result.id,
            result.title,
            result.total_copies
        );
        Ok(Book::from(result))
    }

    async fn update(&self, id: i32, update: BookUpdate) -> Result<Book, DomainError> {
        if let Some(total) = update.total_copies {
            validate_total_copies(total)?;
        }

        let now = format_timestamp(self.clock.now());
        let txn = self.db.begin().await?;

        // One UPDATE for the metadata, so the transaction takes the write
        // lock with its first statement
        let mut metadata = BookEntity::update_many()
            .col_expr(Column::UpdatedAt, Expr::value(now.clone()))
            .filter(Column::Id.eq(id));
        if let Some(title) = update.title {
            metadata = metadata.col_expr(Column::Title, Expr::value(title));
        }
        if let Some(author) = update.author {
            metadata = metadata.col_expr(Column::Author, Expr::value(author));
        }
        if let Some(isbn) = update.isbn {
            metadata = metadata.col_expr(Column::Isbn, Expr::value(isbn));
        }
        if let Some(category) = update.category {
            metadata = metadata.col_expr(Column::Category, Expr::value(category));
        }
        if let Some(publisher) = update.publisher {
            metadata = metadata.col_expr(Column::Publisher, Expr::value(publisher));
        }
        if let Some(year) = update.publication_year {
            metadata = metadata.col_expr(Column::PublicationYear, Expr::value(year));
        }
        if let Some(description) = update.description {
            metadata = metadata.col_expr(Column::Description, Expr::value(description));
        }
        if metadata.exec(&txn).await?.rows_affected == 0 {
            return Err(DomainError::NotFound);
        }

        if let Some(total) = update.total_copies {
            inventory::resize(&txn, id, total, &now).await?;
        }

        let updated = BookEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(DomainError::NotFound)?;
        txn.commit().await?;

        Ok(Book::from(updated))
    }

    async fn delete(&self, id: i32) -> Result<(), DomainError> {
        inventory::delete_if_idle(&self.db, id).await?;
        tracing::info!("Deleted book {}", id);
        Ok(())
    }
}
