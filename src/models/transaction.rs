use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, TransactionStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub book_id: i32,
    pub borrower_id: i32,
    pub issued_by: i32,
    pub issue_date: String,
    pub due_date: String,
    pub return_date: Option<String>,
    pub status: String, // 'issued', 'overdue', 'returned'
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::book::Entity",
        from = "Column::BookId",
        to = "super::book::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Book,
    #[sea_orm(
        belongs_to = "super::member::Entity",
        from = "Column::BorrowerId",
        to = "super::member::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Borrower,
}

impl Related<super::book::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Book.def()
    }
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Borrower.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// DTO for API responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Transaction {
    pub id: i32,
    pub book_id: i32,
    pub borrower_id: i32,
    pub issued_by: i32,
    pub issue_date: String,
    pub due_date: String,
    pub return_date: Option<String>,
    pub status: TransactionStatus,
}

impl TryFrom<Model> for Transaction {
    type Error = DomainError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            book_id: model.book_id,
            borrower_id: model.borrower_id,
            issued_by: model.issued_by,
            issue_date: model.issue_date,
            due_date: model.due_date,
            return_date: model.return_date,
            status: model.status.parse()?,
        })
    }
}
