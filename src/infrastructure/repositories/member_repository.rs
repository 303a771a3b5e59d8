//! SeaORM implementation of MemberDirectory

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::clock::format_timestamp;
use crate::domain::{Clock, DomainError, MemberDirectory, NewMember, Role};
use crate::models::Member;
use crate::models::member::{ActiveModel, Column, Entity as MemberEntity};

/// SeaORM-based implementation of MemberDirectory
pub struct SeaOrmMemberDirectory {
    db: DatabaseConnection,
    clock: Arc<dyn Clock>,
}

impl SeaOrmMemberDirectory {
    pub fn new(db: DatabaseConnection, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }
}

#[async_trait]
impl MemberDirectory for SeaOrmMemberDirectory {
    async fn find_all(&self) -> Result<Vec<Member>, DomainError> {
        let members = MemberEntity::find()
            .order_by_asc(Column::FullName)
            .all(&self.db)
            .await?;

        members.into_iter().map(Member::try_from).collect()
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Member>, DomainError> {
        MemberEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Member::try_from)
            .transpose()
    }

    async fn register(&self, member: NewMember) -> Result<Member, DomainError> {
        if member.full_name.trim().is_empty() {
            return Err(DomainError::Validation("full_name is required".to_string()));
        }
        if !member.email.contains('@') {
            return Err(DomainError::Validation(format!(
                "'{}' is not an email address",
                member.email
            )));
        }

        let taken = MemberEntity::find()
            .filter(Column::Email.eq(&member.email))
            .count(&self.db)
            .await?;
        if taken > 0 {
            return Err(DomainError::Conflict(format!(
                "email {} is already registered",
                member.email
            )));
        }

        let new_member = ActiveModel {
            full_name: Set(member.full_name),
            email: Set(member.email),
            role: Set(member.role.as_str().to_owned()),
            created_at: Set(format_timestamp(self.clock.now())),
            ..Default::default()
        };

        let result = new_member.insert(&self.db).await?;
        Member::try_from(result)
    }

    async fn count_by_role(&self) -> Result<BTreeMap<Role, u64>, DomainError> {
        let mut counts = BTreeMap::new();
        for role in Role::ALL {
            let count = MemberEntity::find()
                .filter(Column::Role.eq(role.as_str()))
                .count(&self.db)
                .await?;
            counts.insert(role, count);
        }
        Ok(counts)
    }
}
