use crate::domain::{Clock, Role};
use crate::domain::clock::format_timestamp;
use crate::models::{book, member};
use sea_orm::*;

const DEMO_MEMBERS: [(&str, &str, Role); 3] = [
    ("Ada Admin", "admin@library.test", Role::Admin),
    ("Lena Librarian", "librarian@library.test", Role::Librarian),
    ("Sam Student", "student@library.test", Role::Student),
];

// (title, author, isbn, category, copies)
const DEMO_BOOKS: [(&str, &str, &str, &str, i32); 4] = [
    ("Dune", "Frank Herbert", "9780441013593", "Science Fiction", 3),
    ("The Pragmatic Programmer", "Andrew Hunt", "9780135957059", "Computing", 2),
    ("Structure and Interpretation of Computer Programs", "Harold Abelson", "9780262510875", "Computing", 1),
    ("A Brief History of Time", "Stephen Hawking", "9780553380163", "Science", 2),
];

pub async fn seed_demo_data(db: &DatabaseConnection, clock: &dyn Clock) -> Result<(), DbErr> {
    let now = format_timestamp(clock.now());

    // 1. Members, one per role
    for (full_name, email, role) in DEMO_MEMBERS {
        let demo_member = member::ActiveModel {
            full_name: Set(full_name.to_owned()),
            email: Set(email.to_owned()),
            role: Set(role.as_str().to_owned()),
            created_at: Set(now.clone()),
            ..Default::default()
        };

        let inserted = member::Entity::insert(demo_member)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(member::Column::Email)
                    .do_nothing()
                    .to_owned(),
            )
            .exec(db)
            .await;

        match inserted {
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    // 2. Books, only into an empty catalog
    if book::Entity::find().count(db).await? > 0 {
        tracing::info!("Catalog already populated, skipping demo books");
        return Ok(());
    }

    for (title, author, isbn, category, copies) in DEMO_BOOKS {
        let demo_book = book::ActiveModel {
            title: Set(title.to_owned()),
            author: Set(author.to_owned()),
            isbn: Set(isbn.to_owned()),
            category: Set(category.to_owned()),
            total_copies: Set(copies),
            available_copies: Set(copies),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        };
        demo_book.insert(db).await?;
    }

    Ok(())
}
