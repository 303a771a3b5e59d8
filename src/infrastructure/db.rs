use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

/// Pool size used by `init_db`
pub const DEFAULT_MAX_CONNECTIONS: u32 = 4;

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    init_db_with_pool(database_url, DEFAULT_MAX_CONNECTIONS).await
}

/// Connect with up to `max_connections` pooled connections and migrate.
///
/// Writers on different connections are serialised by SQLite's write lock;
/// every lending transaction writes before it reads, so it waits on that
/// lock instead of failing on a stale snapshot.
pub async fn init_db_with_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options.sqlx_logging(false);
    if database_url.contains(":memory:") {
        // Each SQLite connection to :memory: is its own database
        options.max_connections(1).min_connections(1);
    } else {
        options.max_connections(max_connections.max(1));
    }
    let db = Database::connect(options).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Create books table. The CHECKs are the last line of defence for the
    // copy-count invariant; the engine never relies on them firing.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            isbn TEXT NOT NULL,
            category TEXT NOT NULL,
            publisher TEXT,
            publication_year INTEGER,
            description TEXT,
            total_copies INTEGER NOT NULL DEFAULT 1 CHECK (total_copies >= 1),
            available_copies INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK (available_copies >= 0 AND available_copies <= total_copies)
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Create members table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS members (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            full_name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL DEFAULT 'student'
                CHECK (role IN ('admin', 'librarian', 'student')),
            created_at TEXT NOT NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Create transactions table (never deleted, audit trail). book_id carries
    // no foreign key: returned loans outlive a deleted catalog entry.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            book_id INTEGER NOT NULL,
            borrower_id INTEGER NOT NULL,
            issued_by INTEGER NOT NULL,
            issue_date TEXT NOT NULL,
            due_date TEXT NOT NULL,
            return_date TEXT,
            status TEXT NOT NULL DEFAULT 'issued'
                CHECK (status IN ('issued', 'overdue', 'returned')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK (due_date > issue_date),
            CHECK ((status = 'returned') = (return_date IS NOT NULL)),
            FOREIGN KEY (borrower_id) REFERENCES members(id) ON DELETE RESTRICT
        )
        "#
        .to_owned(),
    ))
    .await?;

    // One active loan per (book, borrower)
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_transactions_active_loan
        ON transactions (book_id, borrower_id)
        WHERE status IN ('issued', 'overdue')
        "#
        .to_owned(),
    ))
    .await?;

    db.execute(Statement::from_string(
        db.get_database_backend(),
        "CREATE INDEX IF NOT EXISTS idx_transactions_status_due ON transactions (status, due_date)"
            .to_owned(),
    ))
    .await?;

    db.execute(Statement::from_string(
        db.get_database_backend(),
        "CREATE INDEX IF NOT EXISTS idx_transactions_borrower ON transactions (borrower_id, issue_date)"
            .to_owned(),
    ))
    .await?;

    db.execute(Statement::from_string(
        db.get_database_backend(),
        "CREATE INDEX IF NOT EXISTS idx_books_category ON books (category)".to_owned(),
    ))
    .await?;

    tracing::debug!("Database migrations applied");

    Ok(())
}
