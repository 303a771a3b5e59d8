use chrono::{DateTime, Duration, TimeZone, Utc};
use library_lending::db;
use library_lending::domain::{
    BookRepository, BookUpdate, DomainError, FixedClock, MemberDirectory, NewBook, NewMember,
    Role, TransactionFilter, TransactionRepository, TransactionStatus,
};
use library_lending::infrastructure::{
    SeaOrmBookRepository, SeaOrmMemberDirectory, SeaOrmTransactionRepository,
};
use library_lending::models::Book;
use library_lending::seed;
use library_lending::services::{self, LendingService};
use sea_orm::DatabaseConnection;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

fn day(n: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, n, 9, 0, 0).unwrap()
}

struct Harness {
    db: DatabaseConnection,
    clock: Arc<FixedClock>,
    lending: LendingService,
    books: SeaOrmBookRepository,
    ledger: SeaOrmTransactionRepository,
    members: SeaOrmMemberDirectory,
}

fn harness(db: DatabaseConnection) -> Harness {
    let clock = Arc::new(FixedClock::new(day(1)));
    Harness {
        lending: LendingService::new(db.clone(), clock.clone()),
        books: SeaOrmBookRepository::new(db.clone(), clock.clone()),
        ledger: SeaOrmTransactionRepository::new(db.clone()),
        members: SeaOrmMemberDirectory::new(db.clone(), clock.clone()),
        clock,
        db,
    }
}

// Helper to build an in-memory store with the clock on day 1
async fn setup() -> Harness {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    harness(db)
}

/// SQLite file removed on drop, with its journal side files
struct DbFile(PathBuf);

impl Drop for DbFile {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm", "-journal"] {
            let mut path = self.0.clone().into_os_string();
            path.push(suffix);
            let _ = std::fs::remove_file(path);
        }
    }
}

// Helper to build a file-backed store whose pool really opens several
// connections, so transactions from different tasks overlap in SQLite
async fn setup_file_backed(name: &str) -> (Harness, DbFile) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = std::env::temp_dir().join(format!(
        "library_lending_{}_{}_{}.db",
        name,
        std::process::id(),
        nanos
    ));
    let file = DbFile(path.clone());
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let db = db::init_db_with_pool(&url, 8)
        .await
        .expect("Failed to init file DB");
    (harness(db), file)
}

async fn add_book(h: &Harness, title: &str, category: &str, copies: i32) -> Book {
    h.books
        .create(NewBook {
            title: title.to_string(),
            author: "Test Author".to_string(),
            isbn: format!("isbn-{}", title),
            category: category.to_string(),
            publisher: None,
            publication_year: None,
            description: None,
            total_copies: copies,
        })
        .await
        .expect("Failed to create book")
}

async fn add_member(h: &Harness, name: &str, role: Role) -> i32 {
    h.members
        .register(NewMember {
            full_name: name.to_string(),
            email: format!("{}@library.test", name.to_lowercase()),
            role,
        })
        .await
        .expect("Failed to register member")
        .id
}

async fn available(h: &Harness, book_id: i32) -> i32 {
    h.books
        .find_by_id(book_id)
        .await
        .unwrap()
        .expect("book exists")
        .available_copies
}

async fn assert_consistent(h: &Harness) {
    let drift = services::inventory_audit(&h.db).await.unwrap();
    assert!(drift.is_empty(), "inventory drift: {:?}", drift);
}

#[tokio::test]
async fn test_issue_until_out_of_stock() {
    let h = setup().await;
    let book = add_book(&h, "Dune", "Science Fiction", 2).await;
    let librarian = add_member(&h, "Lena", Role::Librarian).await;
    let alice = add_member(&h, "Alice", Role::Student).await;
    let bob = add_member(&h, "Bob", Role::Student).await;
    let carol = add_member(&h, "Carol", Role::Student).await;

    let first = h
        .lending
        .issue_book(book.id, alice, librarian, day(10))
        .await
        .unwrap();
    assert_eq!(first.status, TransactionStatus::Issued);
    assert_eq!(available(&h, book.id).await, 1);

    let second = h
        .lending
        .issue_book(book.id, bob, librarian, day(10))
        .await
        .unwrap();
    assert_eq!(second.status, TransactionStatus::Issued);
    assert_eq!(available(&h, book.id).await, 0);

    let third = h.lending.issue_book(book.id, carol, librarian, day(10)).await;
    assert!(matches!(third, Err(DomainError::OutOfStock)));
    assert_eq!(available(&h, book.id).await, 0);

    // The refused issue left no ledger row behind
    let carol_loans = h
        .ledger
        .find(TransactionFilter {
            borrower_id: Some(carol),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(carol_loans.is_empty());

    assert_consistent(&h).await;
}

#[tokio::test]
async fn test_sweep_then_return_overdue_loan() {
    let h = setup().await;
    let book = add_book(&h, "SICP", "Computing", 1).await;
    let librarian = add_member(&h, "Lena", Role::Librarian).await;
    let student = add_member(&h, "Sam", Role::Student).await;

    let loan = h
        .lending
        .issue_book(book.id, student, librarian, day(10))
        .await
        .unwrap();
    assert_eq!(available(&h, book.id).await, 0);

    // Not yet due
    assert_eq!(h.lending.sweep_overdue(day(9)).await.unwrap(), 0);

    h.clock.set(day(11));
    assert_eq!(h.lending.sweep_overdue_now().await.unwrap(), 1);

    let swept = h.ledger.find_by_id(loan.id).await.unwrap().unwrap();
    assert_eq!(swept.status, TransactionStatus::Overdue);
    // Overdue copies are still out
    assert_eq!(available(&h, book.id).await, 0);

    let returned = h.lending.return_book(loan.id).await.unwrap();
    assert_eq!(returned.status, TransactionStatus::Returned);
    assert_eq!(returned.return_date.as_deref(), Some("2026-03-11T09:00:00Z"));
    assert_eq!(available(&h, book.id).await, 1);

    assert_consistent(&h).await;
}

#[tokio::test]
async fn test_shrinking_below_loans_is_rejected() {
    let h = setup().await;
    let book = add_book(&h, "Hyperion", "Science Fiction", 3).await;
    let librarian = add_member(&h, "Lena", Role::Librarian).await;
    let a = add_member(&h, "Ann", Role::Student).await;
    let b = add_member(&h, "Ben", Role::Student).await;

    h.lending.issue_book(book.id, a, librarian, day(10)).await.unwrap();
    h.lending.issue_book(book.id, b, librarian, day(10)).await.unwrap();
    assert_eq!(available(&h, book.id).await, 1);

    let result = h.lending.adjust_total_copies(book.id, 1).await;
    assert!(matches!(result, Err(DomainError::InvalidRange(_))));

    let unchanged = h.books.find_by_id(book.id).await.unwrap().unwrap();
    assert_eq!(unchanged.total_copies, 3);
    assert_eq!(unchanged.available_copies, 1);

    // Shrinking down to exactly the number on loan is fine
    let resized = h.lending.adjust_total_copies(book.id, 2).await.unwrap();
    assert_eq!(resized.total_copies, 2);
    assert_eq!(resized.available_copies, 0);

    let grown = h.lending.adjust_total_copies(book.id, 5).await.unwrap();
    assert_eq!(grown.available_copies, 3);

    assert!(matches!(
        h.lending.adjust_total_copies(book.id, 0).await,
        Err(DomainError::InvalidRange(_))
    ));
    assert!(matches!(
        h.lending.adjust_total_copies(9999, 4).await,
        Err(DomainError::NotFound)
    ));

    assert_consistent(&h).await;
}

#[tokio::test]
async fn test_update_applies_total_delta() {
    let h = setup().await;
    let book = add_book(&h, "Neuromancer", "Science Fiction", 2).await;
    let librarian = add_member(&h, "Lena", Role::Librarian).await;
    let student = add_member(&h, "Sam", Role::Student).await;
    h.lending
        .issue_book(book.id, student, librarian, day(10))
        .await
        .unwrap();

    let updated = h
        .books
        .update(
            book.id,
            BookUpdate {
                title: Some("Neuromancer (Sprawl #1)".to_string()),
                publisher: Some(Some("Ace".to_string())),
                total_copies: Some(4),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Neuromancer (Sprawl #1)");
    assert_eq!(updated.publisher.as_deref(), Some("Ace"));
    assert_eq!(updated.total_copies, 4);
    assert_eq!(updated.available_copies, 3);

    // A rejected resize rolls back the metadata change too
    let result = h
        .books
        .update(
            book.id,
            BookUpdate {
                title: Some("Should not stick".to_string()),
                total_copies: Some(0),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(DomainError::InvalidRange(_))));
    let after = h.books.find_by_id(book.id).await.unwrap().unwrap();
    assert_eq!(after.title, "Neuromancer (Sprawl #1)");
    assert_eq!(after.total_copies, 4);

    assert_consistent(&h).await;
}

#[tokio::test]
async fn test_double_return_is_invalid_state() {
    let h = setup().await;
    let book = add_book(&h, "Emma", "Classics", 1).await;
    let librarian = add_member(&h, "Lena", Role::Librarian).await;
    let student = add_member(&h, "Sam", Role::Student).await;

    let loan = h
        .lending
        .issue_book(book.id, student, librarian, day(5))
        .await
        .unwrap();
    h.lending.return_book(loan.id).await.unwrap();

    let again = h.lending.return_book(loan.id).await;
    assert!(matches!(again, Err(DomainError::InvalidState(_))));
    assert_eq!(available(&h, book.id).await, 1);

    assert!(matches!(
        h.lending.return_book(424242).await,
        Err(DomainError::NotFound)
    ));

    assert_consistent(&h).await;
}

#[tokio::test]
async fn test_sweep_is_idempotent_and_skips_returned() {
    let h = setup().await;
    let book = add_book(&h, "Middlemarch", "Classics", 3).await;
    let librarian = add_member(&h, "Lena", Role::Librarian).await;
    let a = add_member(&h, "Ann", Role::Student).await;
    let b = add_member(&h, "Ben", Role::Student).await;
    let c = add_member(&h, "Cid", Role::Student).await;

    let early = h.lending.issue_book(book.id, a, librarian, day(3)).await.unwrap();
    let returned = h.lending.issue_book(book.id, b, librarian, day(3)).await.unwrap();
    h.lending.issue_book(book.id, c, librarian, day(20)).await.unwrap();
    h.lending.return_book(returned.id).await.unwrap();

    assert_eq!(h.lending.sweep_overdue(day(5)).await.unwrap(), 1);
    assert_eq!(h.lending.sweep_overdue(day(5)).await.unwrap(), 0);

    let overdue = h
        .ledger
        .find(TransactionFilter {
            status: Some(TransactionStatus::Overdue),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].id, early.id);

    let still_returned = h.ledger.find_by_id(returned.id).await.unwrap().unwrap();
    assert_eq!(still_returned.status, TransactionStatus::Returned);

    assert_eq!(available(&h, book.id).await, 1);
    assert_consistent(&h).await;
}

#[tokio::test]
async fn test_issue_validation_order() {
    let h = setup().await;
    let book = add_book(&h, "Ulysses", "Classics", 2).await;
    let librarian = add_member(&h, "Lena", Role::Librarian).await;
    let student = add_member(&h, "Sam", Role::Student).await;

    // Due date not after now wins over every other check
    let result = h.lending.issue_book(9999, 9999, librarian, day(1)).await;
    assert!(matches!(result, Err(DomainError::InvalidRange(_))));

    let result = h.lending.issue_book(9999, student, librarian, day(10)).await;
    assert!(matches!(result, Err(DomainError::NotFound)));

    let result = h.lending.issue_book(book.id, 9999, librarian, day(10)).await;
    assert!(matches!(result, Err(DomainError::NotFound)));

    h.lending
        .issue_book(book.id, student, librarian, day(10))
        .await
        .unwrap();
    let duplicate = h.lending.issue_book(book.id, student, librarian, day(12)).await;
    assert!(matches!(duplicate, Err(DomainError::Conflict(_))));

    // None of the failures touched the counter
    assert_eq!(available(&h, book.id).await, 1);
    assert_consistent(&h).await;
}

#[tokio::test]
async fn test_guarded_delete() {
    let h = setup().await;
    let book = add_book(&h, "Beloved", "Fiction", 1).await;
    let librarian = add_member(&h, "Lena", Role::Librarian).await;
    let student = add_member(&h, "Sam", Role::Student).await;

    let loan = h
        .lending
        .issue_book(book.id, student, librarian, day(10))
        .await
        .unwrap();

    assert!(matches!(
        h.books.delete(book.id).await,
        Err(DomainError::Conflict(_))
    ));
    assert!(h.books.find_by_id(book.id).await.unwrap().is_some());

    h.lending.return_book(loan.id).await.unwrap();
    h.books.delete(book.id).await.unwrap();
    assert!(h.books.find_by_id(book.id).await.unwrap().is_none());

    // The ledger keeps the closed loan
    let history = h.ledger.history(student).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].transaction.status, TransactionStatus::Returned);

    assert!(matches!(
        h.books.delete(book.id).await,
        Err(DomainError::NotFound)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_issues_of_last_copy() {
    let h = setup().await;
    let book = add_book(&h, "Last Copy", "Fiction", 1).await;
    let librarian = add_member(&h, "Lena", Role::Librarian).await;

    let mut borrowers = Vec::new();
    for i in 0..8 {
        borrowers.push(add_member(&h, &format!("Reader{}", i), Role::Student).await);
    }

    let attempts = borrowers.into_iter().map(|borrower| {
        let lending = h.lending.clone();
        tokio::spawn(async move {
            lending
                .issue_book(book.id, borrower, librarian, day(10))
                .await
        })
    });

    let results = futures::future::join_all(attempts).await;

    let mut issued = 0;
    let mut out_of_stock = 0;
    for result in results {
        match result.expect("task panicked") {
            Ok(_) => issued += 1,
            Err(DomainError::OutOfStock) => out_of_stock += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(issued, 1);
    assert_eq!(out_of_stock, 7);
    assert_eq!(available(&h, book.id).await, 0);
    assert_consistent(&h).await;
}

#[tokio::test]
async fn test_history_and_stats() {
    let h = setup().await;
    let dune = add_book(&h, "Dune", "Science Fiction", 2).await;
    let emma = add_book(&h, "Emma", "Classics", 1).await;
    add_book(&h, "Persuasion", "Classics", 1).await;
    add_member(&h, "Ada", Role::Admin).await;
    let librarian = add_member(&h, "Lena", Role::Librarian).await;
    let student = add_member(&h, "Sam", Role::Student).await;

    let first = h
        .lending
        .issue_book(emma.id, student, librarian, day(4))
        .await
        .unwrap();
    h.clock.advance(Duration::days(1));
    let second = h
        .lending
        .issue_book(dune.id, student, librarian, day(20))
        .await
        .unwrap();
    h.lending.sweep_overdue(day(6)).await.unwrap();

    let history = h.ledger.history(student).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].transaction.id, second.id);
    assert_eq!(history[0].book_title, "Dune");
    assert_eq!(history[1].transaction.id, first.id);
    assert_eq!(history[1].transaction.status, TransactionStatus::Overdue);

    let summary = services::borrower_summary(&h.db, student).await.unwrap();
    assert_eq!(summary.active, 1);
    assert_eq!(summary.overdue, 1);
    assert_eq!(summary.total_borrowed, 2);

    let stats = services::library_stats(&h.db, &h.members).await.unwrap();
    assert_eq!(stats.total_books, 3);
    assert_eq!(stats.total_copies, 4);
    assert_eq!(stats.available_copies, 2);
    assert_eq!(stats.active_issues, 1);
    assert_eq!(stats.overdue_books, 1);
    assert_eq!(stats.returned_loans, 0);
    assert_eq!(stats.total_members, 3);
    assert_eq!(stats.students, 1);

    let categories = services::category_breakdown(&h.db).await.unwrap();
    assert_eq!(categories.len(), 2);
    assert_eq!(categories[0].category, "Classics");
    assert_eq!(categories[0].titles, 2);
    assert_eq!(categories[0].available_copies, 1);

    let roles = h.members.count_by_role().await.unwrap();
    assert_eq!(roles.get(&Role::Admin), Some(&1));
    assert_eq!(roles.get(&Role::Librarian), Some(&1));

    assert_eq!(
        h.books.categories().await.unwrap(),
        vec!["Classics".to_string(), "Science Fiction".to_string()]
    );
}

#[tokio::test]
async fn test_seed_is_repeatable() {
    let h = setup().await;

    seed::seed_demo_data(&h.db, h.clock.as_ref()).await.unwrap();
    seed::seed_demo_data(&h.db, h.clock.as_ref()).await.unwrap();

    assert_eq!(h.members.find_all().await.unwrap().len(), 3);
    let books = h.books.find_all().await.unwrap();
    assert_eq!(books.len(), 4);
    assert!(books.iter().all(|b| b.available_copies == b.total_copies));

    // Catalog comes back ordered by title
    assert_eq!(books[0].title, "A Brief History of Time");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_copy_contention_across_connections() {
    let (h, _file) = setup_file_backed("last_copy").await;
    let book = add_book(&h, "Contended", "Fiction", 1).await;
    let librarian = add_member(&h, "Lena", Role::Librarian).await;

    let mut borrowers = Vec::new();
    for i in 0..24 {
        borrowers.push(add_member(&h, &format!("Patron{}", i), Role::Student).await);
    }

    let attempts = borrowers.into_iter().map(|borrower| {
        let lending = h.lending.clone();
        tokio::spawn(async move {
            lending
                .issue_book(book.id, borrower, librarian, day(10))
                .await
        })
    });

    let mut issued = 0;
    let mut out_of_stock = 0;
    for result in futures::future::join_all(attempts).await {
        match result.expect("task panicked") {
            Ok(_) => issued += 1,
            Err(DomainError::OutOfStock) => out_of_stock += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(issued, 1);
    assert_eq!(out_of_stock, 23);
    assert_eq!(available(&h, book.id).await, 0);
    assert_consistent(&h).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sweep_racing_returns_never_reopens_a_loan() {
    let (h, _file) = setup_file_backed("sweep_return").await;
    let book = add_book(&h, "Overdue Pile", "Fiction", 12).await;
    let librarian = add_member(&h, "Lena", Role::Librarian).await;

    let mut loans = Vec::new();
    for i in 0..12 {
        let borrower = add_member(&h, &format!("Late{}", i), Role::Student).await;
        let loan = h
            .lending
            .issue_book(book.id, borrower, librarian, day(3))
            .await
            .unwrap();
        loans.push(loan.id);
    }

    let sweeps = (0..4).map(|_| {
        let lending = h.lending.clone();
        tokio::spawn(async move { lending.sweep_overdue(day(5)).await.map(|_| ()) })
    });
    let returns = loans.iter().map(|&id| {
        let lending = h.lending.clone();
        tokio::spawn(async move { lending.return_book(id).await.map(|_| ()) })
    });
    let tasks: Vec<_> = sweeps.chain(returns).collect();

    for result in futures::future::join_all(tasks).await {
        result.expect("task panicked").expect("sweep or return failed");
    }

    for id in loans {
        let loan = h.ledger.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(loan.status, TransactionStatus::Returned);
        assert!(loan.return_date.is_some());
    }
    assert_eq!(available(&h, book.id).await, 12);
    assert_consistent(&h).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_resize_racing_issues_keeps_counts_consistent() {
    let (h, _file) = setup_file_backed("resize_issue").await;
    let book = add_book(&h, "Shrinking Shelf", "Fiction", 4).await;
    let librarian = add_member(&h, "Lena", Role::Librarian).await;

    let mut borrowers = Vec::new();
    for i in 0..6 {
        borrowers.push(add_member(&h, &format!("Reader{}", i), Role::Student).await);
    }

    let issues: Vec<_> = borrowers
        .into_iter()
        .map(|borrower| {
            let lending = h.lending.clone();
            tokio::spawn(async move {
                lending
                    .issue_book(book.id, borrower, librarian, day(10))
                    .await
            })
        })
        .collect();
    let lending = h.lending.clone();
    let resize = tokio::spawn(async move { lending.adjust_total_copies(book.id, 2).await });

    let mut issued = 0;
    for result in futures::future::join_all(issues).await {
        match result.expect("task panicked") {
            Ok(_) => issued += 1,
            Err(DomainError::OutOfStock) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    let resized = resize.await.expect("task panicked");

    let after = h.books.find_by_id(book.id).await.unwrap().unwrap();
    match resized {
        Ok(_) => {
            assert_eq!(after.total_copies, 2);
            assert!(issued <= 2);
        }
        Err(DomainError::InvalidRange(_)) => {
            // More than two copies were already out when the resize ran
            assert_eq!(after.total_copies, 4);
            assert!(issued > 2);
        }
        Err(e) => panic!("unexpected error: {}", e),
    }
    assert_eq!(after.available_copies, after.total_copies - issued);
    assert_consistent(&h).await;
}

#[tokio::test]
async fn test_due_date_beyond_year_9999_is_invalid_range() {
    let h = setup().await;
    let book = add_book(&h, "Far Future", "Science Fiction", 1).await;
    let librarian = add_member(&h, "Lena", Role::Librarian).await;
    let student = add_member(&h, "Sam", Role::Student).await;

    let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
    let result = h.lending.issue_book(book.id, student, librarian, far).await;
    assert!(matches!(result, Err(DomainError::InvalidRange(_))));
    assert_eq!(available(&h, book.id).await, 1);

    // The last representable day still works and is never swept early
    let last = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap();
    h.lending
        .issue_book(book.id, student, librarian, last)
        .await
        .unwrap();
    assert_eq!(h.lending.sweep_overdue(day(20)).await.unwrap(), 0);
}

#[tokio::test]
async fn test_catalog_rows_use_the_injected_clock() {
    let h = setup().await;
    let book = add_book(&h, "Stamped", "Fiction", 2).await;
    assert_eq!(book.created_at, "2026-03-01T09:00:00Z");

    h.clock.set(day(4));
    let updated = h
        .books
        .update(
            book.id,
            BookUpdate {
                total_copies: Some(3),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.created_at, "2026-03-01T09:00:00Z");
    assert_eq!(updated.updated_at, "2026-03-04T09:00:00Z");
    assert_eq!(updated.available_copies, 3);

    assert!(matches!(
        h.books.update(9999, BookUpdate::default()).await,
        Err(DomainError::NotFound)
    ));
}
