//! Application state containing repositories and shared resources

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::domain::{BookRepository, Clock, MemberDirectory, SystemClock, TransactionRepository};
use crate::infrastructure::config::MAX_LOAN_DAYS;
use crate::infrastructure::{
    SeaOrmBookRepository, SeaOrmMemberDirectory, SeaOrmTransactionRepository,
};
use crate::services::LendingService;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    /// Book inventory
    pub book_repo: Arc<dyn BookRepository>,
    /// Transaction ledger (reads)
    pub transaction_repo: Arc<dyn TransactionRepository>,
    /// Borrower identities and roles
    pub members: Arc<dyn MemberDirectory>,
    /// Issue/return/sweep coordination
    pub lending: LendingService,
    /// Loan length used when an issue request has no due date
    pub default_loan_days: i64,
}

impl AppState {
    /// Create a new AppState on the wall clock
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    /// Create a new AppState with an explicit time source
    pub fn with_clock(db: DatabaseConnection, clock: Arc<dyn Clock>) -> Self {
        let book_repo = Arc::new(SeaOrmBookRepository::new(db.clone(), clock.clone()));
        let transaction_repo = Arc::new(SeaOrmTransactionRepository::new(db.clone()));
        let members = Arc::new(SeaOrmMemberDirectory::new(db.clone(), clock.clone()));
        let lending = LendingService::new(db.clone(), clock);

        Self {
            db,
            book_repo,
            transaction_repo,
            members,
            lending,
            default_loan_days: 14,
        }
    }

    /// Loan length for issues without a due date, clamped to 1..=MAX_LOAN_DAYS
    pub fn with_default_loan_days(mut self, days: i64) -> Self {
        self.default_loan_days = days.clamp(1, MAX_LOAN_DAYS);
        self
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

// Implement FromRef to allow extracting DatabaseConnection from AppState
impl axum::extract::FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
