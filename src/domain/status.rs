//! Loan lifecycle and member roles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::DomainError;

/// Lifecycle status of a borrowing transaction.
///
/// `issued → {overdue, returned}`, `overdue → returned`. `returned` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Issued,
    Overdue,
    Returned,
}

impl TransactionStatus {
    /// Statuses that keep a copy out of the shelf
    pub const ACTIVE: [TransactionStatus; 2] = [TransactionStatus::Issued, TransactionStatus::Overdue];

    pub const ALL: [TransactionStatus; 3] = [
        TransactionStatus::Issued,
        TransactionStatus::Overdue,
        TransactionStatus::Returned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Issued => "issued",
            TransactionStatus::Overdue => "overdue",
            TransactionStatus::Returned => "returned",
        }
    }

    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (TransactionStatus::Issued, TransactionStatus::Overdue)
                | (TransactionStatus::Issued, TransactionStatus::Returned)
                | (TransactionStatus::Overdue, TransactionStatus::Returned)
        )
    }

    /// Column values of the statuses allowed to move to `next`, for the
    /// `WHERE status IN (...)` guard of a transition
    pub fn sources_of(next: TransactionStatus) -> Vec<&'static str> {
        Self::ALL
            .iter()
            .filter(|s| s.can_transition_to(next))
            .map(|s| s.as_str())
            .collect()
    }

    /// Column values of the active statuses, for `IN (...)` filters
    pub fn active_values() -> Vec<&'static str> {
        Self::ACTIVE.iter().map(|s| s.as_str()).collect()
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "issued" => Ok(TransactionStatus::Issued),
            "overdue" => Ok(TransactionStatus::Overdue),
            "returned" => Ok(TransactionStatus::Returned),
            other => Err(DomainError::Validation(format!(
                "Unknown transaction status '{}'",
                other
            ))),
        }
    }
}

/// Role supplied by the authorization layer. Never checked by the lending engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Librarian,
    Student,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Librarian, Role::Student];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Librarian => "librarian",
            Role::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "librarian" => Ok(Role::Librarian),
            "student" => Ok(Role::Student),
            other => Err(DomainError::Validation(format!("Unknown role '{}'", other))),
        }
    }
}
