//! Services Layer
//!
//! Business logic that spans more than one table. Called by the Axum handlers
//! and by the overdue scheduler.

pub mod lending_service;
pub mod stats_service;

// Re-export for convenience
pub use lending_service::LendingService;
pub use stats_service::{
    BorrowerSummary, CategoryStats, InventoryDiscrepancy, LibraryStats, borrower_summary,
    category_breakdown, inventory_audit, library_stats,
};
