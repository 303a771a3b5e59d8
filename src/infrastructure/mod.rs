//! Infrastructure layer - Framework implementations
//!
//! This layer contains:
//! - Database connection and migrations (db)
//! - HTTP server setup (server)
//! - Configuration loading (config)
//! - Repository implementations and atomic counter statements (repositories)
//! - Background overdue sweep (scheduler)
//! - Application state (state)

pub mod config;
pub mod db;
pub mod repositories;
pub mod scheduler;
pub mod seed;
pub mod server;
pub mod state;

pub use repositories::*;
pub use state::AppState;
