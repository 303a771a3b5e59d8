//! Domain layer - Pure business abstractions
//!
//! Trait definitions, loan lifecycle rules, the time source and domain error
//! types. No HTTP or persistence code lives here.

pub mod clock;
pub mod errors;
pub mod repositories;
pub mod status;

pub use clock::{Clock, FixedClock, SystemClock};
pub use errors::DomainError;
pub use repositories::*;
pub use status::{Role, TransactionStatus};
