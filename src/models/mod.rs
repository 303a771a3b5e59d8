pub mod book;
pub mod member;
pub mod transaction;

pub use book::Book;
pub use member::Member;
pub use transaction::Transaction;
