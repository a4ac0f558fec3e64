//! In-memory directories for users and chats.
//!
//! Both directories are process-wide shared state mutated by concurrent
//! connection handlers; ids are allocated from per-directory atomic counters.

pub mod chats;
pub mod users;

pub use chats::ChatDirectory;
pub use users::UserDirectory;
