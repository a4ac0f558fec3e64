//! Domain model: users, chats and messages.

pub mod chat;
pub mod message;
pub mod user;

pub use chat::Chat;
pub use message::{DeliveryStatus, Message, MessagePayload};
pub use user::{Contact, User};

/// Unique identifier types
pub type UserId = u64;
pub type ChatId = u64;
pub type MessageId = u64;
pub type ContactId = u64;
