//! Multi-user chat server over a line-oriented TCP protocol
//!
//! Clients connect over a persistent stream, authenticate with a numeric
//! user id, join chats, and exchange ordered messages; other online
//! participants receive new messages as asynchronous `EVENT` push lines on
//! their own connections.

pub mod client;
pub mod directory;
pub mod domain;
pub mod error;
pub mod protocol;
pub mod server;

pub use client::{ChatClient, ChatClientConfig};
pub use domain::{ChatId, MessageId, UserId};
pub use error::{ChatError, Result};
pub use server::{ChatServer, ServerConfig};

use std::time::{SystemTime, UNIX_EPOCH};

/// Get current timestamp in milliseconds since UNIX epoch
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
