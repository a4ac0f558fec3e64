//! Server-side components: session tracking, broadcast and connection
//! handling.

pub mod broadcast;
pub mod chat_server;
pub mod connection_handler;
pub mod session_registry;

pub use broadcast::{Broadcaster, SubscriptionIndex};
pub use chat_server::{ChatServer, ServerConfig, ServerStats};
pub use connection_handler::ConnectionHandler;
pub use session_registry::{SessionHandle, SessionRegistry};
