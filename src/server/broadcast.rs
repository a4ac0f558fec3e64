//! Chat subscription index and message broadcast engine.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::directory::{ChatDirectory, UserDirectory};
use crate::domain::{ChatId, Message, UserId};
use crate::error::Result;
use crate::protocol::wire;
use crate::server::session_registry::SessionRegistry;

/// Per-chat record of where the server's broadcast sink is installed.
///
/// Registration is idempotent; chats are instrumented lazily, the first time
/// they become relevant to an online user.
pub struct SubscriptionIndex {
    subscribed: RwLock<HashSet<ChatId>>,
}

impl SubscriptionIndex {
    pub fn new() -> Self {
        Self {
            subscribed: RwLock::new(HashSet::new()),
        }
    }

    /// Returns true when this call newly installed the subscription
    pub async fn insert(&self, chat_id: ChatId) -> bool {
        self.subscribed.write().await.insert(chat_id)
    }

    pub async fn contains(&self, chat_id: ChatId) -> bool {
        self.subscribed.read().await.contains(&chat_id)
    }

    pub async fn len(&self) -> usize {
        self.subscribed.read().await.len()
    }
}

impl Default for SubscriptionIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Fans newly appended messages out to online participants.
pub struct Broadcaster {
    users: Arc<UserDirectory>,
    chats: Arc<ChatDirectory>,
    sessions: Arc<SessionRegistry>,
    subscriptions: SubscriptionIndex,
}

impl Broadcaster {
    pub fn new(
        users: Arc<UserDirectory>,
        chats: Arc<ChatDirectory>,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            users,
            chats,
            sessions,
            subscriptions: SubscriptionIndex::new(),
        }
    }

    pub fn subscriptions(&self) -> &SubscriptionIndex {
        &self.subscriptions
    }

    /// Idempotently install the broadcast sink on a chat.
    ///
    /// The chat must exist; the first call instruments it.
    pub async fn ensure_subscribed(&self, chat_id: ChatId) -> Result<()> {
        if self.subscriptions.contains(chat_id).await {
            return Ok(());
        }
        self.chats.get_chat(chat_id).await?;
        if self.subscriptions.insert(chat_id).await {
            debug!("chat {} instrumented for broadcast", chat_id);
        }
        Ok(())
    }

    /// Install the sink on every chat the user already participates in, so
    /// messages sent by others arrive without this session opening each chat
    /// first.
    pub async fn subscribe_user_chats(&self, user_id: UserId) {
        for chat in self.chats.chats_for_user(user_id).await {
            if let Err(e) = self.ensure_subscribed(chat.id).await {
                warn!("failed to subscribe chat {}: {}", chat.id, e);
            }
        }
    }

    /// Fan one appended message out to every online participant, the sender
    /// included.
    ///
    /// The participant list is resolved at call time, not from a cached
    /// snapshot, so membership changes take effect immediately. Delivery is
    /// fire-and-forget; stale handles are skipped silently. Returns how many
    /// sessions the event line was pushed to.
    pub async fn message_appended(&self, message: &Message) -> usize {
        if !self.subscriptions.contains(message.chat_id).await {
            return 0;
        }

        let chat = match self.chats.get_chat(message.chat_id).await {
            Ok(chat) => chat,
            Err(e) => {
                warn!("dropping event for chat {}: {}", message.chat_id, e);
                return 0;
            }
        };
        let sender_name = self
            .users
            .username(message.sender_id)
            .await
            .unwrap_or_else(|| format!("user_{}", message.sender_id));

        let line = wire::event_line(&chat, &sender_name, message);
        let mut delivered = 0;
        for &user_id in chat.participant_ids() {
            if self.sessions.push_line(user_id, line.clone()).await {
                delivered += 1;
            }
        }
        debug!(
            "message {} in chat {} delivered to {} sessions",
            message.id, chat.id, delivered
        );
        delivered
    }
}
