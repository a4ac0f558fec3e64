//! Chat directory and message log operations.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::current_timestamp;
use crate::directory::UserDirectory;
use crate::domain::{Chat, ChatId, DeliveryStatus, Message, MessageId, MessagePayload, UserId};
use crate::error::{ChatError, Result};

/// Link-bearing payloads must point at one of these hosts, over https.
const ALLOWED_LINK_HOSTS: [&str; 2] = ["drive.google.com", "docs.google.com"];

/// Directory of chats and their message logs.
///
/// Holds the user directory for sender/participant validation. All reads
/// return owned snapshots (copy-on-read): history and chat listings never
/// expose live views that later appends could mutate.
pub struct ChatDirectory {
    users: Arc<UserDirectory>,
    chats: RwLock<BTreeMap<ChatId, Chat>>,
    next_chat_id: AtomicU64,
    next_message_id: AtomicU64,
}

impl ChatDirectory {
    pub fn new(users: Arc<UserDirectory>) -> Self {
        Self {
            users,
            chats: RwLock::new(BTreeMap::new()),
            next_chat_id: AtomicU64::new(1),
            next_message_id: AtomicU64::new(1),
        }
    }

    /// Create a chat with the creator first in the participant list.
    ///
    /// Duplicate ids collapse to their first occurrence; every id must
    /// reference an existing user or the whole operation fails and no chat
    /// is created.
    pub async fn create_chat(
        &self,
        title: &str,
        creator_id: UserId,
        participant_ids: &[UserId],
    ) -> Result<Chat> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ChatError::validation("Title must not be empty"));
        }

        let mut ordered = vec![creator_id];
        for &uid in participant_ids {
            if !ordered.contains(&uid) {
                ordered.push(uid);
            }
        }
        for &uid in &ordered {
            if !self.users.contains(uid).await {
                return Err(ChatError::user_not_found(format!("userId={}", uid)));
            }
        }

        let id = self.next_chat_id.fetch_add(1, Ordering::Relaxed);
        let mut chat = Chat::new(id, title.to_string());
        for &uid in &ordered {
            chat.add_participant(uid);
        }
        self.chats.write().await.insert(id, chat.clone());
        Ok(chat)
    }

    /// Snapshot of one chat
    pub async fn get_chat(&self, chat_id: ChatId) -> Result<Chat> {
        self.chats
            .read()
            .await
            .get(&chat_id)
            .cloned()
            .ok_or_else(|| ChatError::chat_not_found(format!("chatId={}", chat_id)))
    }

    /// All chats in creation order
    pub async fn list_chats(&self) -> Vec<Chat> {
        self.chats.read().await.values().cloned().collect()
    }

    /// Chats containing `user_id`, in creation order
    pub async fn chats_for_user(&self, user_id: UserId) -> Vec<Chat> {
        self.chats
            .read()
            .await
            .values()
            .filter(|c| c.is_participant(user_id))
            .cloned()
            .collect()
    }

    pub async fn rename_chat(&self, chat_id: ChatId, new_title: &str) -> Result<()> {
        let title = new_title.trim();
        if title.is_empty() {
            return Err(ChatError::validation("Title must not be empty"));
        }

        let mut chats = self.chats.write().await;
        let chat = chats
            .get_mut(&chat_id)
            .ok_or_else(|| ChatError::chat_not_found(format!("chatId={}", chat_id)))?;
        chat.title = title.to_string();
        Ok(())
    }

    pub async fn delete_chat(&self, chat_id: ChatId) -> Result<()> {
        self.chats
            .write()
            .await
            .remove(&chat_id)
            .map(|_| ())
            .ok_or_else(|| ChatError::chat_not_found(format!("chatId={}", chat_id)))
    }

    /// Delete a user and strip them from every chat's participant list, so
    /// the user also disappears from chat listings.
    pub async fn delete_user(&self, user_id: UserId) -> Result<()> {
        self.users.remove(user_id).await?;
        let mut chats = self.chats.write().await;
        for chat in chats.values_mut() {
            chat.remove_participant(user_id);
        }
        Ok(())
    }

    pub async fn is_participant(&self, chat_id: ChatId, user_id: UserId) -> Result<bool> {
        Ok(self.get_chat(chat_id).await?.is_participant(user_id))
    }

    pub async fn chat_count(&self) -> usize {
        self.chats.read().await.len()
    }

    /// Append a plain text message
    pub async fn send_text(
        &self,
        chat_id: ChatId,
        sender_id: UserId,
        text: &str,
    ) -> Result<Message> {
        self.append(
            chat_id,
            sender_id,
            MessagePayload::Text {
                text: text.to_string(),
            },
        )
        .await
    }

    /// Append a voice link message
    pub async fn send_voice_link(
        &self,
        chat_id: ChatId,
        sender_id: UserId,
        title: &str,
        url: &str,
    ) -> Result<Message> {
        validate_link("Title", title, url)?;
        self.append(
            chat_id,
            sender_id,
            MessagePayload::VoiceLink {
                title: title.trim().to_string(),
                url: url.trim().to_string(),
            },
        )
        .await
    }

    /// Append a media link message
    pub async fn send_media_link(
        &self,
        chat_id: ChatId,
        sender_id: UserId,
        title: &str,
        url: &str,
    ) -> Result<Message> {
        validate_link("Title", title, url)?;
        self.append(
            chat_id,
            sender_id,
            MessagePayload::MediaLink {
                title: title.trim().to_string(),
                url: url.trim().to_string(),
            },
        )
        .await
    }

    /// Append a file link message
    pub async fn send_file_link(
        &self,
        chat_id: ChatId,
        sender_id: UserId,
        file_name: &str,
        url: &str,
    ) -> Result<Message> {
        validate_link("File name", file_name, url)?;
        self.append(
            chat_id,
            sender_id,
            MessagePayload::FileLink {
                file_name: file_name.trim().to_string(),
                url: url.trim().to_string(),
            },
        )
        .await
    }

    /// Append an image reference message
    pub async fn send_image(
        &self,
        chat_id: ChatId,
        sender_id: UserId,
        path_or_name: &str,
    ) -> Result<Message> {
        let path_or_name = path_or_name.trim();
        if path_or_name.is_empty() {
            return Err(ChatError::validation("Image name must not be empty"));
        }
        self.append(
            chat_id,
            sender_id,
            MessagePayload::Image {
                path_or_name: path_or_name.to_string(),
            },
        )
        .await
    }

    /// Shared append path: sender must exist and be a participant, then the
    /// message is constructed with status `Sent` and logged.
    async fn append(
        &self,
        chat_id: ChatId,
        sender_id: UserId,
        payload: MessagePayload,
    ) -> Result<Message> {
        self.users.get_user(sender_id).await?;

        let mut chats = self.chats.write().await;
        let chat = chats
            .get_mut(&chat_id)
            .ok_or_else(|| ChatError::chat_not_found(format!("chatId={}", chat_id)))?;
        if !chat.is_participant(sender_id) {
            return Err(ChatError::permission_denied(format!(
                "You are not a participant of chatId={}",
                chat_id
            )));
        }

        let message = Message::new(
            self.next_message_id.fetch_add(1, Ordering::Relaxed),
            chat_id,
            sender_id,
            current_timestamp(),
            payload,
        );
        chat.push_message(message.clone());
        Ok(message)
    }

    /// Copy-on-read message history in append order
    pub async fn history(&self, chat_id: ChatId) -> Result<Vec<Message>> {
        Ok(self.get_chat(chat_id).await?.messages().to_vec())
    }

    /// Advance one message to `Delivered`
    pub async fn mark_delivered(&self, chat_id: ChatId, message_id: MessageId) -> Result<()> {
        self.advance(chat_id, message_id, DeliveryStatus::Delivered)
            .await
    }

    /// Advance one message to `Read`
    pub async fn mark_read(&self, chat_id: ChatId, message_id: MessageId) -> Result<()> {
        self.advance(chat_id, message_id, DeliveryStatus::Read).await
    }

    async fn advance(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        status: DeliveryStatus,
    ) -> Result<()> {
        let mut chats = self.chats.write().await;
        let chat = chats
            .get_mut(&chat_id)
            .ok_or_else(|| ChatError::chat_not_found(format!("chatId={}", chat_id)))?;
        let message = chat.message_mut(message_id).ok_or_else(|| {
            ChatError::message_not_found(format!(
                "messageId={} in chatId={}",
                message_id, chat_id
            ))
        })?;
        message.advance_status(status)
    }

    /// Advance every `Sent` message in a chat to `Delivered`; `Read`
    /// messages are left untouched. Returns how many messages advanced.
    pub async fn mark_all_delivered(&self, chat_id: ChatId) -> Result<usize> {
        let mut chats = self.chats.write().await;
        let chat = chats
            .get_mut(&chat_id)
            .ok_or_else(|| ChatError::chat_not_found(format!("chatId={}", chat_id)))?;

        let mut advanced = 0;
        for message in chat.messages_mut() {
            if message.status() == DeliveryStatus::Sent {
                message.advance_status(DeliveryStatus::Delivered)?;
                advanced += 1;
            }
        }
        Ok(advanced)
    }
}

fn validate_link(name_label: &str, name: &str, url: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ChatError::validation(format!(
            "{} must not be empty",
            name_label
        )));
    }
    if !is_allowed_link(url) {
        return Err(ChatError::validation(
            "Link must be an https Google Drive link (drive.google.com or docs.google.com)",
        ));
    }
    Ok(())
}

fn is_allowed_link(url: &str) -> bool {
    let url = url.trim();
    if !url.starts_with("https://") {
        return false;
    }
    ALLOWED_LINK_HOSTS
        .iter()
        .any(|host| url.contains(&format!("://{}/", host)))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> (Arc<UserDirectory>, ChatDirectory) {
        let users = Arc::new(UserDirectory::new());
        users.create_user("alice").await.unwrap(); // id 1
        users.create_user("bob").await.unwrap(); // id 2
        users.create_user("carol").await.unwrap(); // id 3
        let chats = ChatDirectory::new(Arc::clone(&users));
        (users, chats)
    }

    #[test]
    fn test_allowed_link_hosts() {
        assert!(is_allowed_link("https://drive.google.com/file/d/abc"));
        assert!(is_allowed_link("https://docs.google.com/document/d/xyz"));
        assert!(is_allowed_link("  https://drive.google.com/x  "));
        assert!(!is_allowed_link("http://drive.google.com/file/d/abc"));
        assert!(!is_allowed_link("https://example.com/x"));
        assert!(!is_allowed_link("https://drive.google.com"));
    }

    #[tokio::test]
    async fn test_create_chat_includes_creator_first() {
        let (_, chats) = setup().await;

        let chat = chats.create_chat("Team", 1, &[2, 3, 2]).await.unwrap();
        assert_eq!(chat.participant_ids(), &[1, 2, 3]);

        let solo = chats.create_chat("Solo", 1, &[]).await.unwrap();
        assert_eq!(solo.participant_ids(), &[1]);
    }

    #[tokio::test]
    async fn test_create_chat_creator_listed_once() {
        let (_, chats) = setup().await;
        let chat = chats.create_chat("Team", 1, &[1, 2]).await.unwrap();
        assert_eq!(chat.participant_ids(), &[1, 2]);
    }

    #[tokio::test]
    async fn test_create_chat_is_atomic_on_unknown_participant() {
        let (_, chats) = setup().await;

        let err = chats.create_chat("Team", 1, &[2, 99]).await.unwrap_err();
        assert!(matches!(err, ChatError::UserNotFound(_)));
        assert_eq!(chats.chat_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_chat_rejects_empty_title() {
        let (_, chats) = setup().await;
        let err = chats.create_chat("  ", 1, &[]).await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
    }

    #[tokio::test]
    async fn test_send_text_appends_in_order() {
        let (_, chats) = setup().await;
        let chat = chats.create_chat("Team", 1, &[2]).await.unwrap();

        chats.send_text(chat.id, 1, "one").await.unwrap();
        chats.send_text(chat.id, 2, "two").await.unwrap();
        chats.send_text(chat.id, 1, "three").await.unwrap();

        let history = chats.history(chat.id).await.unwrap();
        assert_eq!(history.len(), 3);
        assert!(history.windows(2).all(|w| w[0].id < w[1].id));
        assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert!(history
            .iter()
            .all(|m| m.status() == DeliveryStatus::Sent));
    }

    #[tokio::test]
    async fn test_send_requires_participant() {
        let (_, chats) = setup().await;
        let chat = chats.create_chat("Team", 1, &[2]).await.unwrap();

        let err = chats.send_text(chat.id, 3, "hi").await.unwrap_err();
        assert!(matches!(err, ChatError::PermissionDenied(_)));
        assert!(chats.history(chat.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_requires_known_sender_and_chat() {
        let (_, chats) = setup().await;
        let chat = chats.create_chat("Team", 1, &[]).await.unwrap();

        let err = chats.send_text(chat.id, 99, "hi").await.unwrap_err();
        assert!(matches!(err, ChatError::UserNotFound(_)));

        let err = chats.send_text(404, 1, "hi").await.unwrap_err();
        assert!(matches!(err, ChatError::ChatNotFound(_)));
    }

    #[tokio::test]
    async fn test_link_sends_validate_url_and_append_nothing() {
        let (_, chats) = setup().await;
        let chat = chats.create_chat("Team", 1, &[2]).await.unwrap();

        let err = chats
            .send_voice_link(chat.id, 1, "memo", "http://example.com/x")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));

        let err = chats
            .send_media_link(chat.id, 1, "clip", "https://example.com/x")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));

        let err = chats
            .send_file_link(chat.id, 1, "  ", "https://drive.google.com/f")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));

        assert!(chats.history(chat.id).await.unwrap().is_empty());

        let msg = chats
            .send_file_link(chat.id, 1, "notes.pdf", "https://drive.google.com/file/d/abc")
            .await
            .unwrap();
        assert_eq!(msg.payload.kind(), "FILE");
        assert_eq!(chats.history(chat.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_send_image_appends_an_image_reference() {
        let (_, chats) = setup().await;
        let chat = chats.create_chat("Team", 1, &[]).await.unwrap();

        let err = chats.send_image(chat.id, 1, "  ").await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));

        let msg = chats.send_image(chat.id, 1, "cat.png").await.unwrap();
        assert_eq!(msg.payload.kind(), "IMAGE");
        assert_eq!(msg.payload.preview(), "[IMAGE] cat.png");
        assert_eq!(chats.history(chat.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_history_is_a_defensive_copy() {
        let (_, chats) = setup().await;
        let chat = chats.create_chat("Team", 1, &[]).await.unwrap();
        chats.send_text(chat.id, 1, "hi").await.unwrap();

        let mut snapshot = chats.history(chat.id).await.unwrap();
        snapshot.clear();

        assert_eq!(chats.history(chat.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_status_transitions_are_forward_only() {
        let (_, chats) = setup().await;
        let chat = chats.create_chat("Team", 1, &[]).await.unwrap();
        let msg = chats.send_text(chat.id, 1, "hi").await.unwrap();

        chats.mark_delivered(chat.id, msg.id).await.unwrap();
        chats.mark_read(chat.id, msg.id).await.unwrap();

        let err = chats.mark_delivered(chat.id, msg.id).await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));

        let history = chats.history(chat.id).await.unwrap();
        assert_eq!(history[0].status(), DeliveryStatus::Read);
    }

    #[tokio::test]
    async fn test_mark_unknown_message() {
        let (_, chats) = setup().await;
        let chat = chats.create_chat("Team", 1, &[]).await.unwrap();

        let err = chats.mark_read(chat.id, 42).await.unwrap_err();
        assert!(matches!(err, ChatError::MessageNotFound(_)));
    }

    #[tokio::test]
    async fn test_mark_all_delivered_skips_read() {
        let (_, chats) = setup().await;
        let chat = chats.create_chat("Team", 1, &[]).await.unwrap();
        let first = chats.send_text(chat.id, 1, "one").await.unwrap();
        chats.send_text(chat.id, 1, "two").await.unwrap();
        chats.mark_read(chat.id, first.id).await.unwrap();

        let advanced = chats.mark_all_delivered(chat.id).await.unwrap();
        assert_eq!(advanced, 1);

        let statuses: Vec<_> = chats
            .history(chat.id)
            .await
            .unwrap()
            .iter()
            .map(|m| m.status())
            .collect();
        assert_eq!(
            statuses,
            vec![DeliveryStatus::Read, DeliveryStatus::Delivered]
        );
    }

    #[tokio::test]
    async fn test_chats_for_user_filters_membership() {
        let (_, chats) = setup().await;
        chats.create_chat("AB", 1, &[2]).await.unwrap();
        chats.create_chat("BC", 2, &[3]).await.unwrap();

        let mine = chats.chats_for_user(3).await;
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].title, "BC");

        let titles: Vec<_> = chats.list_chats().await.into_iter().map(|c| c.title).collect();
        assert_eq!(titles, vec!["AB", "BC"]);
    }

    #[tokio::test]
    async fn test_delete_user_strips_chat_membership() {
        let (users, chats) = setup().await;
        let chat = chats.create_chat("Team", 1, &[2, 3]).await.unwrap();

        chats.delete_user(2).await.unwrap();

        assert!(!users.contains(2).await);
        let chat = chats.get_chat(chat.id).await.unwrap();
        assert_eq!(chat.participant_ids(), &[1, 3]);
    }

    #[tokio::test]
    async fn test_rename_and_delete_chat() {
        let (_, chats) = setup().await;
        let chat = chats.create_chat("Team", 1, &[]).await.unwrap();

        chats.rename_chat(chat.id, "Crew").await.unwrap();
        assert_eq!(chats.get_chat(chat.id).await.unwrap().title, "Crew");

        chats.delete_chat(chat.id).await.unwrap();
        let err = chats.get_chat(chat.id).await.unwrap_err();
        assert!(matches!(err, ChatError::ChatNotFound(_)));
    }
}
