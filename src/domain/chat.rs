//! Chat state: membership and the append-only message log.

use crate::domain::{ChatId, Message, MessageId, UserId};

/// A chat with an insertion-ordered participant set and an append-only
/// message log.
#[derive(Debug, Clone)]
pub struct Chat {
    /// Chat ID
    pub id: ChatId,
    /// Chat title (mutable via rename)
    pub title: String,
    /// Participant user ids, each at most once, in insertion order
    participant_ids: Vec<UserId>,
    /// Messages in append order
    messages: Vec<Message>,
}

impl Chat {
    pub fn new(id: ChatId, title: String) -> Self {
        Self {
            id,
            title,
            participant_ids: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn participant_ids(&self) -> &[UserId] {
        &self.participant_ids
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Add a participant; returns false if already present
    pub fn add_participant(&mut self, user_id: UserId) -> bool {
        if self.participant_ids.contains(&user_id) {
            return false;
        }
        self.participant_ids.push(user_id);
        true
    }

    /// Remove a participant; returns whether they were present
    pub fn remove_participant(&mut self, user_id: UserId) -> bool {
        let before = self.participant_ids.len();
        self.participant_ids.retain(|&id| id != user_id);
        self.participant_ids.len() != before
    }

    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.participant_ids.contains(&user_id)
    }

    /// Append a message to the log
    pub(crate) fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Mutable access to one message, for status transitions
    pub(crate) fn message_mut(&mut self, message_id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == message_id)
    }

    /// Mutable access to the whole log, for bulk status transitions
    pub(crate) fn messages_mut(&mut self) -> &mut [Message] {
        &mut self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessagePayload;

    #[test]
    fn test_participants_deduplicated_in_insertion_order() {
        let mut chat = Chat::new(1, "Team".to_string());
        assert!(chat.add_participant(1));
        assert!(chat.add_participant(3));
        assert!(!chat.add_participant(1));
        assert!(chat.add_participant(2));

        assert_eq!(chat.participant_ids(), &[1, 3, 2]);
        assert!(chat.is_participant(3));
        assert!(!chat.is_participant(4));
    }

    #[test]
    fn test_remove_participant() {
        let mut chat = Chat::new(1, "Team".to_string());
        chat.add_participant(1);
        chat.add_participant(2);

        assert!(chat.remove_participant(1));
        assert!(!chat.remove_participant(1));
        assert_eq!(chat.participant_ids(), &[2]);
    }

    #[test]
    fn test_messages_keep_append_order() {
        let mut chat = Chat::new(1, "Team".to_string());
        for i in 1..=3 {
            chat.push_message(Message::new(
                i,
                1,
                1,
                i * 100,
                MessagePayload::Text {
                    text: format!("m{}", i),
                },
            ));
        }

        let ids: Vec<_> = chat.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(chat.message_mut(2).is_some());
        assert!(chat.message_mut(9).is_none());
    }
}
