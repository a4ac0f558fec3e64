//! Message payloads and delivery status.

use std::fmt;

use crate::domain::{ChatId, MessageId, UserId};
use crate::error::{ChatError, Result};

/// Delivery status of a message.
///
/// Transitions are strictly forward-only: `Sent -> Delivered -> Read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Read,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "SENT",
            DeliveryStatus::Delivered => "DELIVERED",
            DeliveryStatus::Read => "READ",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific message content, fixed at creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePayload {
    /// Plain text
    Text { text: String },
    /// Link to a voice recording
    VoiceLink { title: String, url: String },
    /// Link to a media file
    MediaLink { title: String, url: String },
    /// Link to an arbitrary file
    FileLink { file_name: String, url: String },
    /// Reference to an image by path or name
    Image { path_or_name: String },
}

impl MessagePayload {
    /// Kind discriminator used on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            MessagePayload::Text { .. } => "TEXT",
            MessagePayload::VoiceLink { .. } => "VOICE",
            MessagePayload::MediaLink { .. } => "MEDIA",
            MessagePayload::FileLink { .. } => "FILE",
            MessagePayload::Image { .. } => "IMAGE",
        }
    }

    /// One-line preview of the content
    pub fn preview(&self) -> String {
        match self {
            MessagePayload::Text { text } => text.clone(),
            MessagePayload::VoiceLink { title, url } => format!("[VOICE] {} | {}", title, url),
            MessagePayload::MediaLink { title, url } => format!("[MEDIA] {} | {}", title, url),
            MessagePayload::FileLink { file_name, url } => {
                format!("[FILE] {} | {}", file_name, url)
            }
            MessagePayload::Image { path_or_name } => format!("[IMAGE] {}", path_or_name),
        }
    }
}

/// A single chat message
#[derive(Debug, Clone)]
pub struct Message {
    /// Message ID
    pub id: MessageId,
    /// Owning chat
    pub chat_id: ChatId,
    /// Sending user
    pub sender_id: UserId,
    /// Creation timestamp in milliseconds since UNIX epoch
    pub timestamp: u64,
    /// Immutable content
    pub payload: MessagePayload,
    status: DeliveryStatus,
}

impl Message {
    /// Create a new message with status `Sent`
    pub fn new(
        id: MessageId,
        chat_id: ChatId,
        sender_id: UserId,
        timestamp: u64,
        payload: MessagePayload,
    ) -> Self {
        Self {
            id,
            chat_id,
            sender_id,
            timestamp,
            payload,
            status: DeliveryStatus::Sent,
        }
    }

    pub fn status(&self) -> DeliveryStatus {
        self.status
    }

    /// Advance the delivery status.
    ///
    /// Re-asserting the current status is a no-op; going backwards is
    /// rejected.
    pub fn advance_status(&mut self, next: DeliveryStatus) -> Result<()> {
        if next < self.status {
            return Err(ChatError::validation(format!(
                "Status cannot go back from {} to {}",
                self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_message() -> Message {
        Message::new(
            1,
            1,
            1,
            1_700_000_000_000,
            MessagePayload::Text {
                text: "hi".to_string(),
            },
        )
    }

    #[test]
    fn test_fresh_message_is_sent() {
        assert_eq!(text_message().status(), DeliveryStatus::Sent);
    }

    #[test]
    fn test_status_advances_forward() {
        let mut msg = text_message();
        msg.advance_status(DeliveryStatus::Delivered).unwrap();
        msg.advance_status(DeliveryStatus::Read).unwrap();
        assert_eq!(msg.status(), DeliveryStatus::Read);
    }

    #[test]
    fn test_status_regression_is_rejected() {
        let mut msg = text_message();
        msg.advance_status(DeliveryStatus::Read).unwrap();

        let err = msg.advance_status(DeliveryStatus::Delivered).unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
        assert_eq!(msg.status(), DeliveryStatus::Read);
    }

    #[test]
    fn test_same_status_is_noop() {
        let mut msg = text_message();
        msg.advance_status(DeliveryStatus::Sent).unwrap();
        assert_eq!(msg.status(), DeliveryStatus::Sent);
    }

    #[test]
    fn test_kind_and_preview() {
        let msg = Message::new(
            2,
            1,
            1,
            0,
            MessagePayload::FileLink {
                file_name: "notes.pdf".to_string(),
                url: "https://drive.google.com/file/d/abc".to_string(),
            },
        );
        assert_eq!(msg.payload.kind(), "FILE");
        assert_eq!(
            msg.payload.preview(),
            "[FILE] notes.pdf | https://drive.google.com/file/d/abc"
        );
    }
}
