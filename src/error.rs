//! Error handling for the chat server

use std::fmt;

/// Result type alias for chat operations
pub type Result<T> = std::result::Result<T, ChatError>;

/// Chat server error types
#[derive(Debug, Clone)]
pub enum ChatError {
    /// Unknown user id
    UserNotFound(String),
    /// Unknown chat id
    ChatNotFound(String),
    /// Unknown message id
    MessageNotFound(String),
    /// Validation failure (empty title, malformed link, bad numeric argument)
    Validation(String),
    /// Command needs a logged-in session
    AuthRequired(String),
    /// Non-participant accessing a chat
    PermissionDenied(String),
    /// Protocol errors (unknown command, malformed line)
    Protocol(String),
    /// Network-related errors
    Network(String),
    /// Server internal error
    Internal(String),
}

impl ChatError {
    /// Get error code for this error type
    pub fn code(&self) -> u32 {
        match self {
            ChatError::UserNotFound(_) => 1000,
            ChatError::ChatNotFound(_) => 1001,
            ChatError::MessageNotFound(_) => 1002,
            ChatError::Validation(_) => 1003,
            ChatError::AuthRequired(_) => 1004,
            ChatError::PermissionDenied(_) => 1005,
            ChatError::Protocol(_) => 1006,
            ChatError::Network(_) => 1007,
            ChatError::Internal(_) => 1008,
        }
    }

    /// Get human-readable error message
    pub fn message(&self) -> &str {
        match self {
            ChatError::UserNotFound(msg) => msg,
            ChatError::ChatNotFound(msg) => msg,
            ChatError::MessageNotFound(msg) => msg,
            ChatError::Validation(msg) => msg,
            ChatError::AuthRequired(msg) => msg,
            ChatError::PermissionDenied(msg) => msg,
            ChatError::Protocol(msg) => msg,
            ChatError::Network(msg) => msg,
            ChatError::Internal(msg) => msg,
        }
    }

    /// Create a user not found error
    pub fn user_not_found<T: Into<String>>(msg: T) -> Self {
        ChatError::UserNotFound(msg.into())
    }

    /// Create a chat not found error
    pub fn chat_not_found<T: Into<String>>(msg: T) -> Self {
        ChatError::ChatNotFound(msg.into())
    }

    /// Create a message not found error
    pub fn message_not_found<T: Into<String>>(msg: T) -> Self {
        ChatError::MessageNotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        ChatError::Validation(msg.into())
    }

    /// Create an auth required error
    pub fn auth_required<T: Into<String>>(msg: T) -> Self {
        ChatError::AuthRequired(msg.into())
    }

    /// Create a permission denied error
    pub fn permission_denied<T: Into<String>>(msg: T) -> Self {
        ChatError::PermissionDenied(msg.into())
    }

    /// Create a protocol error
    pub fn protocol<T: Into<String>>(msg: T) -> Self {
        ChatError::Protocol(msg.into())
    }

    /// Create a network error
    pub fn network<T: Into<String>>(msg: T) -> Self {
        ChatError::Network(msg.into())
    }

    /// Create an internal error
    pub fn internal<T: Into<String>>(msg: T) -> Self {
        ChatError::Internal(msg.into())
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::UserNotFound(msg) => write!(f, "User not found: {}", msg),
            ChatError::ChatNotFound(msg) => write!(f, "Chat not found: {}", msg),
            ChatError::MessageNotFound(msg) => write!(f, "Message not found: {}", msg),
            ChatError::Validation(msg) => write!(f, "Invalid request: {}", msg),
            ChatError::AuthRequired(msg) => write!(f, "Authentication required: {}", msg),
            ChatError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            ChatError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            ChatError::Network(msg) => write!(f, "Network error: {}", msg),
            ChatError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ChatError {}

impl From<std::io::Error> for ChatError {
    fn from(err: std::io::Error) -> Self {
        ChatError::Network(format!("IO error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_distinct() {
        let errors = [
            ChatError::user_not_found("userId=1"),
            ChatError::chat_not_found("chatId=1"),
            ChatError::message_not_found("messageId=1"),
            ChatError::validation("empty title"),
            ChatError::auth_required("login first"),
            ChatError::permission_denied("not a participant"),
            ChatError::protocol("unknown command"),
            ChatError::network("connection reset"),
            ChatError::internal("oops"),
        ];
        let mut codes: Vec<u32> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_display_includes_message() {
        let err = ChatError::user_not_found("userId=42");
        assert_eq!(err.to_string(), "User not found: userId=42");
        assert_eq!(err.message(), "userId=42");
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err: ChatError = io.into();
        assert!(matches!(err, ChatError::Network(_)));
    }
}
