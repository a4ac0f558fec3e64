//! Server-to-client line formatting.
//!
//! Success lines are prefixed `OK `, errors `ERROR `, and asynchronous push
//! notifications `EVENT `. The `EVENT` prefix is reserved: it marks the only
//! lines a client may receive that are not a response to its own last
//! command. Multi-row responses are one header carrying `count=N` followed
//! by exactly N detail rows.

use crate::domain::{Chat, Message, MessagePayload, User};
use crate::error::ChatError;

pub const OK: &str = "OK";
pub const ERROR: &str = "ERROR";
pub const EVENT: &str = "EVENT";

/// Replace line breaks so one logical field can never split a protocol line
pub fn escape(s: &str) -> String {
    s.replace('\n', "\\n").replace('\r', "\\r")
}

pub fn greeting() -> String {
    format!("{} Connected. Type HELP for commands.", OK)
}

pub fn bye() -> String {
    format!("{} Bye.", OK)
}

pub fn error_line(err: &ChatError) -> String {
    format!("{} {}", ERROR, err)
}

pub fn registered(user: &User) -> String {
    format!(
        "{} REGISTERED userId={} username={}",
        OK,
        user.id,
        escape(&user.username)
    )
}

pub fn logged_in(user: &User) -> String {
    format!(
        "{} LOGGED_IN userId={} username={}",
        OK,
        user.id,
        escape(&user.username)
    )
}

pub fn users_header(count: usize) -> String {
    format!("{} USERS count={}", OK, count)
}

pub fn user_row(user: &User, online: bool) -> String {
    format!(
        "  id={}|name={}|online={}",
        user.id,
        escape(&user.username),
        online
    )
}

pub fn chat_created(chat: &Chat) -> String {
    let ids: Vec<String> = chat.participant_ids().iter().map(u64::to_string).collect();
    format!(
        "{} CHAT_CREATED chatId={} title={} participants={}",
        OK,
        chat.id,
        escape(&chat.title),
        ids.join(",")
    )
}

pub fn chats_header(count: usize) -> String {
    format!("{} CHATS count={}", OK, count)
}

pub fn chat_row(chat: &Chat, participant_names: &[String]) -> String {
    let names: Vec<String> = participant_names.iter().map(|n| escape(n)).collect();
    format!(
        "  chatId={}|title={}|participants={}",
        chat.id,
        escape(&chat.title),
        names.join(",")
    )
}

pub fn sent(message: &Message) -> String {
    format!(
        "{} SENT messageId={} kind={} status={}",
        OK,
        message.id,
        message.payload.kind(),
        message.status()
    )
}

pub fn history_header(chat_title: &str, count: usize) -> String {
    format!("{} HISTORY chat={} count={}", OK, escape(chat_title), count)
}

pub fn history_row(message: &Message, sender_name: &str) -> String {
    let head = format!(
        "  messageId={}|ts={}|sender={}|status={}|kind={}",
        message.id,
        message.timestamp,
        escape(sender_name),
        message.status(),
        message.payload.kind()
    );
    match &message.payload {
        MessagePayload::Text { text } => format!("{}|text={}", head, escape(text)),
        MessagePayload::VoiceLink { title, url } | MessagePayload::MediaLink { title, url } => {
            format!("{}|title={}|url={}", head, escape(title), escape(url))
        }
        MessagePayload::FileLink { file_name, url } => {
            format!("{}|name={}|url={}", head, escape(file_name), escape(url))
        }
        MessagePayload::Image { path_or_name } => {
            format!("{}|file={}", head, escape(path_or_name))
        }
    }
}

pub fn help_header(count: usize) -> String {
    format!("{} HELP count={}", OK, count)
}

pub fn help_row(syntax: &str) -> String {
    format!("  {}", syntax)
}

/// Compose one push event line for a newly appended message.
///
/// Deterministic for a given (chat, message); the payload kind selects the
/// template.
pub fn event_line(chat: &Chat, sender_name: &str, message: &Message) -> String {
    let head = format!(
        "chatId={} chatTitle={} senderId={} sender={}",
        chat.id,
        escape(&chat.title),
        message.sender_id,
        escape(sender_name)
    );
    match &message.payload {
        MessagePayload::Text { text } => {
            format!("{} NEW_TEXT {} text={}", EVENT, head, escape(text))
        }
        MessagePayload::VoiceLink { title, url } => format!(
            "{} NEW_VOICE {} title={} url={}",
            EVENT,
            head,
            escape(title),
            escape(url)
        ),
        MessagePayload::MediaLink { title, url } => format!(
            "{} NEW_MEDIA {} title={} url={}",
            EVENT,
            head,
            escape(title),
            escape(url)
        ),
        MessagePayload::FileLink { file_name, url } => format!(
            "{} NEW_FILE {} name={} url={}",
            EVENT,
            head,
            escape(file_name),
            escape(url)
        ),
        MessagePayload::Image { path_or_name } => format!(
            "{} NEW_IMAGE {} file={}",
            EVENT,
            head,
            escape(path_or_name)
        ),
    }
}
