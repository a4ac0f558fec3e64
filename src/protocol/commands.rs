//! Client command grammar.
//!
//! Every inbound line is one command token plus a raw argument remainder.
//! Unknown commands and malformed arguments are reported without closing
//! the connection.

use crate::domain::{ChatId, UserId};
use crate::error::{ChatError, Result};

/// A parsed client command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register {
        username: String,
    },
    Login {
        user_id: UserId,
    },
    Users,
    CreateChat {
        title: String,
        participant_ids: Vec<UserId>,
    },
    Chats,
    SendText {
        chat_id: ChatId,
        text: String,
    },
    SendVoiceLink {
        chat_id: ChatId,
        title: String,
        url: String,
    },
    SendMediaLink {
        chat_id: ChatId,
        title: String,
        url: String,
    },
    SendFileLink {
        chat_id: ChatId,
        file_name: String,
        url: String,
    },
    History {
        chat_id: ChatId,
    },
    Help,
    Exit,
}

impl Command {
    /// Parse one protocol line; the line must already be trimmed and
    /// non-empty.
    pub fn parse(line: &str) -> Result<Command> {
        let (token, rest) = split_first_token(line);
        match token.to_ascii_uppercase().as_str() {
            "REGISTER" => {
                let username = require_args(rest, "REGISTER <username>")?;
                Ok(Command::Register {
                    username: username.to_string(),
                })
            }
            "LOGIN" => {
                let id = require_args(rest, "LOGIN <userId>")?;
                Ok(Command::Login {
                    user_id: parse_id(id)?,
                })
            }
            "USERS" => Ok(Command::Users),
            "CREATE_CHAT" => parse_create_chat(rest),
            "CHATS" => Ok(Command::Chats),
            "SEND_TEXT" => parse_send_text(rest),
            "SEND_VOICE_LINK" => {
                let (chat_id, title, url) =
                    parse_link_args(rest, "SEND_VOICE_LINK <chatId> <title> | <url>")?;
                Ok(Command::SendVoiceLink {
                    chat_id,
                    title,
                    url,
                })
            }
            "SEND_MEDIA_LINK" => {
                let (chat_id, title, url) =
                    parse_link_args(rest, "SEND_MEDIA_LINK <chatId> <title> | <url>")?;
                Ok(Command::SendMediaLink {
                    chat_id,
                    title,
                    url,
                })
            }
            "SEND_FILE_LINK" => {
                let (chat_id, file_name, url) =
                    parse_link_args(rest, "SEND_FILE_LINK <chatId> <fileName> | <url>")?;
                Ok(Command::SendFileLink {
                    chat_id,
                    file_name,
                    url,
                })
            }
            "HISTORY" => {
                let id = require_args(rest, "HISTORY <chatId>")?;
                Ok(Command::History {
                    chat_id: parse_id(id)?,
                })
            }
            "HELP" => Ok(Command::Help),
            "EXIT" => Ok(Command::Exit),
            _ => Err(ChatError::protocol("Unknown command. Type HELP")),
        }
    }
}

/// Command syntax lines shown by HELP, in display order
pub fn help_lines() -> &'static [&'static str] {
    &[
        "REGISTER <username>",
        "LOGIN <userId>",
        "USERS",
        "CREATE_CHAT <title> | <id1,id2,...>",
        "CHATS",
        "SEND_TEXT <chatId> <text...>",
        "SEND_VOICE_LINK <chatId> <title> | <url>",
        "SEND_MEDIA_LINK <chatId> <title> | <url>",
        "SEND_FILE_LINK <chatId> <fileName> | <url>",
        "HISTORY <chatId>",
        "HELP",
        "EXIT",
    ]
}

fn split_first_token(line: &str) -> (&str, &str) {
    match line.find(' ') {
        Some(idx) => (&line[..idx], &line[idx + 1..]),
        None => (line, ""),
    }
}

fn usage(text: &str) -> ChatError {
    ChatError::validation(format!("Usage: {}", text))
}

fn require_args<'a>(rest: &'a str, usage_text: &str) -> Result<&'a str> {
    let rest = rest.trim();
    if rest.is_empty() {
        return Err(usage(usage_text));
    }
    Ok(rest)
}

fn parse_id(s: &str) -> Result<u64> {
    s.trim()
        .parse()
        .map_err(|_| ChatError::validation(format!("Bad numeric argument: {}", s.trim())))
}

fn parse_create_chat(rest: &str) -> Result<Command> {
    const USAGE: &str = "CREATE_CHAT <title> | <id1,id2,...>";

    let (title, ids) = rest.split_once('|').ok_or_else(|| usage(USAGE))?;
    let mut participant_ids = Vec::new();
    for part in ids.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        participant_ids.push(parse_id(part)?);
    }

    Ok(Command::CreateChat {
        title: title.trim().to_string(),
        participant_ids,
    })
}

fn parse_send_text(rest: &str) -> Result<Command> {
    const USAGE: &str = "SEND_TEXT <chatId> <text...>";

    let (chat_id, text) = rest
        .trim_start()
        .split_once(' ')
        .ok_or_else(|| usage(USAGE))?;
    if text.trim().is_empty() {
        return Err(usage(USAGE));
    }

    Ok(Command::SendText {
        chat_id: parse_id(chat_id)?,
        text: text.to_string(),
    })
}

/// Shared grammar of the link sends: `<chatId> <name...> | <url>`
fn parse_link_args(rest: &str, usage_text: &str) -> Result<(ChatId, String, String)> {
    let (left, url) = rest.split_once('|').ok_or_else(|| usage(usage_text))?;
    let (chat_id, name) = left
        .trim()
        .split_once(' ')
        .ok_or_else(|| usage(usage_text))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(usage(usage_text));
    }

    Ok((parse_id(chat_id)?, name.to_string(), url.trim().to_string()))
}
