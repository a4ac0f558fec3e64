//! Per-connection protocol loop.
//!
//! One handler runs per accepted connection: it parses lines into commands,
//! invokes directory and log operations, writes responses, and deregisters
//! its session on shutdown. All outbound lines for a connection (responses
//! and broadcast events alike) funnel through one writer task, so writes
//! from foreign handlers are serialized and never block the sender.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::directory::{ChatDirectory, UserDirectory};
use crate::domain::{ChatId, Message, User, UserId};
use crate::error::{ChatError, Result};
use crate::protocol::{commands, wire, Command};
use crate::server::broadcast::Broadcaster;
use crate::server::session_registry::{SessionHandle, SessionRegistry};

/// Handles one accepted connection until it closes
pub struct ConnectionHandler {
    session_id: Uuid,
    remote_addr: SocketAddr,
    users: Arc<UserDirectory>,
    chats: Arc<ChatDirectory>,
    sessions: Arc<SessionRegistry>,
    broadcaster: Arc<Broadcaster>,
    outbox: mpsc::UnboundedSender<String>,
    outbox_rx: Option<mpsc::UnboundedReceiver<String>>,
    current_user: Option<UserId>,
}

impl ConnectionHandler {
    pub fn new(
        remote_addr: SocketAddr,
        users: Arc<UserDirectory>,
        chats: Arc<ChatDirectory>,
        sessions: Arc<SessionRegistry>,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        let (outbox, outbox_rx) = mpsc::unbounded_channel();
        Self {
            session_id: Uuid::new_v4(),
            remote_addr,
            users,
            chats,
            sessions,
            broadcaster,
            outbox,
            outbox_rx: Some(outbox_rx),
            current_user: None,
        }
    }

    /// Main entry point; drives the connection until EXIT, EOF or I/O
    /// failure, then unregisters the session.
    pub async fn run(mut self, stream: TcpStream) {
        info!("new connection from {}", self.remote_addr);

        let (read_half, write_half) = stream.into_split();
        let Some(outbox_rx) = self.outbox_rx.take() else {
            return;
        };
        tokio::spawn(write_loop(write_half, outbox_rx));

        self.send_line(wire::greeting());

        if let Err(e) = self.read_loop(read_half).await {
            debug!("connection from {} errored: {}", self.remote_addr, e);
        }

        // Cleanup runs on every exit path. If a newer login already took
        // over this user id, the token guard makes this a no-op.
        if let Some(user_id) = self.current_user {
            self.sessions.unregister(user_id, self.session_id).await;
        }
        info!("connection from {} closed", self.remote_addr);
    }

    async fn read_loop(&mut self, read_half: OwnedReadHalf) -> Result<()> {
        let mut lines = BufReader::new(read_half).lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match Command::parse(line) {
                Ok(command) => match self.dispatch(command).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => self.send_line(wire::error_line(&e)),
                },
                Err(e) => self.send_line(wire::error_line(&e)),
            }
        }
        Ok(())
    }

    /// Handle one command; returns false when the connection should close
    async fn dispatch(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Register { username } => self.handle_register(&username).await?,
            Command::Login { user_id } => self.handle_login(user_id).await?,
            Command::Users => self.handle_users().await?,
            Command::CreateChat {
                title,
                participant_ids,
            } => self.handle_create_chat(&title, &participant_ids).await?,
            Command::Chats => self.handle_chats().await?,
            Command::SendText { chat_id, text } => {
                let sender = self.require_login()?;
                let message = self.chats.send_text(chat_id, sender, &text).await?;
                self.finish_send(message).await?;
            }
            Command::SendVoiceLink {
                chat_id,
                title,
                url,
            } => {
                let sender = self.require_login()?;
                let message = self
                    .chats
                    .send_voice_link(chat_id, sender, &title, &url)
                    .await?;
                self.finish_send(message).await?;
            }
            Command::SendMediaLink {
                chat_id,
                title,
                url,
            } => {
                let sender = self.require_login()?;
                let message = self
                    .chats
                    .send_media_link(chat_id, sender, &title, &url)
                    .await?;
                self.finish_send(message).await?;
            }
            Command::SendFileLink {
                chat_id,
                file_name,
                url,
            } => {
                let sender = self.require_login()?;
                let message = self
                    .chats
                    .send_file_link(chat_id, sender, &file_name, &url)
                    .await?;
                self.finish_send(message).await?;
            }
            Command::History { chat_id } => self.handle_history(chat_id).await?,
            Command::Help => self.handle_help(),
            Command::Exit => {
                self.send_line(wire::bye());
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Queue a line for the writer task. A gone writer means the peer is
    /// gone; there is nobody left to report that to.
    fn send_line(&self, line: String) {
        let _ = self.outbox.send(line);
    }

    fn require_login(&self) -> Result<UserId> {
        self.current_user
            .ok_or_else(|| ChatError::auth_required("Login first: REGISTER or LOGIN"))
    }

    async fn handle_register(&mut self, username: &str) -> Result<()> {
        let user = self.users.create_user(username).await?;
        self.attach_session(&user).await;
        self.send_line(wire::registered(&user));
        Ok(())
    }

    async fn handle_login(&mut self, user_id: UserId) -> Result<()> {
        let user = self.users.get_user(user_id).await?;
        self.attach_session(&user).await;
        self.send_line(wire::logged_in(&user));
        Ok(())
    }

    /// Bind this connection to a user: install the session handle and
    /// instrument every chat the user already participates in.
    async fn attach_session(&mut self, user: &User) {
        if let Some(previous) = self.current_user.take() {
            if previous != user.id {
                self.sessions.unregister(previous, self.session_id).await;
            }
        }
        self.current_user = Some(user.id);

        let handle = SessionHandle::new(self.session_id, self.outbox.clone());
        self.sessions.register(user.id, handle).await;
        self.broadcaster.subscribe_user_chats(user.id).await;

        info!(
            "user {} ({}) authenticated on {}",
            user.username, user.id, self.remote_addr
        );
    }

    async fn handle_users(&self) -> Result<()> {
        self.require_login()?;

        let users = self.users.list_users().await;
        self.send_line(wire::users_header(users.len()));
        for user in &users {
            let online = self.sessions.is_online(user.id).await;
            self.send_line(wire::user_row(user, online));
        }
        Ok(())
    }

    async fn handle_create_chat(&mut self, title: &str, participant_ids: &[UserId]) -> Result<()> {
        let creator = self.require_login()?;

        let chat = self.chats.create_chat(title, creator, participant_ids).await?;
        self.broadcaster.ensure_subscribed(chat.id).await?;
        self.send_line(wire::chat_created(&chat));
        Ok(())
    }

    async fn handle_chats(&self) -> Result<()> {
        let user_id = self.require_login()?;

        let mine = self.chats.chats_for_user(user_id).await;
        self.send_line(wire::chats_header(mine.len()));
        for chat in &mine {
            let mut names = Vec::with_capacity(chat.participant_ids().len());
            for &uid in chat.participant_ids() {
                names.push(self.display_name(uid).await);
            }
            self.send_line(wire::chat_row(chat, &names));
        }
        Ok(())
    }

    /// Shared tail of every send: instrument the chat, fan the event out,
    /// then acknowledge to the sender.
    async fn finish_send(&self, message: Message) -> Result<()> {
        self.broadcaster.ensure_subscribed(message.chat_id).await?;
        self.broadcaster.message_appended(&message).await;
        self.send_line(wire::sent(&message));
        Ok(())
    }

    async fn handle_history(&self, chat_id: ChatId) -> Result<()> {
        let user_id = self.require_login()?;

        let chat = self.chats.get_chat(chat_id).await?;
        if !chat.is_participant(user_id) {
            return Err(ChatError::permission_denied(format!(
                "You are not a participant of chatId={}",
                chat_id
            )));
        }

        let history = self.chats.history(chat_id).await?;
        self.send_line(wire::history_header(&chat.title, history.len()));
        for message in &history {
            let sender = self.display_name(message.sender_id).await;
            self.send_line(wire::history_row(message, &sender));
        }
        Ok(())
    }

    fn handle_help(&self) {
        let lines = commands::help_lines();
        self.send_line(wire::help_header(lines.len()));
        for syntax in lines {
            self.send_line(wire::help_row(syntax));
        }
    }

    async fn display_name(&self, user_id: UserId) -> String {
        self.users
            .username(user_id)
            .await
            .unwrap_or_else(|| format!("user_{}", user_id))
    }
}

/// Drain the outbox onto the socket, one `\n`-terminated line per entry.
/// Ends when the channel closes or the peer stops accepting writes.
async fn write_loop(mut write_half: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<String>) {
    while let Some(line) = rx.recv().await {
        if write_half
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .is_err()
        {
            break;
        }
    }
    let _ = write_half.shutdown().await;
}
