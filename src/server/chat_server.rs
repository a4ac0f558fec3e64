//! TCP chat server: shared state and the accept loop.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::directory::{ChatDirectory, UserDirectory};
use crate::error::{ChatError, Result};
use crate::server::broadcast::Broadcaster;
use crate::server::connection_handler::ConnectionHandler;
use crate::server::session_registry::SessionRegistry;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5050".parse().unwrap(),
            max_connections: 1000,
        }
    }
}

/// Line-protocol chat server
pub struct ChatServer {
    config: ServerConfig,
    listener: TcpListener,
    users: Arc<UserDirectory>,
    chats: Arc<ChatDirectory>,
    sessions: Arc<SessionRegistry>,
    broadcaster: Arc<Broadcaster>,
    active_connections: Arc<AtomicUsize>,
}

impl ChatServer {
    /// Bind the listener; `run` starts accepting.
    ///
    /// Split from `run` so callers (tests in particular) can bind port 0 and
    /// read the actual address back.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|e| ChatError::network(format!("Failed to bind {}: {}", config.bind_addr, e)))?;
        info!("server listening on {}", listener.local_addr()?);

        let users = Arc::new(UserDirectory::new());
        let chats = Arc::new(ChatDirectory::new(Arc::clone(&users)));
        let sessions = Arc::new(SessionRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(
            Arc::clone(&users),
            Arc::clone(&chats),
            Arc::clone(&sessions),
        ));

        Ok(Self {
            config,
            listener,
            users,
            chats,
            sessions,
            broadcaster,
            active_connections: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Bind and accept connections until the process stops
    pub async fn start(config: ServerConfig) -> Result<()> {
        Self::bind(config).await?.run().await
    }

    /// The address the listener actually bound
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Get the user directory
    pub fn users(&self) -> Arc<UserDirectory> {
        Arc::clone(&self.users)
    }

    /// Get the chat directory
    pub fn chats(&self) -> Arc<ChatDirectory> {
        Arc::clone(&self.chats)
    }

    /// Get the session registry
    pub fn sessions(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.sessions)
    }

    /// Get the broadcaster
    pub fn broadcaster(&self) -> Arc<Broadcaster> {
        Arc::clone(&self.broadcaster)
    }

    /// Accept connections, spawning one handler task per client
    pub async fn run(self) -> Result<()> {
        loop {
            let (stream, remote_addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("accept failed: {}", e);
                    continue;
                }
            };

            if self.active_connections.load(Ordering::Relaxed) >= self.config.max_connections {
                warn!("connection limit reached, refusing {}", remote_addr);
                drop(stream);
                continue;
            }

            let handler = ConnectionHandler::new(
                remote_addr,
                Arc::clone(&self.users),
                Arc::clone(&self.chats),
                Arc::clone(&self.sessions),
                Arc::clone(&self.broadcaster),
            );

            self.active_connections.fetch_add(1, Ordering::Relaxed);
            let active = Arc::clone(&self.active_connections);
            tokio::spawn(async move {
                handler.run(stream).await;
                active.fetch_sub(1, Ordering::Relaxed);
            });
        }
    }

    /// Get server statistics
    pub async fn stats(&self) -> ServerStats {
        ServerStats {
            connections: self.active_connections.load(Ordering::Relaxed),
            online_users: self.sessions.online_count().await,
            total_users: self.users.user_count().await,
            total_chats: self.chats.chat_count().await,
        }
    }
}

/// Server statistics
#[derive(Debug, Clone)]
pub struct ServerStats {
    pub connections: usize,
    pub online_users: usize,
    pub total_users: usize,
    pub total_chats: usize,
}
