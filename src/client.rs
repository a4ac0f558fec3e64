//! Line-protocol chat client.
//!
//! Connects to the server, demultiplexes unsolicited `EVENT` lines away from
//! command responses, and collects each response as its header plus the
//! `count=N` detail rows the header announces.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{ChatError, Result};
use crate::protocol::wire;

/// Chat client configuration
#[derive(Debug, Clone)]
pub struct ChatClientConfig {
    /// Server address to connect to
    pub server_addr: SocketAddr,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for ChatClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:5050".parse().unwrap(),
            connect_timeout_secs: 10,
        }
    }
}

/// Line-protocol chat client
pub struct ChatClient {
    write_half: OwnedWriteHalf,
    responses: mpsc::UnboundedReceiver<String>,
    /// Greeting line received on connect
    pub greeting: String,
}

impl ChatClient {
    /// Connect and wait for the server greeting.
    ///
    /// Returns the client and a receiver yielding unsolicited `EVENT` lines
    /// as they arrive.
    pub async fn connect(
        config: ChatClientConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<String>)> {
        let stream = tokio::time::timeout(
            Duration::from_secs(config.connect_timeout_secs),
            TcpStream::connect(config.server_addr),
        )
        .await
        .map_err(|_| ChatError::network("Connection timeout"))?
        .map_err(|e| ChatError::network(format!("Failed to connect: {}", e)))?;

        let (read_half, write_half) = stream.into_split();
        let (response_tx, mut responses) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut lines = BufReader::new(read_half).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let target = if line.starts_with(wire::EVENT) {
                    &event_tx
                } else {
                    &response_tx
                };
                if target.send(line).is_err() {
                    break;
                }
            }
            debug!("server connection closed");
        });

        let greeting = responses
            .recv()
            .await
            .ok_or_else(|| ChatError::network("Connection closed before greeting"))?;

        Ok((
            Self {
                write_half,
                responses,
                greeting,
            },
            events,
        ))
    }

    /// Send one command line and collect its full response: the header line
    /// plus, when the header carries `count=N`, the N detail rows.
    pub async fn request(&mut self, command: &str) -> Result<Vec<String>> {
        self.write_half
            .write_all(format!("{}\n", command).as_bytes())
            .await?;

        let header = self.next_response().await?;
        let mut response = Vec::with_capacity(1);
        let rows = parse_count(&header).unwrap_or(0);
        response.push(header);
        for _ in 0..rows {
            response.push(self.next_response().await?);
        }
        Ok(response)
    }

    /// Send EXIT and consume the farewell line
    pub async fn quit(mut self) -> Result<()> {
        self.request("EXIT").await?;
        self.write_half.shutdown().await?;
        Ok(())
    }

    async fn next_response(&mut self) -> Result<String> {
        self.responses
            .recv()
            .await
            .ok_or_else(|| ChatError::network("Connection closed by server"))
    }
}

/// Extract `count=N` from a response header, if present
fn parse_count(header: &str) -> Option<usize> {
    header
        .split_whitespace()
        .find_map(|field| field.strip_prefix("count="))
        .and_then(|n| n.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("OK USERS count=3"), Some(3));
        assert_eq!(parse_count("OK HISTORY chat=Team count=0"), Some(0));
        assert_eq!(parse_count("OK REGISTERED userId=1 username=alice"), None);
        assert_eq!(parse_count("ERROR Chat not found: chatId=9"), None);
    }
}
