//! Line-delimited TCP transport to the snapserver

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::error::{Result, SessionError};

/// One open control connection
///
/// Reading is cancel safe, so `next_line` can sit in a `select!` next to
/// the command queue without losing partial lines.
#[derive(Debug)]
pub(crate) struct Connection {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    peer: String,
}

impl Connection {
    pub async fn open(address: &str, dial_timeout: Duration) -> Result<Self> {
        let stream = match tokio::time::timeout(dial_timeout, TcpStream::connect(address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                tracing::debug!(%address, error = %e, "connect failed");
                return Err(SessionError::ConnectionLost);
            }
            Err(_) => {
                tracing::debug!(%address, "connect timed out");
                return Err(SessionError::Timeout(dial_timeout));
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "could not disable Nagle");
        }

        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| address.to_string());
        let (read, writer) = stream.into_split();

        Ok(Self {
            lines: BufReader::new(read).lines(),
            writer,
            peer,
        })
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Write one frame followed by the line terminator
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        let mut frame = Vec::with_capacity(line.len() + 2);
        frame.extend_from_slice(line.as_bytes());
        frame.extend_from_slice(b"\r\n");

        self.writer.write_all(&frame).await.map_err(|e| {
            tracing::debug!(peer = %self.peer, error = %e, "write failed");
            SessionError::ConnectionLost
        })
    }

    /// Next non-empty line; `None` once the server closed the connection
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            match self.lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(line) => return Ok(line),
                Err(e) => {
                    tracing::debug!(peer = %self.peer, error = %e, "read failed");
                    return Err(SessionError::ConnectionLost);
                }
            }
        }
    }
}
