use std::{io, net::SocketAddr};

use anyhow::{Context, Result};
use server_api::handle_line;
use shared::protocol::{decode_request, Response, MAX_DATAGRAM_BYTES};
use storage::AppointmentStore;
use tokio::net::UdpSocket;
use tracing::{debug, error, info, warn};

/// What the server does with one inbound datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Blank payload; dropped without a reply.
    Ignore,
    Reply(Response),
    /// Fault injection tripped: stop serving without replying.
    Crash,
}

/// Receives one datagram at a time, runs it against the store and replies
/// to the sender's address before reading the next one. Datagrams are
/// never batched or reordered.
pub struct UdpServer {
    socket: UdpSocket,
    store: AppointmentStore,
    crash_after: Option<u64>,
    received: u64,
}

impl UdpServer {
    pub async fn bind(addr: SocketAddr, store: AppointmentStore) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("failed to bind datagram socket on {addr}"))?;
        Ok(Self {
            socket,
            store,
            crash_after: None,
            received: 0,
        })
    }

    pub fn with_crash_after(mut self, crash_after: Option<u64>) -> Self {
        self.crash_after = crash_after;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Runs until the socket fails or fault injection stops it. Returning
    /// drops the socket.
    pub async fn serve(mut self) -> Result<()> {
        let mut buf = vec![0u8; MAX_DATAGRAM_BYTES];
        loop {
            let (len, peer) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(error) if is_transient(&error) => {
                    warn!(%error, "ignoring transient receive error");
                    continue;
                }
                Err(error) => return Err(error).context("datagram socket failed"),
            };

            match self.dispatch(&buf[..len], peer).await {
                Dispatch::Ignore => {}
                Dispatch::Reply(response) => self.reply(&response, peer).await,
                Dispatch::Crash => {
                    warn!(
                        received = self.received,
                        "simulating crash; no further commands will be answered"
                    );
                    return Ok(());
                }
            }
        }
    }

    pub async fn dispatch(&mut self, payload: &[u8], peer: SocketAddr) -> Dispatch {
        let line = decode_request(payload);
        if line.is_empty() {
            debug!(%peer, "ignoring empty datagram");
            return Dispatch::Ignore;
        }

        self.received += 1;
        info!(%peer, command = %line, "received command");
        if self.crash_after.is_some_and(|limit| self.received >= limit) {
            return Dispatch::Crash;
        }

        Dispatch::Reply(handle_line(&mut self.store, &line).await)
    }

    async fn reply(&self, response: &Response, peer: SocketAddr) {
        let bytes = match encode_reply(response) {
            Ok(bytes) => bytes,
            Err(error) => {
                error!(%peer, %error, "failed to encode reply");
                return;
            }
        };
        if let Err(error) = self.socket.send_to(&bytes, peer).await {
            error!(%peer, %error, "failed to send reply");
        }
    }
}

/// A reply that would not fit in one datagram is replaced by an error
/// telling the client to narrow the request.
fn encode_reply(response: &Response) -> serde_json::Result<Vec<u8>> {
    let bytes = response.encode()?;
    if bytes.len() <= MAX_DATAGRAM_BYTES {
        return Ok(bytes);
    }
    warn!(len = bytes.len(), "reply exceeds datagram limit");
    Response::error("Reply too large for one datagram; narrow the LIST with a date filter.")
        .encode()
}

/// ICMP port-unreachable from an earlier reply surfaces as a receive error
/// on some platforms; it says nothing about this socket's health.
fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionRefused | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
