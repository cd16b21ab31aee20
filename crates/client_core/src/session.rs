use std::{
    io,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    time::Duration,
};

use shared::{
    command::parse_command,
    protocol::{encode_request, Response, DEFAULT_REPLY_TIMEOUT, MAX_DATAGRAM_BYTES},
};
use tokio::{
    net::UdpSocket,
    time::{timeout_at, Instant},
};
use tracing::{debug, info};

use crate::error::ClientError;

/// Where the session is in its current exchange. A new command starts from
/// whichever terminal state the previous one ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sent,
    Succeeded,
    TimedOut,
    /// The socket failed or the reply could not be decoded.
    Failed,
}

/// One client endpoint talking to one fixed server address.
///
/// Every exchange is a single request datagram raced against a deadline.
/// Requests are never retransmitted. `&mut self` on the send methods keeps
/// at most one request in flight, so a reply can only belong to the
/// request that is currently waiting.
pub struct SchedulerClient {
    socket: UdpSocket,
    server_addr: SocketAddr,
    reply_timeout: Duration,
    state: SessionState,
    discarded: u64,
    buf: Vec<u8>,
}

impl SchedulerClient {
    pub async fn bind(server_addr: SocketAddr) -> Result<Self, ClientError> {
        let local: IpAddr = if server_addr.is_ipv4() {
            Ipv4Addr::UNSPECIFIED.into()
        } else {
            Ipv6Addr::UNSPECIFIED.into()
        };
        let socket = UdpSocket::bind(SocketAddr::new(local, 0))
            .await
            .map_err(ClientError::Bind)?;

        Ok(Self {
            socket,
            server_addr,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            state: SessionState::Idle,
            discarded: 0,
            buf: vec![0u8; MAX_DATAGRAM_BYTES],
        })
    }

    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn reply_timeout(&self) -> Duration {
        self.reply_timeout
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Datagrams dropped because they arrived outside an exchange or from
    /// an address other than the server.
    pub fn discarded_datagrams(&self) -> u64 {
        self.discarded
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Checks `line` against the grammar and, if it passes, runs one
    /// exchange with the server.
    pub async fn send_command(&mut self, line: &str) -> Result<Response, ClientError> {
        parse_command(line)?;
        self.send_unchecked(line).await
    }

    /// Runs one exchange without local validation; the server's grammar
    /// has the final say.
    pub async fn send_unchecked(&mut self, line: &str) -> Result<Response, ClientError> {
        self.discard_stray_replies();
        self.state = SessionState::Idle;

        let request = encode_request(line);
        self.socket
            .send_to(&request, self.server_addr)
            .await
            .map_err(|source| ClientError::Send {
                addr: self.server_addr,
                source,
            })?;
        self.state = SessionState::Sent;
        debug!(server = %self.server_addr, command = %line.trim(), "command sent");

        let deadline = Instant::now() + self.reply_timeout;
        match timeout_at(deadline, self.await_reply()).await {
            Ok(Ok(response)) => {
                self.state = SessionState::Succeeded;
                Ok(response)
            }
            Ok(Err(error)) => {
                self.state = SessionState::Failed;
                Err(error)
            }
            Err(_) => {
                self.state = SessionState::TimedOut;
                info!(
                    server = %self.server_addr,
                    timeout_ms = self.reply_timeout.as_millis() as u64,
                    "no reply before deadline"
                );
                Err(ClientError::TimedOut {
                    after: self.reply_timeout,
                })
            }
        }
    }

    async fn await_reply(&mut self) -> Result<Response, ClientError> {
        loop {
            let (len, from) = match self.socket.recv_from(&mut self.buf).await {
                Ok(received) => received,
                Err(error) if is_transient(&error) => continue,
                Err(error) => return Err(ClientError::Receive(error)),
            };
            if from != self.server_addr {
                self.discarded += 1;
                debug!(%from, "ignoring datagram from unexpected sender");
                continue;
            }

            let payload = &self.buf[..len];
            return Response::decode(payload).map_err(|_| ClientError::MalformedReply {
                raw: String::from_utf8_lossy(payload).into_owned(),
            });
        }
    }

    /// Replies that arrive after their deadline are still queued on the
    /// socket; drop them so they cannot be mistaken for the next answer.
    fn discard_stray_replies(&mut self) {
        loop {
            match self.socket.try_recv_from(&mut self.buf) {
                Ok((len, from)) => {
                    self.discarded += 1;
                    debug!(%from, len, "discarding stray reply");
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => break,
                Err(error) if is_transient(&error) => continue,
                Err(error) => {
                    debug!(%error, "stopped draining socket");
                    break;
                }
            }
        }
    }
}

/// Windows reports an ICMP port-unreachable for an earlier send as a
/// receive error; the exchange should keep waiting for its deadline.
fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionRefused | io::ErrorKind::Interrupted
    )
}
