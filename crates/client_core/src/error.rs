use std::{io, net::SocketAddr, time::Duration};

use shared::error::CommandError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to open client socket: {0}")]
    Bind(#[source] io::Error),
    /// Rejected by the local grammar; nothing was sent.
    #[error(transparent)]
    Command(#[from] CommandError),
    /// The datagram never left; no timer was started.
    #[error("failed to send command to {addr}: {source}")]
    Send {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("server did not respond within {}ms; the message may have been lost", .after.as_millis())]
    TimedOut { after: Duration },
    #[error("failed to receive reply: {0}")]
    Receive(#[source] io::Error),
    #[error("server reply is not a valid response: {raw}")]
    MalformedReply { raw: String },
}

impl ClientError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::TimedOut { .. })
    }
}
