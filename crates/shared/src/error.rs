use thiserror::Error;

use crate::command::Verb;

/// Why a command line was rejected by the grammar. These are raised on the
/// client before anything is sent, and again on the server for datagrams
/// that did not come from a well-behaved client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Empty command.")]
    Empty,
    #[error("Unknown command: {verb}")]
    UnknownCommand { verb: String },
    #[error("Invalid {verb} command format. Use: {}", .verb.usage())]
    InvalidFormat { verb: Verb },
    #[error("Invalid duration '{value}'. Use a whole number of minutes.")]
    InvalidDuration { value: String },
}

impl CommandError {
    pub fn invalid_format(verb: Verb) -> Self {
        Self::InvalidFormat { verb }
    }
}
