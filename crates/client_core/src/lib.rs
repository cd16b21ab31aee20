//! Client side of the scheduler protocol: one UDP socket, one request in
//! flight, one deadline per request.

pub mod error;
pub mod session;

pub use error::ClientError;
pub use session::{SchedulerClient, SessionState};

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
