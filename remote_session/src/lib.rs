// Client side view of a remote, session based content store.
//
// Every method of the session traits is one request/response round trip,
// except `RemoteSession::queue_delete` which only buffers a mutation until the
// next `RemoteSession::execute`. Session establishment and authentication are
// handled by whoever constructs the concrete session.

pub mod mock;
pub mod ops;
pub mod provisioning;
pub mod query;

pub use mock::{MockRemoteSession, RecordedCall};
pub use ops::{ProvisioningOps, RemoteSession};
pub use provisioning::{
    GroupInfo, ListCreation, ListInfo, ListUpdate, RoleAssignment, RoleScope,
};
pub use query::{ItemPage, ItemQuery, PageCursor, ViewDefinition, ViewScope};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteError {
    #[error("Server error: {0}")]
    Server(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl RemoteError {
    /// The raw message reported by the remote side.
    pub fn message(&self) -> &str {
        match self {
            RemoteError::Server(message)
            | RemoteError::Transport(message)
            | RemoteError::NotFound(message)
            | RemoteError::Timeout(message)
            | RemoteError::Protocol(message) => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_is_unwrapped() {
        let err = RemoteError::Server("list view threshold".to_string());
        assert_eq!(err.message(), "list view threshold");
        assert_eq!(err.to_string(), "Server error: list view threshold");
    }
}
