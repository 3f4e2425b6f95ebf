//! Core traits for session storage.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Turn;

/// Opaque session identifier, as carried by the client credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters of the identifier, for log lines.
    #[must_use]
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map_or(self.0.len(), |(idx, _)| idx);
        &self.0[..end]
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),
    #[error("Storage error: {0}")]
    Internal(String),
}

/// Trait for conversation log backends.
///
/// Each call is atomic on its own. Nothing serializes a sequence of calls
/// made by two requests of the same session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Ensure a log exists for `id`.
    ///
    /// Returns `true` when an empty log was created.
    async fn open(&self, id: &SessionId) -> Result<bool, StoreError>;

    /// Append a turn to the end of the log.
    async fn append(&self, id: &SessionId, turn: Turn) -> Result<(), StoreError>;

    /// Snapshot of the log, oldest turn first.
    async fn history(&self, id: &SessionId) -> Result<Vec<Turn>, StoreError>;

    /// Remove the last turn if it equals `expected`.
    ///
    /// Returns whether a turn was removed.
    async fn remove_last(&self, id: &SessionId, expected: &Turn) -> Result<bool, StoreError>;

    /// Number of known sessions.
    async fn session_count(&self) -> Result<usize, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id() {
        let id = SessionId::new("0123456789abcdef");
        assert_eq!(id.short(), "01234567");
        assert_eq!(SessionId::new("abc").short(), "abc");
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = SessionId::new("deadbeef");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"deadbeef\"");
        assert_eq!(id.to_string(), "deadbeef");
    }
}
