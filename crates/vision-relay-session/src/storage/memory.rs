//! In-memory conversation storage.

use std::{
    collections::{HashMap, VecDeque},
    sync::RwLock,
};

use async_trait::async_trait;
use vision_relay_core::{SessionId, SessionStore, StoreError, Turn};

/// Bounds applied to stored conversation logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreLimits {
    /// Maximum turns kept per session. Oldest turns are dropped first.
    /// `None` keeps every turn for the lifetime of the process.
    pub max_turns: Option<usize>,
}

/// In-memory storage implementation.
///
/// Useful for single-process deployments.
/// Data is lost on restart.
pub struct MemoryStore {
    sessions: RwLock<HashMap<SessionId, VecDeque<Turn>>>,
    limits: StoreLimits,
}

impl MemoryStore {
    /// Create an unbounded in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(StoreLimits::default())
    }

    #[must_use]
    pub fn with_limits(limits: StoreLimits) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            limits,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn open(&self, id: &SessionId) -> Result<bool, StoreError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;

        if sessions.contains_key(id) {
            return Ok(false);
        }
        sessions.insert(id.clone(), VecDeque::with_capacity(8));
        Ok(true)
    }

    async fn append(&self, id: &SessionId, turn: Turn) -> Result<(), StoreError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;

        let log = sessions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        log.push_back(turn);
        if let Some(max) = self.limits.max_turns {
            while log.len() > max {
                log.pop_front();
            }
        }

        Ok(())
    }

    async fn history(&self, id: &SessionId) -> Result<Vec<Turn>, StoreError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?;

        sessions
            .get(id)
            .map(|log| log.iter().cloned().collect())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn remove_last(&self, id: &SessionId, expected: &Turn) -> Result<bool, StoreError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;

        let log = sessions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        if log.back() == Some(expected) {
            log.pop_back();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn session_count(&self) -> Result<usize, StoreError> {
        Ok(self
            .sessions
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?
            .len())
    }
}
