//! Session resolution and storage for the vision relay.
//!
//! Provides:
//! - `SessionResolver` - Map cookie credentials onto conversation logs
//! - Storage implementations (memory)

pub mod resolver;
pub mod storage;

pub use resolver::{ResolvedSession, SESSION_COOKIE, SessionResolver};
#[cfg(feature = "memory")]
pub use storage::{MemoryStore, StoreLimits};
