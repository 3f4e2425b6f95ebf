//! Core abstractions for the vision relay.
//!
//! This crate provides the fundamental building blocks:
//! - `Turn` / `ContentPart` - Conversation log entries in chat-message shape
//! - `SessionId` - Opaque per-browser identifier
//! - `SessionStore` - Storage trait for conversation logs

pub mod conversation;
pub mod traits;

pub use conversation::{ContentPart, ImageUrl, Turn};
pub use traits::{SessionId, SessionStore, StoreError};
