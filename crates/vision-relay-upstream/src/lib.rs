//! Upstream side of the vision relay.
//!
//! Provides:
//! - Request composition (fixed instruction + optional image)
//! - OpenAI-compatible chat-completions wire types
//! - `ChatBackend` trait and its reqwest-based `UpstreamClient`

pub mod client;
pub mod composer;
pub mod protocol;

pub use client::{
    ByteStream, ChatBackend, StatusCode, UpstreamClient, UpstreamConfig, UpstreamError,
};
pub use composer::{INSTRUCTION_TEXT, append_user_turn, compose_user_turn};
pub use protocol::{ChatCompletionRequest, DONE_SENTINEL, TEMPERATURE, delta_token};
