//! Transport layer for the vision relay.
//!
//! Provides:
//! - Wire protocol (JSON frames over server-sent events)
//! - Incremental upstream frame parser
//! - Stream relay state machine and request pipeline
//! - HTTP transport (feature: http)

pub mod parser;
pub mod protocol;
pub mod relay;

#[cfg(feature = "http")]
pub mod http;

pub use parser::FrameParser;
pub use protocol::{ChatSubmission, RelayFrame};
pub use relay::{RelayOutcome, RelayState, StreamRelay, pump, run_chat};

#[cfg(feature = "http")]
pub use http::{AppState, create_chat_router};
