//! Stream relay: upstream completion events in, relay frames out.
//!
//! [`StreamRelay`] is the synchronous state machine, [`pump`] drives it from
//! an upstream byte stream into a downstream channel, and [`run_chat`] wires
//! both to the session store for one request.

use std::{fmt::Display, sync::Arc};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use vision_relay_core::{SessionId, SessionStore, Turn};
use vision_relay_upstream::{ChatBackend, DONE_SENTINEL, delta_token};

use crate::{RelayFrame, parser::FrameParser};

/// Error text sent when the model server cannot be reached.
pub const UPSTREAM_ERROR: &str = "Upstream error";

/// Error text sent when the upstream stream breaks mid-reply.
pub const UPSTREAM_INTERRUPTED: &str = "Upstream stream interrupted";

/// Lifecycle of one relayed completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Streaming,
    Done,
    Errored,
}

/// Incremental relay of one upstream completion.
#[derive(Debug)]
pub struct StreamRelay {
    parser: FrameParser,
    reply: String,
    state: RelayState,
}

impl Default for StreamRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamRelay {
    #[must_use]
    pub fn new() -> Self {
        Self {
            parser: FrameParser::new(),
            reply: String::new(),
            state: RelayState::Streaming,
        }
    }

    #[must_use]
    pub const fn state(&self) -> RelayState {
        self.state
    }

    /// Assistant reply accumulated so far.
    #[must_use]
    pub fn reply(&self) -> &str {
        &self.reply
    }

    #[must_use]
    pub fn into_reply(self) -> String {
        self.reply
    }

    /// Feed an upstream chunk, returning the frames to send downstream.
    ///
    /// The sentinel moves the relay to `Done`; anything after it, in this
    /// chunk or later ones, is ignored.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<RelayFrame> {
        if self.state != RelayState::Streaming {
            return Vec::new();
        }

        let mut frames = Vec::new();
        for payload in self.parser.push(chunk) {
            if payload == DONE_SENTINEL {
                self.state = RelayState::Done;
                break;
            }
            frames.push(self.relay_payload(payload));
        }
        frames
    }

    /// Upstream ended without a sentinel. Completes the same way.
    pub fn finish(&mut self) {
        if self.state != RelayState::Streaming {
            return;
        }
        if let Some(rest) = self.parser.finish() {
            tracing::debug!(bytes = rest.len(), "Dropping unterminated trailing frame");
        }
        self.state = RelayState::Done;
    }

    /// Upstream failed mid-stream. Nothing will be committed.
    pub fn fail(&mut self) {
        if self.state == RelayState::Streaming {
            self.state = RelayState::Errored;
        }
    }

    fn relay_payload(&mut self, payload: String) -> RelayFrame {
        match serde_json::from_str::<Value>(&payload) {
            Ok(event) => {
                let token = delta_token(&event);
                self.reply.push_str(token);
                RelayFrame::delta(token)
            }
            Err(_) => RelayFrame::raw(payload),
        }
    }
}

/// How a relayed completion ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Sentinel or end of stream; carries the full reply.
    Completed(String),
    /// Upstream broke mid-stream.
    Failed(String),
    /// The downstream receiver went away.
    Disconnected,
}

/// Drive `upstream` through a [`StreamRelay`], forwarding frames downstream.
///
/// Stops reading upstream as soon as the downstream channel is closed, even
/// while waiting on a stalled upstream. The completion marker is not sent
/// here: the caller commits the reply first.
pub async fn pump<S, E>(upstream: S, downstream: &mpsc::Sender<RelayFrame>) -> RelayOutcome
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    tokio::pin!(upstream);
    let mut relay = StreamRelay::new();

    while relay.state() == RelayState::Streaming {
        let next = tokio::select! {
            biased;
            () = downstream.closed() => return RelayOutcome::Disconnected,
            next = upstream.next() => next,
        };
        match next {
            Some(Ok(chunk)) => {
                for frame in relay.feed(&chunk) {
                    if downstream.send(frame).await.is_err() {
                        return RelayOutcome::Disconnected;
                    }
                }
            }
            Some(Err(e)) => {
                relay.fail();
                return RelayOutcome::Failed(e.to_string());
            }
            None => relay.finish(),
        }
    }

    RelayOutcome::Completed(relay.into_reply())
}

/// Serve one submitted turn: dispatch upstream, relay, commit.
///
/// `user_turn` must already be the last turn of the session's log. It is
/// retracted when dispatch fails, so a failed request leaves the log as it
/// found it.
pub async fn run_chat(
    backend: Arc<dyn ChatBackend>,
    store: Arc<dyn SessionStore>,
    session: SessionId,
    user_turn: Turn,
    downstream: mpsc::Sender<RelayFrame>,
) {
    let upstream = match store.history(&session).await {
        Ok(history) => backend.stream_chat(&history).await,
        Err(e) => {
            tracing::error!(session = session.short(), "Failed to read history: {e}");
            retract(store.as_ref(), &session, &user_turn).await;
            let _ = downstream.send(RelayFrame::error(UPSTREAM_ERROR)).await;
            return;
        }
    };

    let upstream = match upstream {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(session = session.short(), "Upstream dispatch failed: {e}");
            retract(store.as_ref(), &session, &user_turn).await;
            let _ = downstream.send(RelayFrame::error(UPSTREAM_ERROR)).await;
            return;
        }
    };

    match pump(upstream, &downstream).await {
        RelayOutcome::Completed(_) if downstream.is_closed() => {
            tracing::debug!(
                session = session.short(),
                "Client left before completion, discarding reply"
            );
        }
        RelayOutcome::Completed(reply) => {
            tracing::info!(
                session = session.short(),
                chars = reply.chars().count(),
                "Completion relayed"
            );
            if let Err(e) = store.append(&session, Turn::assistant(reply)).await {
                tracing::error!(session = session.short(), "Failed to commit reply: {e}");
            }
            let _ = downstream.send(RelayFrame::done()).await;
        }
        RelayOutcome::Failed(message) => {
            tracing::warn!(session = session.short(), "Upstream stream failed: {message}");
            let _ = downstream
                .send(RelayFrame::error(UPSTREAM_INTERRUPTED))
                .await;
        }
        RelayOutcome::Disconnected => {
            tracing::debug!(
                session = session.short(),
                "Client disconnected, abandoning completion"
            );
        }
    }
}

async fn retract(store: &dyn SessionStore, session: &SessionId, user_turn: &Turn) {
    match store.remove_last(session, user_turn).await {
        Ok(true) => {}
        Ok(false) => tracing::warn!(
            session = session.short(),
            "User turn no longer last in log, leaving it in place"
        ),
        Err(e) => tracing::error!(session = session.short(), "Failed to retract user turn: {e}"),
    }
}
