//! Wire protocol between the browser client and the relay.

use serde::{Deserialize, Serialize};

/// Body of `POST /chat`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSubmission {
    /// Self-contained encoded image, e.g. `data:image/jpeg;base64,...`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data_url: Option<String>,
}

impl ChatSubmission {
    /// Parse a request body. An empty body is a text-only turn.
    ///
    /// # Errors
    /// Returns error if a non-empty body is not a valid submission.
    pub fn from_body(body: &[u8]) -> Result<Self, serde_json::Error> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
    }
}

/// One event sent down the response stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelayFrame {
    /// Incremental text token.
    Delta { delta: String },
    /// Stream completed. Always `true` on the wire.
    Done { done: bool },
    /// Request failed.
    Error { error: String },
    /// Upstream payload that could not be parsed, verbatim.
    Raw { raw: String },
}

impl RelayFrame {
    #[must_use]
    pub fn delta(token: impl Into<String>) -> Self {
        Self::Delta {
            delta: token.into(),
        }
    }

    #[must_use]
    pub const fn done() -> Self {
        Self::Done { done: true }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    #[must_use]
    pub fn raw(payload: impl Into<String>) -> Self {
        Self::Raw {
            raw: payload.into(),
        }
    }

    /// Convert to an SSE event carrying the JSON frame.
    #[cfg(feature = "http")]
    #[must_use]
    pub fn to_sse_event(&self) -> axum::response::sse::Event {
        let event = axum::response::sse::Event::default();
        match serde_json::to_string(self) {
            Ok(json) => event.data(json),
            Err(e) => {
                tracing::error!("Failed to serialize frame: {e}");
                event.data(r#"{"error":"Internal error"}"#)
            }
        }
    }
}
