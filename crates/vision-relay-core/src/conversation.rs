//! Conversation turns exchanged with the model server.
//!
//! The serialized form of [`Turn`] is the OpenAI chat message shape, so a
//! conversation log can be sent upstream as-is.

use serde::{Deserialize, Serialize};

/// Reference to an image, usually a self-contained `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// One part of a user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text.
    Text { text: String },
    /// Image reference.
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    /// Create a text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create an image reference part.
    #[must_use]
    pub fn image(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }
}

/// One message in a conversation log.
///
/// User turns carry an ordered list of parts, assistant turns plain text.
/// Turns are never mutated once appended to a log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    User { content: Vec<ContentPart> },
    Assistant { content: String },
}

impl Turn {
    /// Create a user turn from its parts.
    #[must_use]
    pub const fn user(content: Vec<ContentPart>) -> Self {
        Self::User { content }
    }

    /// Create an assistant turn.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
        }
    }

    /// Rough payload size, used for log output only.
    #[must_use]
    pub fn approx_bytes(&self) -> usize {
        match self {
            Self::User { content } => content
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => text.len(),
                    ContentPart::ImageUrl { image_url } => image_url.url.len(),
                })
                .sum(),
            Self::Assistant { content } => content.len(),
        }
    }
}
