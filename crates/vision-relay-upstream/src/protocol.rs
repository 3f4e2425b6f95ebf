//! OpenAI-compatible chat-completions wire types.

use serde::Serialize;
use serde_json::Value;
use vision_relay_core::Turn;

/// Sampling temperature used for every request.
pub const TEMPERATURE: f64 = 0.7;

/// Literal payload marking the end of the upstream stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Body of `POST {base}/chat/completions`.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Turn],
    pub stream: bool,
    pub temperature: f64,
}

impl<'a> ChatCompletionRequest<'a> {
    /// Streaming request over the full conversation log.
    #[must_use]
    pub const fn streaming(model: &'a str, messages: &'a [Turn]) -> Self {
        Self {
            model,
            messages,
            stream: true,
            temperature: TEMPERATURE,
        }
    }
}

/// Text token carried by one streamed event.
///
/// Prefers `choices[0].delta.content`, then `choices[0].message.content`.
/// Missing, null or non-string content yields an empty token.
#[must_use]
pub fn delta_token(event: &Value) -> &str {
    event
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .or_else(|| {
            event
                .pointer("/choices/0/message/content")
                .and_then(Value::as_str)
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vision_relay_core::ContentPart;

    #[test]
    fn test_request_body() {
        let messages = vec![
            Turn::user(vec![ContentPart::text("look")]),
            Turn::assistant("seen"),
        ];
        let body = serde_json::to_value(ChatCompletionRequest::streaming("m", &messages)).unwrap();

        assert_eq!(
            body,
            json!({
                "model": "m",
                "messages": [
                    { "role": "user", "content": [{ "type": "text", "text": "look" }] },
                    { "role": "assistant", "content": "seen" }
                ],
                "stream": true,
                "temperature": 0.7
            })
        );
    }

    #[test]
    fn test_delta_preferred() {
        let event = json!({
            "choices": [{ "delta": { "content": "d" }, "message": { "content": "m" } }]
        });
        assert_eq!(delta_token(&event), "d");
    }

    #[test]
    fn test_message_fallback() {
        let event = json!({ "choices": [{ "message": { "content": "whole" } }] });
        assert_eq!(delta_token(&event), "whole");

        let event = json!({ "choices": [{ "delta": { "content": null }, "message": { "content": "m" } }] });
        assert_eq!(delta_token(&event), "m");
    }

    #[test]
    fn test_missing_content_is_empty() {
        assert_eq!(delta_token(&json!({ "choices": [{ "delta": { "role": "assistant" } }] })), "");
        assert_eq!(delta_token(&json!({ "choices": [] })), "");
        assert_eq!(delta_token(&json!(42)), "");
        assert_eq!(delta_token(&json!(null)), "");
    }
}
