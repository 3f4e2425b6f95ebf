//! Incremental parser for the upstream event stream.
//!
//! Bytes arrive in arbitrary chunks. A multi-byte character may straddle two
//! chunks and a frame may span many. The parser only hands out a frame once
//! its blank-line terminator has been seen.

/// Marker prefixing the payload of a frame.
const DATA_MARKER: &str = "data:";

/// Longest separator minus one: how far a separator can reach back into
/// text that was already scanned.
const SEPARATOR_OVERLAP: usize = 3;

/// Incremental `data:` frame parser.
#[derive(Debug, Default)]
pub struct FrameParser {
    /// Undecoded bytes of an incomplete UTF-8 sequence.
    carry: Vec<u8>,
    /// Decoded text not yet terminated by a blank line.
    buffer: String,
    /// Offset in `buffer` before which no separator starts.
    scanned: usize,
}

impl FrameParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the payloads of every frame it completed.
    ///
    /// Frames without a `data:` marker are skipped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.decode(chunk);

        let mut payloads = Vec::new();
        let mut from = self.scanned;
        while let Some((pos, sep_len)) = find_separator(&self.buffer, from) {
            if let Some(payload) = data_payload(&self.buffer[..pos]) {
                payloads.push(payload.to_string());
            }
            self.buffer.drain(..pos + sep_len);
            from = 0;
        }
        self.scanned = self.buffer.len().saturating_sub(SEPARATOR_OVERLAP);
        payloads
    }

    /// Discard any unterminated input, returning it if non-blank.
    pub fn finish(&mut self) -> Option<String> {
        self.carry.clear();
        self.scanned = 0;
        let rest = std::mem::take(&mut self.buffer);
        let rest = rest.trim();
        (!rest.is_empty()).then(|| rest.to_string())
    }

    /// Bytes held back waiting for more input.
    #[cfg(test)]
    fn pending(&self) -> usize {
        self.carry.len() + self.buffer.len()
    }

    fn decode(&mut self, chunk: &[u8]) {
        self.carry.extend_from_slice(chunk);

        let mut input = self.carry.as_slice();
        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    input = &[];
                    break;
                }
                Err(e) => {
                    let (valid, rest) = input.split_at(e.valid_up_to());
                    // `valid` is well-formed by construction.
                    self.buffer
                        .push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[len..];
                        }
                        // Incomplete sequence at the end: wait for the next chunk.
                        None => {
                            input = rest;
                            break;
                        }
                    }
                }
            }
        }

        let consumed = self.carry.len() - input.len();
        self.carry.drain(..consumed);
    }
}

/// Payload of a frame, if it is a `data:` frame.
#[must_use]
pub fn data_payload(frame: &str) -> Option<&str> {
    frame.trim().strip_prefix(DATA_MARKER).map(str::trim)
}

/// Position and length of the earliest blank-line separator at or after
/// byte offset `from`.
fn find_separator(buffer: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = buffer.as_bytes();
    (from..bytes.len()).find_map(|pos| {
        let rest = &bytes[pos..];
        if rest.starts_with(b"\n\n") {
            Some((pos, 2))
        } else if rest.starts_with(b"\r\n\r\n") {
            Some((pos, 4))
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_payload() {
        assert_eq!(data_payload("data: {\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(data_payload("  data:[DONE]  "), Some("[DONE]"));
        assert_eq!(data_payload(": keep-alive"), None);
        assert_eq!(data_payload("event: ping"), None);
    }

    #[test]
    fn test_single_chunk_many_frames() {
        let mut parser = FrameParser::new();
        let frames = parser.push(b"data: one\n\n: comment\n\ndata: two\n\ndata: [DONE]\n\n");
        assert_eq!(frames, vec!["one", "two", "[DONE]"]);
        assert_eq!(parser.pending(), 0);
    }

    #[test]
    fn test_frame_held_until_terminated() {
        let mut parser = FrameParser::new();
        assert!(parser.push(b"data: par").is_empty());
        assert!(parser.push(b"tial\n").is_empty());
        assert_eq!(parser.push(b"\ndata: next"), vec!["partial"]);
        assert_eq!(parser.finish().as_deref(), Some("data: next"));
        assert_eq!(parser.pending(), 0);
    }

    #[test]
    fn test_crlf_separators() {
        let mut parser = FrameParser::new();
        let frames = parser.push(b"data: a\r\n\r\ndata: b\r\n\r");
        assert_eq!(frames, vec!["a"]);
        assert_eq!(parser.push(b"\n"), vec!["b"]);
    }

    #[test]
    fn test_split_multibyte_character() {
        let text = "data: مرحبا\n\n".as_bytes();
        // Split inside the first two-byte letter.
        let split = "data: ".len() + 1;

        let mut parser = FrameParser::new();
        assert!(parser.push(&text[..split]).is_empty());
        assert_eq!(parser.push(&text[split..]), vec!["مرحبا"]);
    }

    #[test]
    fn test_invalid_bytes_are_replaced() {
        let mut parser = FrameParser::new();
        let frames = parser.push(b"data: a\xffb\n\n");
        assert_eq!(frames, vec!["a\u{FFFD}b"]);
    }

    #[test]
    fn test_byte_at_a_time_resumes_scan() {
        let input = "data: first\r\n\r\ndata: سلام\n\n: ping\n\ndata: last\r\n\r\n".as_bytes();

        let mut parser = FrameParser::new();
        let mut frames = Vec::new();
        for byte in input {
            frames.extend(parser.push(std::slice::from_ref(byte)));
            assert!(parser.scanned <= parser.buffer.len());
        }
        assert_eq!(frames, vec!["first", "سلام", "last"]);
        assert_eq!(parser.pending(), 0);
    }

    #[test]
    fn test_long_frame_is_not_rescanned() {
        let mut parser = FrameParser::new();
        assert!(parser.push(b"data: ").is_empty());
        for _ in 0..1000 {
            assert!(parser.push(b"x").is_empty());
        }
        assert_eq!(parser.scanned, parser.buffer.len() - SEPARATOR_OVERLAP);

        let frames = parser.push(b"\n\n");
        assert_eq!(frames, vec!["x".repeat(1000)]);
        assert_eq!(parser.scanned, 0);
    }

    #[test]
    fn test_blank_finish() {
        let mut parser = FrameParser::new();
        parser.push(b"data: x\n\n\n");
        assert_eq!(parser.finish(), None);
    }
}
