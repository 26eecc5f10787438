//! Incremental SSE (Server-Sent Events) parser for `streamGenerateContent?alt=sse`.
//!
//! Events are separated by a blank line. Gemini terminates lines with `\r\n`, so
//! carriage returns are normalized away before framing.

/// A single parsed SSE event.
#[derive(Debug, Clone)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Buffers partial lines across network chunk boundaries.
pub struct SseParser {
    buffer: String,
    /// Set when the previous chunk ended on a lone `\r`.
    pending_cr: bool,
    /// Trailing bytes of a UTF-8 sequence cut by a chunk boundary.
    partial: Vec<u8>,
}

impl Default for SseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SseParser {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            pending_cr: false,
            partial: Vec::new(),
        }
    }

    /// Feed raw bytes from the HTTP response and return every completed event.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.partial.extend_from_slice(chunk);
        let bytes = std::mem::take(&mut self.partial);
        let text = match std::str::from_utf8(&bytes) {
            Ok(text) => text.to_string(),
            Err(e) if e.error_len().is_none() => {
                let (complete, rest) = bytes.split_at(e.valid_up_to());
                self.partial = rest.to_vec();
                String::from_utf8_lossy(complete).into_owned()
            }
            Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
        };
        for ch in text.chars() {
            if self.pending_cr {
                self.pending_cr = false;
                self.buffer.push('\n');
                if ch == '\n' {
                    continue;
                }
            }
            if ch == '\r' {
                self.pending_cr = true;
            } else {
                self.buffer.push(ch);
            }
        }

        let mut events = Vec::new();
        while let Some(boundary) = self.buffer.find("\n\n") {
            let block: String = self.buffer.drain(..boundary + 2).collect();
            if let Some(event) = parse_block(&block) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing event that was not followed by a blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if self.pending_cr {
            self.pending_cr = false;
            self.buffer.push('\n');
        }
        let block = std::mem::take(&mut self.buffer);
        parse_block(&block)
    }
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut event_type: Option<String> = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in block.lines() {
        if let Some(val) = line.strip_prefix("event:") {
            event_type = Some(val.trim().to_string());
        } else if let Some(val) = line.strip_prefix("data:") {
            data_lines.push(val.strip_prefix(' ').unwrap_or(val));
        }
        // id:, retry: and `:` comments carry nothing we use
    }

    if data_lines.is_empty() {
        return None;
    }
    Some(SseEvent {
        event: event_type,
        data: data_lines.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_sse() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: hello\n\ndata: world\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "hello");
        assert_eq!(events[1].data, "world");
    }

    #[test]
    fn test_crlf_framing() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: {\"a\":1}\r\n\r\ndata: {\"b\":2}\r\n\r\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "{\"a\":1}");
        assert_eq!(events[1].data, "{\"b\":2}");
    }

    #[test]
    fn test_crlf_split_between_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: one\r").is_empty());
        assert!(parser.feed(b"\n\r").is_empty());
        let events = parser.feed(b"\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "one");
    }

    #[test]
    fn test_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: hel").is_empty());
        let events = parser.feed(b"lo\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hello");
    }

    #[test]
    fn test_finish_flushes_unterminated_event() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"event: chunk\ndata: tail").is_empty());
        let event = parser.finish().unwrap();
        assert_eq!(event.event.as_deref(), Some("chunk"));
        assert_eq!(event.data, "tail");
        assert!(parser.finish().is_none());
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        let mut parser = SseParser::new();
        let bytes = "data: ☕\n\n".as_bytes();
        // the coffee cup is three bytes starting at offset 6
        assert!(parser.feed(&bytes[..7]).is_empty());
        let events = parser.feed(&bytes[7..]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "☕");
    }

    #[test]
    fn test_comments_are_ignored() {
        let mut parser = SseParser::new();
        let events = parser.feed(b": keepalive\n\ndata: x\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "x");
    }
}
