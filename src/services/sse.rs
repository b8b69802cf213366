//! Incremental parser for the upstream's Server-Sent Events body.
//!
//! Bytes are buffered until a blank line closes an event, so events split
//! across network chunks (including in the middle of a UTF-8 sequence) are
//! reassembled before decoding.

/// SSE event parsed from stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: Option<String>,
}

/// SSE parser state.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse incoming bytes and return complete events.
    pub fn parse(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = vec![];
        while let Some((end, sep_len)) = find_event_boundary(&self.buffer) {
            let block: Vec<u8> = self.buffer.drain(..end + sep_len).take(end).collect();
            if let Some(event) = parse_block(&String::from_utf8_lossy(&block)) {
                events.push(event);
            }
        }
        events
    }

    /// Parse whatever is left once the body has ended without a final blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if self.buffer.is_empty() {
            return None;
        }
        let block = std::mem::take(&mut self.buffer);
        parse_block(&String::from_utf8_lossy(&block))
    }
}

/// Locate the first blank line. Returns (block length, separator length).
fn find_event_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|p| (p, 2));
    let crlf = buffer
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|p| (p, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut event = SseEvent::default();

    for line in block.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() || line.starts_with(':') {
            continue;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event.event = Some(value.to_string()),
            "data" => match event.data {
                Some(ref mut data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => event.data = Some(value.to_string()),
            },
            _ => {}
        }
    }

    if event.data.is_some() || event.event.is_some() {
        Some(event)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_parser_simple() {
        let mut parser = SseParser::new();
        let events = parser.parse(b"data: hello\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, Some("hello".to_string()));
    }

    #[test]
    fn test_sse_parser_multiline_data() {
        let mut parser = SseParser::new();
        let events = parser.parse(b"data: line1\ndata: line2\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, Some("line1\nline2".to_string()));
    }

    #[test]
    fn test_sse_parser_multiple_events() {
        let mut parser = SseParser::new();
        let events = parser.parse(b"data: first\n\ndata: second\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, Some("first".to_string()));
        assert_eq!(events[1].data, Some("second".to_string()));
    }

    #[test]
    fn test_sse_parser_partial() {
        let mut parser = SseParser::new();
        assert!(parser.parse(b"data: hel").is_empty());

        let events = parser.parse(b"lo\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, Some("hello".to_string()));
    }

    #[test]
    fn test_sse_parser_split_utf8() {
        let mut parser = SseParser::new();
        let bytes = "data: héllo\n\n".as_bytes();
        // Split inside the two-byte 'é'
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;

        assert!(parser.parse(&bytes[..split]).is_empty());
        let events = parser.parse(&bytes[split..]);
        assert_eq!(events[0].data, Some("héllo".to_string()));
    }

    #[test]
    fn test_sse_parser_crlf() {
        let mut parser = SseParser::new();
        let events = parser.parse(b"event: message\r\ndata: hi\r\n\r\ndata: there\r\n\r\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, Some("message".to_string()));
        assert_eq!(events[0].data, Some("hi".to_string()));
        assert_eq!(events[1].data, Some("there".to_string()));
    }

    #[test]
    fn test_sse_parser_comment() {
        let mut parser = SseParser::new();
        let events = parser.parse(b": keep-alive\n\n: comment\ndata: hello\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, Some("hello".to_string()));
    }

    #[test]
    fn test_sse_parser_finish() {
        let mut parser = SseParser::new();
        assert!(parser.parse(b"data: [DONE]").is_empty());
        let event = parser.finish().unwrap();
        assert_eq!(event.data, Some("[DONE]".to_string()));
        assert!(parser.finish().is_none());
    }
}
