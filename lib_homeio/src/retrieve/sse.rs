//! Incremental framing for `text/event-stream` bodies.
//!
//! The backend's change stream delivers one JSON scalar per event in the
//! `data:` field. This parser only frames events out of the byte stream;
//! decoding the payload stays with the caller. Events arrive split across
//! arbitrary chunk boundaries, so the parser keeps a rolling buffer.

use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct SseParser {
    buf: String,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one received chunk and returns the `data` payloads of every
    /// event completed by it, in arrival order.
    ///
    /// Carriage returns are stripped, `event:`/`id:`/`retry:` fields and
    /// comment lines are ignored, and multiple `data:` lines within one
    /// event are joined with a newline, per the event-stream format.
    pub fn push(&mut self, chunk: &[u8]) -> VecDeque<String> {
        let text = String::from_utf8_lossy(chunk);
        for c in text.chars() {
            if c != '\r' {
                self.buf.push(c);
            }
        }

        let mut out = VecDeque::new();
        while let Some(pos) = self.buf.find("\n\n") {
            let block: String = self.buf.drain(..pos + 2).collect();
            if let Some(data) = event_data(&block) {
                out.push_back(data);
            }
        }
        out
    }
}

fn event_data(block: &str) -> Option<String> {
    let mut lines: Vec<&str> = Vec::new();
    for line in block.lines() {
        if let Some(rest) = line.strip_prefix("data:") {
            lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_a_single_event() {
        let mut parser = SseParser::new();
        let events = parser.push(b"data: 1\n\n");
        assert_eq!(events, vec!["1".to_string()]);
    }

    #[test]
    fn reassembles_events_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.push(b"data: 21").is_empty());
        assert!(parser.push(b".5\n").is_empty());
        let events = parser.push(b"\ndata: 22\n\n");
        assert_eq!(events, vec!["21.5".to_string(), "22".to_string()]);
    }

    #[test]
    fn tolerates_crlf_delimiters() {
        let mut parser = SseParser::new();
        let events = parser.push(b"data: true\r\n\r\n");
        assert_eq!(events, vec!["true".to_string()]);
    }

    #[test]
    fn ignores_comments_and_other_fields() {
        let mut parser = SseParser::new();
        assert!(parser.push(b": keep-alive\n\n").is_empty());
        let events = parser.push(b"event: change\nid: 7\ndata: \"open\"\n\n");
        assert_eq!(events, vec!["\"open\"".to_string()]);
    }

    #[test]
    fn joins_multi_line_data() {
        let mut parser = SseParser::new();
        let events = parser.push(b"data: a\ndata: b\n\n");
        assert_eq!(events, vec!["a\nb".to_string()]);
    }
}
