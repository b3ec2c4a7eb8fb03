//! Line framing
//!
//! Turns the inbound byte stream into trimmed, newline-terminated lines. The
//! event sequence depends only on the concatenated input, never on how it was
//! split into chunks.
//!
//! Over-long lines are rejected as a single [`FrameEvent::Overflow`]. If the
//! unterminated residue grows past `max_line_bytes` it is dropped and input is
//! skipped up to the next terminator; a complete line longer than the bound is
//! rejected the same way, so it makes no difference whether it arrived whole.

use bytes::BytesMut;

/// Line terminator
pub const TERMINATOR: u8 = b'\n';

/// Output of [`LineFramer::feed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// A complete, trimmed, non-empty line
    Line(String),
    /// A line exceeded the configured bound and was discarded
    Overflow,
}

/// Accumulates raw bytes and yields complete lines
#[derive(Debug)]
pub struct LineFramer {
    buf: BytesMut,
    max_line_bytes: usize,
    /// Discarding the remainder of an over-long line
    skipping: bool,
}

impl LineFramer {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(max_line_bytes.min(8192)),
            max_line_bytes,
            skipping: false,
        }
    }

    /// Append `bytes` and extract every complete line
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<FrameEvent> {
        let mut events = Vec::new();
        self.buf.extend_from_slice(bytes);

        while let Some(pos) = self.buf.iter().position(|b| *b == TERMINATOR) {
            let raw = self.buf.split_to(pos + 1);
            if self.skipping {
                // Tail of a line already reported as overflow
                self.skipping = false;
                continue;
            }
            let body = &raw[..pos];
            if body.len() > self.max_line_bytes {
                events.push(FrameEvent::Overflow);
                continue;
            }
            let line = String::from_utf8_lossy(body);
            let line = line.trim();
            if !line.is_empty() {
                events.push(FrameEvent::Line(line.to_string()));
            }
        }

        if self.skipping {
            self.buf.clear();
        } else if self.buf.len() > self.max_line_bytes {
            self.buf.clear();
            self.skipping = true;
            events.push(FrameEvent::Overflow);
        }

        events
    }

    /// Drop any partial line and leave skip mode
    pub fn reset(&mut self) {
        self.buf.clear();
        self.skipping = false;
    }

    /// Bytes held for an incomplete line
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    pub fn max_line_bytes(&self) -> usize {
        self.max_line_bytes
    }
}
