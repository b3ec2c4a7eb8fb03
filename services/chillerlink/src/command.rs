//! Outbound command encoding
//!
//! A command is one line of printable ASCII terminated by `\n`. The encoder
//! never fails: input that leaves nothing to send is a no-op.

/// Terminator appended to every command
pub const COMMAND_TERMINATOR: u8 = b'\n';

/// Turns operator text into wire bytes
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandEncoder;

impl CommandEncoder {
    /// Encode `raw` for transmission
    ///
    /// Surrounding whitespace is trimmed and characters outside printable
    /// ASCII (0x20..=0x7E) are dropped. Returns `None` when nothing remains.
    pub fn encode(raw: &str) -> Option<Vec<u8>> {
        let filtered: String = raw.trim().chars().filter(is_printable_ascii).collect();
        let command = filtered.trim();
        if command.is_empty() {
            return None;
        }

        let mut bytes = Vec::with_capacity(command.len() + 1);
        bytes.extend_from_slice(command.as_bytes());
        bytes.push(COMMAND_TERMINATOR);
        Some(bytes)
    }
}

fn is_printable_ascii(c: &char) -> bool {
    matches!(*c, ' '..='~')
}
