//! Newline index with LF/CRLF-robust diagnostic mapping.
//!
//! Goals
//! - Single pass over bytes to record '\n' positions.
//! - 1-based external line/column numbers (friendly for UX).
//! - O(log n) byte→(line, column) for diagnostic positions.
//! - Line snippets exclude the trailing '\r' of CRLF lines.
//!
//! Notes
//! - An empty buffer has 0 lines.
//! - A non-empty buffer without '\n' has 1 line.
//! - Columns count bytes from line start; good enough for ASCII-heavy
//!   student sources, and stable for tests.

#[derive(Debug, Clone)]
pub struct NewlineIndex {
    /// Byte positions of every '\n' in the buffer.
    nl_positions: Vec<usize>,
    /// Total byte length of the buffer.
    len: usize,
}

impl NewlineIndex {
    /// Build an index recording positions of '\n'.
    pub fn build(bytes: &[u8]) -> Self {
        let mut nl_positions = Vec::with_capacity(bytes.len() / 48);
        let mut i = 0usize;

        // Single pass; record every '\n' offset.
        while let Some(pos) = memchr::memchr(b'\n', &bytes[i..]) {
            let abs = i + pos;
            nl_positions.push(abs);
            i = abs + 1;
        }

        Self {
            nl_positions,
            len: bytes.len(),
        }
    }

    /// Total number of logical lines.
    /// Empty buffer => 0 lines; else (#'\n' + 1).
    pub fn line_count(&self) -> usize {
        if self.len == 0 {
            0
        } else {
            self.nl_positions.len() + 1
        }
    }

    /// 1-based (line, column) covering the given byte offset.
    /// Offsets at '\n' belong to that line's end; offsets past EOF clamp
    /// to the last position. Returns (0, 0) for empty buffers.
    pub fn line_col(&self, byte: usize) -> (usize, usize) {
        if self.len == 0 {
            return (0, 0);
        }
        let byte = byte.min(self.len);

        // Count '\n' strictly before `byte`.
        let line0 = match self.nl_positions.binary_search(&byte) {
            Ok(pos) => pos,  // sitting on a NL → still this line
            Err(pos) => pos, // number of NLs before `byte`
        };

        let line_start = if line0 == 0 {
            0
        } else {
            self.nl_positions[line0 - 1] + 1
        };

        (line0 + 1, byte - line_start + 1)
    }

    /// Start byte (inclusive) of a 1-based line.
    /// Returns None if line is out of range.
    pub fn start_byte_of_line(&self, line1: usize) -> Option<usize> {
        let total = self.line_count();
        if line1 == 0 || line1 > total {
            return None;
        }
        if line1 == 1 {
            return Some(0);
        }
        // For line L>1, start is one past the previous '\n'.
        self.nl_positions
            .get(line1 - 2)
            .map(|&prev_nl| prev_nl + 1)
    }

    /// End byte (exclusive) of a 1-based line, excluding the line
    /// terminator ('\r\n' or '\n'). Returns None if out of range.
    pub fn end_byte_of_line(&self, line1: usize, bytes: &[u8]) -> Option<usize> {
        let total = self.line_count();
        if line1 == 0 || line1 > total {
            return None;
        }

        // Lines that end with '\n' (not the last line without NL)
        if line1 <= self.nl_positions.len() {
            let nl = self.nl_positions[line1 - 1];
            // If preceding byte is '\r', exclude it.
            if nl > 0 && bytes.get(nl - 1) == Some(&b'\r') {
                return Some(nl - 1);
            }
            return Some(nl);
        }

        // Last line without trailing '\n' ends at EOF.
        Some(self.len)
    }

    /// The text of a 1-based line without its terminator.
    /// Returns None if the line is out of range.
    pub fn line_text<'a>(&self, line1: usize, content: &'a str) -> Option<&'a str> {
        let lo = self.start_byte_of_line(line1)?;
        let hi = self.end_byte_of_line(line1, content.as_bytes())?;
        content.get(lo..hi)
    }
}
