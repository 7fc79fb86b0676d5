//! Line protocol for the physical telemetry source
//!
//! The wire format is ASCII, one sample per newline-terminated line, exactly
//! six comma-separated fields in fixed order:
//!
//! ```text
//! time, error, output, kp, ki, kd
//! ```
//!
//! Each field is a 32-bit float. There is no header line, no framing beyond
//! newlines, and no checksum.
//!
//! # Parsing Policy
//!
//! - A line with a token count other than six is discarded whole and a
//!   diagnostic is logged. Nothing is emitted for it.
//! - A single unparseable token does not discard the line: the field is
//!   zeroed, the offending token is logged, and the sample is still emitted.
//!   The substitution is counted in [`SourceStats::tokens_zeroed`] so data
//!   corruption stays visible to operators.
//!
//! [`LineFramer`] handles transport-level fragmentation: bytes arrive in
//! arbitrary chunks, and fragments are buffered until a line boundary is
//! observed.
//!
//! [`SourceStats::tokens_zeroed`]: crate::types::SourceStats

use crate::types::{SourceStats, StatusMessage};
use thiserror::Error;

/// Number of comma-separated fields in a well-formed line
pub const TOKENS_PER_LINE: usize = 6;

/// Errors from the line protocol
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The line did not split into exactly six tokens
    #[error("token count is incomplete: expected {TOKENS_PER_LINE} tokens, got {found}")]
    TokenCount { found: usize },
}

/// Parse one complete protocol line into a status sample.
///
/// Returns `Err` only for a wrong token count; individual unparseable tokens
/// are zeroed per the lenient policy documented at module level. Counters for
/// both outcomes are recorded on `stats`.
pub fn parse_status_line(
    line: &str,
    stats: &SourceStats,
) -> std::result::Result<StatusMessage, ProtocolError> {
    let tokens: Vec<&str> = line.split(',').collect();
    if tokens.len() != TOKENS_PER_LINE {
        stats.record_line_discarded();
        return Err(ProtocolError::TokenCount {
            found: tokens.len(),
        });
    }

    let mut values = [0f32; TOKENS_PER_LINE];
    for (index, token) in tokens.iter().enumerate() {
        match token.trim().parse::<f32>() {
            Ok(value) => values[index] = value,
            Err(e) => {
                tracing::warn!(token = %token, index, error = %e, "failed to parse token, zeroing field");
                stats.record_token_zeroed();
            }
        }
    }

    stats.record_line_parsed();
    Ok(StatusMessage::normal(
        values[0], values[1], values[2], values[3], values[4], values[5],
    ))
}

/// Reassembles newline-delimited lines from arbitrary byte chunks.
///
/// Fragments of a longer line are buffered and not surfaced until the line
/// boundary arrives. A trailing `\r` is stripped so CRLF peers work too.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: Vec<u8>,
}

impl LineFramer {
    /// Create an empty framer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of raw bytes, returning every complete line it closed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            if byte == b'\n' {
                let mut raw = std::mem::take(&mut self.buf);
                if raw.last() == Some(&b'\r') {
                    raw.pop();
                }
                lines.push(String::from_utf8_lossy(&raw).into_owned());
            } else {
                self.buf.push(byte);
            }
        }
        lines
    }

    /// Number of buffered bytes awaiting a line boundary.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::STATUS_NORMAL;
    use proptest::prelude::*;

    #[test]
    fn test_well_formed_line() {
        let stats = SourceStats::new();
        let msg = parse_status_line("1.5,0.2,0.9,2.0,0.1,0.05", &stats).unwrap();
        assert_eq!(msg.time, 1.5);
        assert_eq!(msg.error, 0.2);
        assert_eq!(msg.output, 0.9);
        assert_eq!(msg.kp, 2.0);
        assert_eq!(msg.ki, 0.1);
        assert_eq!(msg.kd, 0.05);
        assert_eq!(msg.status, STATUS_NORMAL);
        assert_eq!(stats.snapshot().lines_parsed, 1);
    }

    #[test]
    fn test_five_tokens_discarded() {
        let stats = SourceStats::new();
        let err = parse_status_line("1.5,0.2,0.9,2.0,0.1", &stats).unwrap_err();
        assert_eq!(err, ProtocolError::TokenCount { found: 5 });
        let snap = stats.snapshot();
        assert_eq!(snap.lines_parsed, 0);
        assert_eq!(snap.lines_discarded, 1);
    }

    #[test]
    fn test_seven_tokens_discarded() {
        let stats = SourceStats::new();
        let err = parse_status_line("1,2,3,4,5,6,7", &stats).unwrap_err();
        assert_eq!(err, ProtocolError::TokenCount { found: 7 });
    }

    #[test]
    fn test_empty_line_discarded() {
        let stats = SourceStats::new();
        let err = parse_status_line("", &stats).unwrap_err();
        assert_eq!(err, ProtocolError::TokenCount { found: 1 });
    }

    #[test]
    fn test_bad_token_zeroed() {
        let stats = SourceStats::new();
        let msg = parse_status_line("1.5,bad,0.9,2.0,0.1,0.05", &stats).unwrap();
        assert_eq!(msg.time, 1.5);
        assert_eq!(msg.error, 0.0);
        assert_eq!(msg.output, 0.9);
        assert_eq!(msg.kp, 2.0);
        assert_eq!(msg.ki, 0.1);
        assert_eq!(msg.kd, 0.05);
        assert_eq!(stats.snapshot().tokens_zeroed, 1);
        assert_eq!(stats.snapshot().lines_parsed, 1);
    }

    #[test]
    fn test_framer_whole_line() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"1,2,3,4,5,6\n");
        assert_eq!(lines, vec!["1,2,3,4,5,6".to_string()]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_framer_buffers_fragments() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"1.5,0.2,").is_empty());
        assert!(framer.push(b"0.9,2.0").is_empty());
        assert_eq!(framer.pending(), 15);
        let lines = framer.push(b",0.1,0.05\ntrail");
        assert_eq!(lines, vec!["1.5,0.2,0.9,2.0,0.1,0.05".to_string()]);
        assert_eq!(framer.pending(), 5);
    }

    #[test]
    fn test_framer_crlf() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"1,2,3,4,5,6\r\n7,8,9,10,11,12\r\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "1,2,3,4,5,6");
        assert_eq!(lines[1], "7,8,9,10,11,12");
    }

    #[test]
    fn test_framer_multiple_lines_in_one_chunk() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"a\nb\nc");
        assert_eq!(lines, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(framer.pending(), 1);
    }

    proptest! {
        #[test]
        fn prop_well_formed_lines_parse(
            time in -1.0e6f32..1.0e6,
            error in -1.0e6f32..1.0e6,
            output in -1.0e6f32..1.0e6,
            kp in -1.0e6f32..1.0e6,
            ki in -1.0e6f32..1.0e6,
            kd in -1.0e6f32..1.0e6,
        ) {
            let line = format!("{},{},{},{},{},{}", time, error, output, kp, ki, kd);
            let stats = SourceStats::new();
            let msg = parse_status_line(&line, &stats).unwrap();
            prop_assert_eq!(msg.time, time);
            prop_assert_eq!(msg.error, error);
            prop_assert_eq!(msg.output, output);
            prop_assert_eq!(msg.kp, kp);
            prop_assert_eq!(msg.ki, ki);
            prop_assert_eq!(msg.kd, kd);
            prop_assert_eq!(msg.status.as_str(), STATUS_NORMAL);
        }

        #[test]
        fn prop_framer_never_loses_bytes(chunks in proptest::collection::vec(
            proptest::collection::vec(any::<u8>(), 0..64), 0..16)
        ) {
            let mut framer = LineFramer::new();
            let total: usize = chunks.iter().map(|c| c.len()).sum();
            let mut newlines = 0usize;
            let mut emitted = 0usize;
            for chunk in &chunks {
                newlines += chunk.iter().filter(|&&b| b == b'\n').count();
                emitted += framer.push(chunk).len();
            }
            prop_assert_eq!(emitted, newlines);
            // Every byte is either consumed by a line or still pending
            prop_assert!(framer.pending() <= total);
        }
    }
}
