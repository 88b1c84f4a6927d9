//! Wire codec for the shared plugin output stream.
//!
//! A leveled line is `STX <code> ETX <message>`: byte 0 is 0x01, byte 1 a
//! registered level code, byte 2 is 0x02, the rest is the UTF-8 message.
//! Anything else — including lookalike headers with an unregistered code —
//! is plain output and must pass through untouched.

use crate::level::LogLevel;

/// Start-of-header byte.
pub const STX: u8 = 0x01;
/// End-of-header byte.
pub const ETX: u8 = 0x02;

/// One decoded line of plugin output.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLine {
    /// The recognized level, or `None` for plain output.
    pub level: Option<LogLevel>,
    /// Trimmed message when a header was recognized, the raw line otherwise.
    pub payload: String,
}

/// Decode one line of plugin output.
pub fn decode_line(raw: &str) -> DecodedLine {
    let bytes = raw.as_bytes();
    if bytes.len() >= 4 && bytes[0] == STX && bytes[2] == ETX {
        if let Some(level) = LogLevel::from_code(bytes[1] as char) {
            return DecodedLine {
                level: Some(level),
                payload: raw[3..].trim().to_string(),
            };
        }
    }
    DecodedLine {
        level: None,
        payload: raw.to_string(),
    }
}

/// Encode a message with the level's wire header.
///
/// Returns `None` for [`LogLevel::None`], which has no wire representation.
pub fn encode_line(level: LogLevel, message: &str) -> Option<String> {
    let code = level.code()?;
    Some(format!(
        "{}{}{}{}",
        STX as char, code, ETX as char, message
    ))
}
