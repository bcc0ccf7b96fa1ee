//! Wire-level constants and response classification.
//!
//! Responses are arbitrary text terminated by `' '` then byte 0x08; error
//! payloads carry a fixed `!!! ` prefix in front of the message text.

use crate::core::error::CoreError;

/// Second byte of the response terminator (ASCII backspace).
pub const RESPONSE_END: u8 = 0x08;

/// First byte of the response terminator, dropped from the payload.
pub const RESPONSE_END_PAD: u8 = b' ';

/// Prefix marking a backend-reported failure.
pub const ERROR_PREFIX: &str = "!!! ";

/// Splits a received payload into success text or a backend error.
pub fn classify(payload: String) -> Result<String, CoreError> {
    match payload.strip_prefix(ERROR_PREFIX) {
        Some(message) => Err(CoreError::Backend(message.to_string())),
        None => Ok(payload),
    }
}

/// Removes embedded literal `\n` escape sequences (backslash then 'n')
/// from identifiers the backend returns.
pub fn chomp(value: &str) -> String {
    value.replace("\\n", "")
}
