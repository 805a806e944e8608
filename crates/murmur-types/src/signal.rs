//! Canonical signal encoding.
//!
//! A signal is packed into a fixed 32-byte field: payload bytes first
//! (left-aligned, big-endian order as written), zero padding after. The last
//! byte is always zero, so at most [`MAX_SIGNAL_BYTES`] payload bytes fit.
//! Payloads may not contain a zero byte, so decoding recovers them exactly.
//! The prover, the verifier and anything that displays an accepted signal
//! must use this exact encoding.

use crate::{MAX_SIGNAL_BYTES, SIGNAL_FIELD_BYTES};

/// A signal packed into its fixed-width field.
pub type EncodedSignal = [u8; SIGNAL_FIELD_BYTES];

/// Errors from encoding or decoding a signal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignalEncodingError {
    /// Payload does not fit in the field.
    #[error("signal is {len} bytes, maximum is {max}")]
    TooLong { len: usize, max: usize },

    /// Payload contains a zero byte, which would end it early on decode.
    #[error("signal contains a NUL byte at offset {0}")]
    ContainsNul(usize),

    /// Field has no zero terminator.
    #[error("encoded signal is not zero-terminated")]
    Unterminated,

    /// Payload is not valid UTF-8 text.
    #[error("encoded signal is not valid UTF-8")]
    InvalidUtf8,
}

/// Pack a payload into the fixed-width signal field.
pub fn encode(payload: &[u8]) -> Result<EncodedSignal, SignalEncodingError> {
    if payload.len() > MAX_SIGNAL_BYTES {
        return Err(SignalEncodingError::TooLong {
            len: payload.len(),
            max: MAX_SIGNAL_BYTES,
        });
    }
    if let Some(offset) = payload.iter().position(|&b| b == 0) {
        return Err(SignalEncodingError::ContainsNul(offset));
    }
    let mut field = [0u8; SIGNAL_FIELD_BYTES];
    field[..payload.len()].copy_from_slice(payload);
    Ok(field)
}

/// Recover the text of an encoded signal.
///
/// The payload ends at the first zero byte.
pub fn decode(field: &EncodedSignal) -> Result<String, SignalEncodingError> {
    let end = field
        .iter()
        .position(|&b| b == 0)
        .ok_or(SignalEncodingError::Unterminated)?;
    String::from_utf8(field[..end].to_vec()).map_err(|_| SignalEncodingError::InvalidUtf8)
}
