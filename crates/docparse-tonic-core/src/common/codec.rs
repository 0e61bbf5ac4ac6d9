//! Transport codec for raw document bytes.
//!
//! Document payloads travel inside the wire request as text, so both
//! sides share one deterministic, reversible encoding. The standard
//! base64 alphabet is used; `decode(encode(b)) == b` holds for every
//! byte sequence, including the empty one.

use crate::common::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Encodes raw document bytes into their transport representation.
///
/// Total function: every input, including empty, has an encoding.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes a transport payload back into raw document bytes.
///
/// # Errors
///
/// Returns [`Error::Decode`] when the input is not valid base64.
pub fn decode(text: &str) -> Result<Vec<u8>> {
    STANDARD.decode(text).map_err(|e| Error::Decode {
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_bytes() {
        let all_bytes: Vec<u8> = (0..=255).collect();
        assert_eq!(decode(&encode(&all_bytes)).unwrap(), all_bytes);

        let pdf_header = b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n";
        assert_eq!(decode(&encode(pdf_header)).unwrap(), pdf_header);
    }

    #[test]
    fn round_trips_empty_input() {
        assert_eq!(encode(b""), "");
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn rejects_malformed_input() {
        let err = decode("this is not base64!!").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }
}
