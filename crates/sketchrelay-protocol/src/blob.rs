//! Hex encoding for drawing payloads.
//!
//! Drawings are raw image bytes, but the room store and the wire are
//! JSON documents. Bytes are stored as lowercase hexadecimal text and
//! decoded back with the inverse transform; the round trip is exact.

use crate::ProtocolError;

/// Encodes raw bytes as lowercase hex.
pub fn encode_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decodes hex text (either case) back to raw bytes.
///
/// # Errors
/// Returns [`ProtocolError::Hex`] for odd-length input or non-hex
/// characters.
pub fn decode_hex(text: &str) -> Result<Vec<u8>, ProtocolError> {
    hex::decode(text).map_err(ProtocolError::Hex)
}

/// `#[serde(with = "...")]` adapter storing `Vec<u8>` fields as hex strings.
pub(crate) mod serde_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S, T>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: AsRef<[u8]>,
    {
        serializer.serialize_str(&hex::encode(bytes.as_ref()))
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        hex::decode(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_encode_is_lowercase() {
        assert_eq!(encode_hex(&[0xAB, 0x01, 0xFF]), "ab01ff");
    }

    #[test]
    fn test_decode_accepts_uppercase() {
        assert_eq!(decode_hex("AB01FF").unwrap(), vec![0xAB, 0x01, 0xFF]);
    }

    #[test]
    fn test_empty_round_trip() {
        assert_eq!(encode_hex(&[]), "");
        assert!(decode_hex("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_odd_length() {
        assert!(matches!(decode_hex("abc"), Err(ProtocolError::Hex(_))));
    }

    #[test]
    fn test_decode_rejects_non_hex() {
        assert!(matches!(decode_hex("0g"), Err(ProtocolError::Hex(_))));
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
            prop_assert_eq!(decode_hex(&encode_hex(&bytes)).unwrap(), bytes);
        }
    }
}
