/// Errors from parsing or constructing primitive identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("invalid hex length: {actual} (expected {expected})")]
    InvalidLength { expected: usize, actual: usize },
    #[error("invalid hex character")]
    InvalidHex,
    #[error("missing 0x prefix")]
    MissingPrefix,
    #[error("unknown permission: {0}")]
    UnknownPermission(String),
}

// Lengths are checked before decoding, so any decoder error is a bad digit.
impl From<hex::FromHexError> for TypeError {
    fn from(_: hex::FromHexError) -> Self {
        TypeError::InvalidHex
    }
}

/// Decode a fixed-width hex string (no prefix) into `N` bytes.
pub(crate) fn decode_hex<const N: usize>(digits: &str) -> Result<[u8; N], TypeError> {
    if digits.len() != N * 2 {
        return Err(TypeError::InvalidLength {
            expected: N * 2,
            actual: digits.len(),
        });
    }
    let mut bytes = [0u8; N];
    hex::decode_to_slice(digits, &mut bytes)?;
    Ok(bytes)
}

pub(crate) fn encode_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_wrong_length() {
        let err = decode_hex::<2>("abc").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn decode_rejects_non_hex() {
        assert_eq!(decode_hex::<1>("zz").unwrap_err(), TypeError::InvalidHex);
    }

    #[test]
    fn decode_rejects_multibyte_characters() {
        // 'é' is two bytes, so the byte length still matches.
        assert_eq!(decode_hex::<2>("0é00").unwrap_err(), TypeError::InvalidHex);
        assert_eq!(decode_hex::<1>("é").unwrap_err(), TypeError::InvalidHex);
    }

    #[test]
    fn encode_decode() {
        let bytes = decode_hex::<3>("00ff10").unwrap();
        assert_eq!(bytes, [0x00, 0xff, 0x10]);
        assert_eq!(encode_hex(&bytes), "00ff10");
    }
}
