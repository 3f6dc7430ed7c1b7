//! Base64 transcoding for typed numeric buffers.
//!
//! Every typed array that crosses a JSON transport (element codes, bond
//! index pairs, coordinates, lattice vectors) travels as standard padded
//! base64 over its little-endian byte view. This module knows nothing about
//! what the numbers mean; [`document`] layers the wire shapes on top.

pub mod document;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::CodecError;

/// Encode raw bytes as standard base64 text.
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard base64 text back into the original bytes.
///
/// # Errors
///
/// Returns [`CodecError::InvalidText`] for text outside the alphabet or with
/// bad padding.
pub fn decode(text: &str) -> Result<Vec<u8>, CodecError> {
    STANDARD
        .decode(text.trim())
        .map_err(|e| CodecError::InvalidText(e.to_string()))
}

/// Fail unless `len` is a whole number of `width`-byte elements.
fn check_width(len: usize, width: usize) -> Result<(), CodecError> {
    if len % width == 0 {
        Ok(())
    } else {
        Err(CodecError::MisalignedLength { len, width })
    }
}

/// Encode unsigned 8-bit values (element codes).
#[must_use]
pub fn encode_u8(values: &[u8]) -> String {
    encode(values)
}

/// Encode unsigned 32-bit values (bond indices) as little-endian bytes.
#[must_use]
pub fn encode_u32(values: &[u32]) -> String {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    encode(&bytes)
}

/// Encode 32-bit floats (coordinates, lattice vectors) as little-endian
/// bytes.
#[must_use]
pub fn encode_f32(values: &[f32]) -> String {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    encode(&bytes)
}

/// Decode text into unsigned 8-bit values.
///
/// # Errors
///
/// Returns [`CodecError::InvalidText`] for malformed base64.
pub fn decode_u8(text: &str) -> Result<Vec<u8>, CodecError> {
    decode(text)
}

/// Decode text into little-endian unsigned 32-bit values.
///
/// # Errors
///
/// Returns [`CodecError::MisalignedLength`] when the byte count is not a
/// multiple of four, or [`CodecError::InvalidText`] for malformed base64.
pub fn decode_u32(text: &str) -> Result<Vec<u32>, CodecError> {
    let bytes = decode(text)?;
    check_width(bytes.len(), 4)?;
    Ok(bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Decode text into little-endian 32-bit floats.
///
/// # Errors
///
/// Returns [`CodecError::MisalignedLength`] when the byte count is not a
/// multiple of four, or [`CodecError::InvalidText`] for malformed base64.
pub fn decode_f32(text: &str) -> Result<Vec<f32>, CodecError> {
    let bytes = decode(text)?;
    check_width(bytes.len(), 4)?;
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_single_byte_round_trip() {
        assert_eq!(encode(&[]), "");
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());

        let one = [0xA7u8];
        assert_eq!(decode(&encode(&one)).unwrap(), one);
    }

    #[test]
    fn arbitrary_bytes_round_trip() {
        let bytes: Vec<u8> = (0..=255u8).chain((0..37).map(|i| i * 7)).collect();
        for len in [0, 1, 2, 3, 5, 63, 64, 65, bytes.len()] {
            let slice = &bytes[..len];
            assert_eq!(decode(&encode(slice)).unwrap(), slice, "len {len}");
        }
    }

    #[test]
    fn misaligned_length_is_rejected() {
        // Five bytes cannot be reinterpreted as 32-bit values.
        let text = encode(&[1, 2, 3, 4, 5]);
        assert_eq!(
            decode_u32(&text),
            Err(CodecError::MisalignedLength { len: 5, width: 4 })
        );
        assert_eq!(
            decode_f32(&encode(&[0])),
            Err(CodecError::MisalignedLength { len: 1, width: 4 })
        );
        // Any length is valid for byte-width elements.
        assert_eq!(decode_u8(&text).unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn typed_values_are_little_endian() {
        let text = encode_u32(&[1, 0x0102_0304]);
        assert_eq!(decode(&text).unwrap(), vec![1, 0, 0, 0, 4, 3, 2, 1]);
        assert_eq!(decode_u32(&text).unwrap(), vec![1, 0x0102_0304]);

        let floats = [0.0f32, -1.5, 1.0e-3, f32::MAX];
        assert_eq!(decode_f32(&encode_f32(&floats)).unwrap(), floats);
    }

    #[test]
    fn matches_python_array_encoding() {
        // `b64encode(array("f", [1.0]))` on a little-endian host.
        assert_eq!(encode_f32(&[1.0]), "AACAPw==");
        assert_eq!(decode_f32("AACAPw==").unwrap(), vec![1.0]);
    }

    #[test]
    fn invalid_text_is_rejected() {
        assert!(matches!(decode("not base64!"), Err(CodecError::InvalidText(_))));
    }
}
