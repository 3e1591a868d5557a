//! Pure, stateless operations over byte sequences: base64, bit/int decoding
//! with configurable width and endianness (including ID3's synchsafe
//! integers), and text decoding under the four encodings ID3v2 frames use.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::TagError;

pub fn base64_decode(input: &str) -> Result<Vec<u8>, TagError> {
    STANDARD
        .decode(input)
        .map_err(|err| TagError::FormatInvalid(format!("invalid base64 payload: {err}")))
}

pub fn base64_encode(input: &[u8]) -> String {
    STANDARD.encode(input)
}

/// The 8-character big-endian binary representation of one byte.
pub fn byte_to_binary(byte: u8) -> String {
    format!("{byte:08b}")
}

/// Interprets `bytes` as an unsigned integer with `bits_per_byte` significant
/// bits per byte (7 implements the ID3 synchsafe encoding) and the given
/// byte order.
pub fn bytes_to_int(bytes: &[u8], bits_per_byte: u32, big_endian: bool) -> u64 {
    let mask: u8 = if bits_per_byte >= 8 {
        0xFF
    } else {
        ((1u16 << bits_per_byte) - 1) as u8
    };
    let mut value: u64 = 0;
    if big_endian {
        for &b in bytes {
            value = (value << bits_per_byte) | (b & mask) as u64;
        }
    } else {
        for &b in bytes.iter().rev() {
            value = (value << bits_per_byte) | (b & mask) as u64;
        }
    }
    value
}

/// The integer value of `length` contiguous bits starting at bit index
/// `start`, counted from the most significant bit.
pub fn read_bits(byte: u8, start: u32, length: u32) -> u8 {
    let shift = 8 - start - length;
    let mask = ((1u16 << length) - 1) as u8;
    (byte >> shift) & mask
}

/// Text encoding ids follow the ID3v2 convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Latin1 = 0,
    Utf16Bom = 1,
    Utf16Be = 2,
    Utf8 = 3,
}

impl TextEncoding {
    pub fn from_byte(byte: u8) -> Result<Self, TagError> {
        match byte {
            0 => Ok(TextEncoding::Latin1),
            1 => Ok(TextEncoding::Utf16Bom),
            2 => Ok(TextEncoding::Utf16Be),
            3 => Ok(TextEncoding::Utf8),
            other => Err(TagError::FormatInvalid(format!(
                "unknown text encoding byte {other}"
            ))),
        }
    }
}

/// Decodes `bytes` under `encoding`, stripping a terminating NUL (and
/// anything after it).
pub fn bytes_to_string(bytes: &[u8], encoding: TextEncoding) -> Result<String, TagError> {
    match encoding {
        TextEncoding::Latin1 => {
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            Ok(bytes[..end].iter().map(|&b| b as char).collect())
        }
        TextEncoding::Utf8 => {
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
        }
        TextEncoding::Utf16Be => decode_utf16_units(bytes, true),
        TextEncoding::Utf16Bom => {
            if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
                decode_utf16_units(&bytes[2..], true)
            } else if bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] == 0xFE {
                decode_utf16_units(&bytes[2..], false)
            } else {
                // No BOM present: fall back to little-endian rather than failing.
                decode_utf16_units(bytes, false)
            }
        }
    }
}

fn decode_utf16_units(bytes: &[u8], big_endian: bool) -> Result<String, TagError> {
    let mut units = Vec::with_capacity(bytes.len() / 2);
    for pair in bytes.chunks_exact(2) {
        let unit = if big_endian {
            u16::from_be_bytes([pair[0], pair[1]])
        } else {
            u16::from_le_bytes([pair[0], pair[1]])
        };
        if unit == 0 {
            break;
        }
        units.push(unit);
    }
    String::from_utf16(&units)
        .map_err(|err| TagError::FormatInvalid(format!("invalid utf-16 text: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_to_binary_pads_to_eight_chars() {
        assert_eq!(byte_to_binary(0), "00000000");
        assert_eq!(byte_to_binary(255), "11111111");
        assert_eq!(byte_to_binary(1), "00000001");
    }

    #[test]
    fn synchsafe_decode() {
        assert_eq!(bytes_to_int(&[0x00, 0x00, 0x02, 0x01], 7, true), 257);
    }

    #[test]
    fn bytes_to_int_endianness_and_synchsafe() {
        let bytes = [0xD0, 0x6F, 0x98];
        assert_eq!(bytes_to_int(&bytes, 8, true), 13_660_056);
        assert_eq!(bytes_to_int(&bytes, 8, false), 9_990_096);
        assert_eq!(bytes_to_int(&bytes, 7, true), 3_422_104);
    }

    #[test]
    fn read_bits_extracts_middle_span() {
        assert_eq!(read_bits(0x31, 2, 2), 3);
    }

    #[test]
    fn utf16_with_bom_both_endiannesses_agree() {
        let be = [0xFE, 0xFF, 0x30, 0x53, 0x00, 0x00];
        let le = [0xFF, 0xFE, 0x53, 0x30, 0x00, 0x00];
        let decoded_be = bytes_to_string(&be, TextEncoding::Utf16Bom).unwrap();
        let decoded_le = bytes_to_string(&le, TextEncoding::Utf16Bom).unwrap();
        assert_eq!(decoded_be, decoded_le);
        assert_eq!(decoded_be, "\u{3053}");
    }

    #[test]
    fn utf16_without_bom_falls_back_to_little_endian() {
        let le = [0x53, 0x30, 0x00, 0x00];
        assert_eq!(bytes_to_string(&le, TextEncoding::Utf16Bom).unwrap(), "\u{3053}");
    }

    #[test]
    fn latin1_strips_trailing_nul_and_garbage() {
        let bytes = [0x32, 0x30, 0x32, 0x34, 0x00, 0xFF];
        assert_eq!(bytes_to_string(&bytes, TextEncoding::Latin1).unwrap(), "2024");
    }

    #[test]
    fn base64_round_trip() {
        let data = b"hello world";
        let encoded = base64_encode(data);
        assert_eq!(base64_decode(&encoded).unwrap(), data);
    }
}
