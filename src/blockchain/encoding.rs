use serde::{Serialize, Serializer};
use serde_json::ser::{CharEscape, Formatter};
use sha2::{Digest, Sha256};
use thiserror::Error;

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

/// Errors that can occur while decoding a hex digest
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashParseError {
    #[error("Invalid hex digest: {0}")]
    InvalidHex(String),

    #[error("Invalid digest length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// A 256-bit SHA-256 digest
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// Hashes the given bytes with SHA-256
    pub fn of(bytes: &[u8]) -> Self {
        Hash256(Sha256::digest(bytes).into())
    }

    /// The all-zero digest
    pub fn zero() -> Self {
        Hash256([0u8; 32])
    }

    /// Lowercase hex rendering, always 64 characters
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Number of leading zero hex characters in the digest
    pub fn leading_zero_nibbles(&self) -> usize {
        let mut count = 0;
        for byte in self.0 {
            if byte == 0 {
                count += 2;
                continue;
            }
            if byte >> 4 == 0 {
                count += 1;
            }
            break;
        }
        count
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self.to_hex())
    }
}

impl FromStr for Hash256 {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| HashParseError::InvalidHex(e.to_string()))?;
        let len = bytes.len();
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| HashParseError::InvalidLength(len))?;
        Ok(Hash256(array))
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// JSON formatter that pins down every byte of the canonical encoding.
///
/// Compact output, like serde_json's default, except that:
/// - `f32` values are written as the shortest round-tripping decimal with no
///   exponent and no trailing `.0` (`2`, not `2.0`);
/// - `<`, `>`, `&`, U+2028 and U+2029 are written as `\u` escapes;
/// - control characters other than `\n`, `\r` and `\t` (so `\b` and `\f`
///   too) are written as `\u00xx`.
///
/// Non-finite floats never reach the formatter; serde_json writes them as
/// `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn write_f32<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f32) -> io::Result<()> {
        write!(writer, "{}", value)
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            if matches!(c, '<' | '>' | '&' | '\u{2028}' | '\u{2029}') {
                writer.write_all(fragment[start..i].as_bytes())?;
                write!(writer, "\\u{:04x}", c as u32)?;
                start = i + c.len_utf8();
            }
        }
        writer.write_all(fragment[start..].as_bytes())
    }

    fn write_char_escape<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        char_escape: CharEscape,
    ) -> io::Result<()> {
        match char_escape {
            CharEscape::Quote => writer.write_all(b"\\\""),
            CharEscape::ReverseSolidus => writer.write_all(b"\\\\"),
            CharEscape::Solidus => writer.write_all(b"\\/"),
            CharEscape::LineFeed => writer.write_all(b"\\n"),
            CharEscape::CarriageReturn => writer.write_all(b"\\r"),
            CharEscape::Tab => writer.write_all(b"\\t"),
            CharEscape::Backspace => writer.write_all(b"\\u0008"),
            CharEscape::FormFeed => writer.write_all(b"\\u000c"),
            CharEscape::AsciiControl(byte) => write!(writer, "\\u{:04x}", byte),
        }
    }
}

/// Serializes any value with [`CanonicalFormatter`]
pub fn to_canonical_vec<T: ?Sized + Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, CanonicalFormatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}

/// Deterministic byte representation shared by hashing, signing and the wire.
///
/// Implementors derive `Serialize` with their fields in the fixed order; the
/// bytes come from [`CanonicalFormatter`].
pub trait CanonicalEncode: Serialize {
    /// The canonical encoding as bytes
    fn canonical_bytes(&self) -> Vec<u8> {
        // Strings, integers, floats and sequences only: serialization cannot fail
        to_canonical_vec(self).expect("canonical encoding of ledger types is infallible")
    }

    /// The canonical encoding as a JSON string
    fn to_canonical_json(&self) -> String {
        String::from_utf8_lossy(&self.canonical_bytes()).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_str(value: &str) -> String {
        String::from_utf8(to_canonical_vec(value).unwrap()).unwrap()
    }

    fn json_amount(value: f32) -> String {
        String::from_utf8(to_canonical_vec(&value).unwrap()).unwrap()
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(json_str("plain"), "\"plain\"");
        assert_eq!(json_str("a\"b\\c"), "\"a\\\"b\\\\c\"");
        assert_eq!(json_str("line\nbreak\t"), "\"line\\nbreak\\t\"");
        assert_eq!(json_str("<a&b>"), "\"\\u003ca\\u0026b\\u003e\"");
        assert_eq!(json_str("\u{1}"), "\"\\u0001\"");
        assert_eq!(json_str("\u{8}\u{c}"), "\"\\u0008\\u000c\"");
        assert_eq!(json_str("a/b"), "\"a/b\"");
        assert_eq!(json_str("x\u{2028}y"), "\"x\\u2028y\"");
        assert_eq!(json_str("héllo"), "\"héllo\"");
    }

    #[test]
    fn test_escaped_string_is_valid_json() {
        let raw = "we\"ird <\u{2028}> \u{7}";
        let parsed: String = serde_json::from_str(&json_str(raw)).unwrap();
        assert_eq!(parsed, raw);
    }

    #[test]
    fn test_amount_formatting() {
        assert_eq!(json_amount(2.0), "2");
        assert_eq!(json_amount(1.0), "1");
        assert_eq!(json_amount(0.5), "0.5");
        assert_eq!(json_amount(0.1), "0.1");
        assert_eq!(json_amount(-1.25), "-1.25");
        assert_eq!(json_amount(1e10), "10000000000");
        assert_eq!(json_amount(f32::NAN), "null");
        assert_eq!(json_amount(f32::INFINITY), "null");
    }

    #[test]
    fn test_compact_struct_layout() {
        #[derive(Serialize)]
        struct Sample<'a> {
            name: &'a str,
            amount: f32,
            items: Vec<u64>,
        }

        let sample = Sample {
            name: "<n>",
            amount: 3.0,
            items: vec![1, 2],
        };
        assert_eq!(
            String::from_utf8(to_canonical_vec(&sample).unwrap()).unwrap(),
            r#"{"name":"\u003cn\u003e","amount":3,"items":[1,2]}"#
        );
    }

    #[test]
    fn test_hash_hex_round_trip() {
        let hash = Hash256::of(b"ledger");
        let hex = hash.to_hex();

        assert_eq!(hex.len(), 64);
        assert_eq!(hex, hex.to_lowercase());
        assert_eq!(hex.parse::<Hash256>().unwrap(), hash);
        assert_eq!(Hash256::zero().to_hex(), "0".repeat(64));
    }

    #[test]
    fn test_hash_parse_errors() {
        assert!(matches!("zz".parse::<Hash256>(), Err(HashParseError::InvalidHex(_))));
        assert_eq!("abcd".parse::<Hash256>(), Err(HashParseError::InvalidLength(2)));
    }

    #[test]
    fn test_leading_zero_nibbles() {
        let mut bytes = [0xffu8; 32];
        assert_eq!(Hash256(bytes).leading_zero_nibbles(), 0);

        bytes[0] = 0x0f;
        assert_eq!(Hash256(bytes).leading_zero_nibbles(), 1);

        bytes[0] = 0x00;
        bytes[1] = 0x01;
        assert_eq!(Hash256(bytes).leading_zero_nibbles(), 3);

        assert_eq!(Hash256::zero().leading_zero_nibbles(), 64);

        let hash = Hash256::of(b"count me");
        let expected = hash.to_hex().chars().take_while(|c| *c == '0').count();
        assert_eq!(hash.leading_zero_nibbles(), expected);
    }
}
