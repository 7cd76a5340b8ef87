//! Hexadecimal encoding for persisted hashes.
//!
//! Every record in the cache file stores its digest as text. [`encode`]
//! always produces canonical uppercase digits; [`decode`] accepts either
//! case and an optional `0x` prefix.
//!
//! # Example
//!
//! ```
//! use hashcheck::hex::{decode, encode};
//!
//! let bytes = vec![0x00, 0xAB, 0xFF];
//! assert_eq!(encode(&bytes), "00ABFF");
//! assert_eq!(decode("0x00abff").unwrap(), bytes);
//! ```

/// Uppercase digits used by [`encode`].
const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Marker for bytes that are not hex digits in [`NIBBLES`].
const INVALID: u8 = 0xFF;

/// Nibble value for every possible input byte, [`INVALID`] for non-digits.
const NIBBLES: [u8; 256] = build_nibble_table();

const fn build_nibble_table() -> [u8; 256] {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < 10 {
        table[b'0' as usize + i] = i as u8;
        i += 1;
    }
    let mut i = 0;
    while i < 6 {
        table[b'A' as usize + i] = 10 + i as u8;
        table[b'a' as usize + i] = 10 + i as u8;
        i += 1;
    }
    table
}

/// Errors produced by [`decode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HexError {
    /// The input was exactly `0x` with nothing after it.
    #[error("Hex string has a 0x prefix but no digits")]
    EmptyAfterPrefix,

    /// The digits do not form whole bytes.
    #[error("Hex string has odd length: {0}")]
    OddLength(usize),

    /// A character outside `0-9`, `A-F`, `a-f` was found.
    #[error("Invalid hex character {character:?} at position {index}")]
    InvalidCharacter {
        /// The offending character
        character: char,
        /// Byte offset in the original input
        index: usize,
    },
}

/// Encode bytes as uppercase hexadecimal, high nibble first.
///
/// The result is always exactly `2 * bytes.len()` characters long.
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        out.push(HEX_DIGITS[usize::from(byte >> 4)] as char);
        out.push(HEX_DIGITS[usize::from(byte & 0x0F)] as char);
    }
    out
}

/// Decode hexadecimal text into bytes.
///
/// An empty string decodes to an empty vector. A leading `0x` is stripped
/// first; a bare `0x` is rejected. Input is case-insensitive.
///
/// # Errors
///
/// Returns [`HexError`] for a bare prefix, an odd number of digits, or any
/// non-hex character.
///
/// # Example
///
/// ```
/// use hashcheck::hex::{decode, HexError};
///
/// assert_eq!(decode("").unwrap(), Vec::<u8>::new());
/// assert_eq!(decode("0xAB").unwrap(), decode("ab").unwrap());
/// assert_eq!(decode("0x"), Err(HexError::EmptyAfterPrefix));
/// assert_eq!(decode("1"), Err(HexError::OddLength(1)));
/// ```
pub fn decode(text: &str) -> Result<Vec<u8>, HexError> {
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let (offset, digits) = match text.strip_prefix("0x") {
        Some("") => return Err(HexError::EmptyAfterPrefix),
        Some(rest) => (2, rest.as_bytes()),
        None => (0, text.as_bytes()),
    };

    if digits.len() % 2 != 0 {
        return Err(HexError::OddLength(digits.len()));
    }

    let mut out = Vec::with_capacity(digits.len() / 2);
    for (pair_index, pair) in digits.chunks_exact(2).enumerate() {
        let index = offset + pair_index * 2;
        let high = nibble(text, pair[0], index)?;
        let low = nibble(text, pair[1], index + 1)?;
        out.push((high << 4) | low);
    }
    Ok(out)
}

/// Look up one digit, reporting the character at `index` on failure.
fn nibble(text: &str, byte: u8, index: usize) -> Result<u8, HexError> {
    match NIBBLES[usize::from(byte)] {
        INVALID => Err(HexError::InvalidCharacter {
            character: text
                .get(index..)
                .and_then(|rest| rest.chars().next())
                .unwrap_or(char::REPLACEMENT_CHARACTER),
            index,
        }),
        value => Ok(value),
    }
}
