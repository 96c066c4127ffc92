//! Conversions between bit sequences, binary literals and packed vectors.
//!
//! Two orderings are in use:
//!
//! - **Registers and literals** are MSB first: index 0 of a `[bool]` is the
//!   most significant bit, the way a binary literal reads left to right.
//! - **Packed XVC vectors** are LSB first: bit `i` of a vector lives in byte
//!   `i / 8` at position `i % 8`, so bit 0 is the least significant bit of
//!   the first byte.
//!
//! ```
//! use xvc_protocol::bits;
//!
//! let idcode = bits::from_literal("0000 0011 0110 0100 1100 0000 1001 0011").unwrap();
//! assert_eq!(bits::to_value(&idcode), 0x0364_c093);
//!
//! let packed = bits::pack(&[true, false, true]);
//! assert_eq!(&packed[..], &[0b101]);
//! assert_eq!(bits::unpack(3, &packed), vec![true, false, true]);
//! ```
use std::{error::Error, fmt::Display};

/// A character in a binary literal that is neither a bit nor a separator.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParseBitsError {
    found: char,
    position: usize,
}

impl ParseBitsError {
    /// The offending character
    pub fn found(&self) -> char {
        self.found
    }

    /// Character offset of the offending character in the literal
    pub fn position(&self) -> usize {
        self.position
    }
}

impl Display for ParseBitsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Invalid bit {:?} at position {}",
            self.found, self.position
        )
    }
}

impl Error for ParseBitsError {}

/// Parses a binary literal such as `"10 0110"` into bits, MSB first.
/// Spaces and underscores may be used to group digits.
pub fn from_literal(literal: &str) -> Result<Vec<bool>, ParseBitsError> {
    let mut bits = Vec::with_capacity(literal.len());
    for (position, c) in literal.chars().enumerate() {
        match c {
            '0' => bits.push(false),
            '1' => bits.push(true),
            ' ' | '_' => {}
            found => return Err(ParseBitsError { found, position }),
        }
    }
    Ok(bits)
}

/// The low `width` bits of `value`, MSB first.
pub fn from_value(value: u64, width: usize) -> Vec<bool> {
    (0..width)
        .rev()
        .map(|i| i < 64 && value & (1 << i) != 0)
        .collect()
}

/// Interprets `bits` as an MSB first integer.
/// Bits beyond the 64 least significant ones are shifted out.
pub fn to_value(bits: &[bool]) -> u64 {
    bits.iter().fold(0, |acc, &bit| (acc << 1) | u64::from(bit))
}

/// Number of bytes needed to hold `num_bits` packed bits.
pub fn byte_len(num_bits: usize) -> usize {
    num_bits.div_ceil(8)
}

/// Reads bit `index` of a packed vector. Bits past the end read as `false`.
pub fn get(bytes: &[u8], index: usize) -> bool {
    bytes
        .get(index / 8)
        .is_some_and(|byte| byte & (1 << (index % 8)) != 0)
}

/// Sets bit `index` of a packed vector.
///
/// # Panics
///
/// If `index` lies past the end of `bytes`.
pub fn set(bytes: &mut [u8], index: usize) {
    bytes[index / 8] |= 1 << (index % 8);
}

/// Unpacks the first `num_bits` bits of a packed vector.
pub fn unpack(num_bits: usize, bytes: &[u8]) -> Vec<bool> {
    (0..num_bits).map(|i| get(bytes, i)).collect()
}

/// Packs bits into a vector of `byte_len(bits.len())` bytes.
/// Unused high bits of the last byte are zero.
pub fn pack(bits: &[bool]) -> Box<[u8]> {
    let mut bytes = vec![0u8; byte_len(bits.len())].into_boxed_slice();
    for (i, _) in bits.iter().enumerate().filter(|(_, bit)| **bit) {
        set(&mut bytes, i);
    }
    bytes
}
