//! Symbol ↔ bit-vector conversion.
//!
//! A symbol is a 16-bit code point (the grader only uses 'A'..='Z'). Bit
//! vectors are most-significant-bit first and total for widths 1..=16;
//! anything outside that range is a caller contract violation and is rejected
//! at this boundary rather than inside the engine.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use thiserror::Error;

/// A symbol code. The grader's goal alphabet lives in the single-byte range.
pub type Symbol = u16;

pub const MIN_WIDTH: usize = 1;
pub const MAX_WIDTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("bit width {0} out of range ({MIN_WIDTH}..={MAX_WIDTH})")]
    WidthOutOfRange(usize),
}

/// Expands a symbol into `width` bits, most-significant first.
///
/// Bits above `width` are dropped; the grader picks widths wide enough for
/// its alphabet.
pub fn symbol_to_bits(symbol: Symbol, width: usize) -> Result<Vec<bool>, CodecError> {
    if !(MIN_WIDTH..=MAX_WIDTH).contains(&width) {
        return Err(CodecError::WidthOutOfRange(width));
    }
    Ok((0..width)
        .map(|i| (symbol >> (width - 1 - i)) & 1 == 1)
        .collect())
}

/// Packs a most-significant-first bit slice back into a symbol.
pub fn bits_to_symbol(bits: &[bool]) -> Result<Symbol, CodecError> {
    if !(MIN_WIDTH..=MAX_WIDTH).contains(&bits.len()) {
        return Err(CodecError::WidthOutOfRange(bits.len()));
    }
    let mut value: Symbol = 0;
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            value |= 1 << (bits.len() - 1 - i);
        }
    }
    Ok(value)
}

/// Number of differing bits between two symbols.
pub fn hamming_distance(a: Symbol, b: Symbol) -> u32 {
    (a ^ b).count_ones()
}

/// Display form of a symbol; non-printable codes render as '?'.
pub fn printable(symbol: Symbol) -> char {
    match char::from_u32(symbol as u32) {
        Some(c) if !c.is_control() => c,
        _ => '?',
    }
}
