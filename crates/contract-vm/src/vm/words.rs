//! # Word Arithmetic Helpers
//!
//! Signed/unsigned views over the VM's native 256-bit word, plus the shared
//! byte-slicing helpers the instruction set is built on. All functions here
//! are pure and total; arithmetic truncates modulo 2^256, and division or
//! modulo by zero yields zero rather than an error.

use crate::domain::value_objects::U256;
use primitive_types::U512;

/// Canonical truthy word.
#[must_use]
pub fn bool_to_word(value: bool) -> U256 {
    if value {
        U256::one()
    } else {
        U256::zero()
    }
}

/// True when the word is negative under the two's-complement view.
#[must_use]
pub fn is_negative(value: U256) -> bool {
    value.bit(255)
}

/// Two's-complement negation, truncated modulo 2^256.
#[must_use]
pub fn twos_complement(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

/// Signed less-than comparison.
#[must_use]
pub fn signed_lt(a: U256, b: U256) -> bool {
    match (is_negative(a), is_negative(b)) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    }
}

/// Signed division. Division by zero yields zero.
#[must_use]
pub fn signed_div(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let a_neg = is_negative(a);
    let b_neg = is_negative(b);
    let a_abs = if a_neg { twos_complement(a) } else { a };
    let b_abs = if b_neg { twos_complement(b) } else { b };
    let result = a_abs / b_abs;
    if a_neg == b_neg {
        result
    } else {
        twos_complement(result)
    }
}

/// Signed modulo. The result carries the dividend's sign; modulo by zero
/// yields zero.
#[must_use]
pub fn signed_mod(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let a_neg = is_negative(a);
    let a_abs = if a_neg { twos_complement(a) } else { a };
    let b_abs = if is_negative(b) {
        twos_complement(b)
    } else {
        b
    };
    let result = a_abs % b_abs;
    if a_neg {
        twos_complement(result)
    } else {
        result
    }
}

/// Sign-extends `value` from the byte at `index` (0 = least significant).
///
/// Callers guard `index <= 30`; the extension bit is `index * 8 + 7`.
#[must_use]
pub fn sign_extend(index: U256, value: U256) -> U256 {
    if index > U256::from(30) {
        return value;
    }
    let bit = index.low_u64() as usize * 8 + 7;
    let mask = (U256::one() << bit).overflowing_sub(U256::one()).0;
    if value.bit(bit) {
        value | !mask
    } else {
        value & mask
    }
}

/// Extracts the byte at big-endian `index` (0 = most significant) as a word.
/// Indices past the word width yield zero.
#[must_use]
pub fn byte_at(index: U256, value: U256) -> U256 {
    if index < U256::from(32) {
        let le_index = 31 - index.low_u64() as usize;
        U256::from(value.byte(le_index))
    } else {
        U256::zero()
    }
}

/// Exponentiation by squaring, truncated modulo 2^256.
#[must_use]
pub fn exp_by_squaring(base: U256, mut exp: U256) -> U256 {
    if exp.is_zero() {
        return U256::one();
    }

    let mut result = U256::one();
    let mut base = base;

    while !exp.is_zero() {
        if exp.bit(0) {
            result = result.overflowing_mul(base).0;
        }
        exp >>= 1;
        base = base.overflowing_mul(base).0;
    }

    result
}

/// Widens to 512 bits for ADDMOD/MULMOD intermediates.
#[must_use]
pub fn u256_to_u512(value: U256) -> U512 {
    let mut bytes = [0u8; 64];
    value.to_big_endian(&mut bytes[32..]);
    U512::from_big_endian(&bytes)
}

/// Truncates a 512-bit intermediate back to a word.
#[must_use]
pub fn u512_to_u256(value: U512) -> U256 {
    let mut bytes = [0u8; 64];
    value.to_big_endian(&mut bytes);
    U256::from_big_endian(&bytes[32..])
}

/// Saturating conversion for word operands that feed `u64` quantities
/// (gas amounts, block numbers).
#[must_use]
pub fn saturating_u64(value: U256) -> u64 {
    if value > U256::from(u64::MAX) {
        u64::MAX
    } else {
        value.low_u64()
    }
}

/// Saturating conversion for word operands used as buffer offsets/sizes.
#[must_use]
pub fn saturating_usize(value: U256) -> usize {
    if value > U256::from(usize::MAX as u64) {
        usize::MAX
    } else {
        value.low_u64() as usize
    }
}

/// Copies `size` bytes of `data` starting at `offset`, zero-padded on the
/// right wherever the requested range runs past the end of `data`.
#[must_use]
pub fn data_slice(data: &[u8], offset: U256, size: U256) -> Vec<u8> {
    let mut out = Vec::new();
    data_slice_into(data, offset, size, &mut out);
    out
}

/// As [`data_slice`], but fills a caller-supplied buffer so a recycled
/// allocation can be reused across instructions.
pub fn data_slice_into(data: &[u8], offset: U256, size: U256, buf: &mut Vec<u8>) {
    buf.clear();
    let size = saturating_usize(size);
    if size == 0 {
        return;
    }
    let offset = saturating_usize(offset).min(data.len());
    let end = offset.saturating_add(size).min(data.len());

    buf.extend_from_slice(&data[offset..end]);
    buf.resize(size, 0);
}

// =============================================================================
// TESTS
// =============================================================================
