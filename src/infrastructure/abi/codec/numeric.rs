//! Integer encodings: minimal big-endian (top-level, arbitrary width) and
//! fixed-width big-endian with zero or sign padding (nested).

use num_bigint::{BigInt, Sign};
use num_traits::{One, Zero};

use crate::domain::abi::{AbiError, AbiResult, IntWidth};

/// Fails when `value` does not fit the integer type
pub fn check_range(value: &BigInt, signed: bool, width: IntWidth) -> AbiResult<()> {
    if !signed && value.sign() == Sign::Minus {
        return Err(AbiError::invalid_value(format!(
            "negative value {value} for an unsigned type"
        )));
    }
    let Some(byte_len) = width.byte_len() else {
        return Ok(());
    };
    let bits = byte_len * 8;
    let fits = if signed {
        let limit = BigInt::one() << (bits - 1);
        *value >= -limit.clone() && *value < limit
    } else {
        value.bits() <= bits as u64
    };
    if fits {
        Ok(())
    } else {
        Err(AbiError::invalid_value(format!(
            "{value} does not fit in {} bits",
            bits
        )))
    }
}

/// Minimal big-endian representation; zero is the empty buffer
pub fn to_minimal_bytes(value: &BigInt, signed: bool) -> Vec<u8> {
    if value.is_zero() {
        return Vec::new();
    }
    if signed {
        value.to_signed_bytes_be()
    } else {
        value.magnitude().to_bytes_be()
    }
}

/// Exactly `len` big-endian bytes, sign-extended for negative values
pub fn to_fixed_bytes(value: &BigInt, signed: bool, len: usize) -> AbiResult<Vec<u8>> {
    let minimal = to_minimal_bytes(value, signed);
    if minimal.len() > len {
        return Err(AbiError::invalid_value(format!(
            "{value} does not fit in {len} bytes"
        )));
    }
    let fill = if signed && value.sign() == Sign::Minus {
        0xff
    } else {
        0x00
    };
    let mut out = vec![fill; len - minimal.len()];
    out.extend_from_slice(&minimal);
    Ok(out)
}

/// Interpret big-endian bytes; the empty buffer is zero
pub fn from_bytes(bytes: &[u8], signed: bool) -> BigInt {
    if bytes.is_empty() {
        BigInt::zero()
    } else if signed {
        BigInt::from_signed_bytes_be(bytes)
    } else {
        BigInt::from_bytes_be(Sign::Plus, bytes)
    }
}
