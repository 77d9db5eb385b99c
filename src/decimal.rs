//! Scaled decimal codec.
//!
//! Upstream producers serialize monetary amounts as Avro-style decimals:
//! the unscaled value is a big-endian two's-complement integer of any
//! byte length, base64 encoded. The decoded value is
//! `unscaled * 10^-scale`.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::DecodeError;

/// Decode a base64 scaled decimal into an `f64`.
///
/// Payloads whose value overflows `f64` are rejected.
///
/// ```
/// use ts_shards::decimal::decode;
/// // 12345 = 0x3039
/// assert!((decode("MDk=", 2).unwrap() - 123.45).abs() < 1e-9);
/// ```
pub fn decode(encoded: &str, scale: u32) -> Result<f64, DecodeError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| DecodeError::Base64(e.to_string()))?;
    let value = apply_scale(unscaled_from_be_bytes(&bytes), scale);
    if !value.is_finite() {
        return Err(DecodeError::OutOfRange);
    }
    Ok(value)
}

/// Interpret bytes as a big-endian two's-complement integer.
///
/// Up to 16 bytes are read exactly through `i128`; longer payloads fold
/// into an `f64` one byte at a time. An empty payload is zero.
fn unscaled_from_be_bytes(bytes: &[u8]) -> f64 {
    if bytes.is_empty() {
        return 0.0;
    }
    let negative = bytes[0] & 0x80 != 0;

    if bytes.len() <= 16 {
        let fill = if negative { 0xff } else { 0x00 };
        let mut buf = [fill; 16];
        buf[16 - bytes.len()..].copy_from_slice(bytes);
        return i128::from_be_bytes(buf) as f64;
    }

    // Two's complement: -(~x + 1) for negative values.
    let mut magnitude = 0.0f64;
    for &b in bytes {
        let b = if negative { !b } else { b };
        magnitude = magnitude * 256.0 + f64::from(b);
    }
    if negative {
        -(magnitude + 1.0)
    } else {
        magnitude
    }
}

fn apply_scale(unscaled: f64, scale: u32) -> f64 {
    unscaled / 10f64.powi(scale as i32)
}
