//! Cell value encoding.
//!
//! Integers and floats are fixed-width big-endian, strings are UTF-8 and
//! decimals are the UTF-8 bytes of their canonical string form.

use std::str::FromStr;

use bigdecimal::BigDecimal;

/// Joins the map column and an entry key into the entry's qualifier.
pub const MAP_SEPARATOR: &[u8] = b"|";

/// How float and double cells are read back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NumericDecoding {
    /// Big-endian IEEE 754, the same layout the codec writes.
    #[default]
    Binary,
    /// Parse the cell as UTF-8 text. Reads rows written by older writers that
    /// stored floats as text; binary-encoded floats fail to decode.
    LegacyText,
}

pub(crate) fn encode_i64(v: i64) -> Vec<u8> {
    v.to_be_bytes().to_vec()
}

pub(crate) fn encode_i32(v: i32) -> Vec<u8> {
    v.to_be_bytes().to_vec()
}

pub(crate) fn encode_i16(v: i16) -> Vec<u8> {
    v.to_be_bytes().to_vec()
}

pub(crate) fn encode_f32(v: f32) -> Vec<u8> {
    v.to_be_bytes().to_vec()
}

pub(crate) fn encode_f64(v: f64) -> Vec<u8> {
    v.to_be_bytes().to_vec()
}

pub(crate) fn encode_decimal(v: &BigDecimal) -> Vec<u8> {
    v.to_string().into_bytes()
}

fn fixed<const N: usize>(raw: &[u8]) -> Result<[u8; N], String> {
    raw.try_into()
        .map_err(|_| format!("expected {N} bytes, got {}", raw.len()))
}

pub(crate) fn decode_i64(raw: &[u8]) -> Result<i64, String> {
    fixed::<8>(raw).map(i64::from_be_bytes)
}

pub(crate) fn decode_i32(raw: &[u8]) -> Result<i32, String> {
    fixed::<4>(raw).map(i32::from_be_bytes)
}

pub(crate) fn decode_i16(raw: &[u8]) -> Result<i16, String> {
    fixed::<2>(raw).map(i16::from_be_bytes)
}

pub(crate) fn decode_string(raw: &[u8]) -> Result<String, String> {
    String::from_utf8(raw.to_vec()).map_err(|e| format!("invalid utf-8: {e}"))
}

fn parse_text<T: FromStr>(raw: &[u8]) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    let text = std::str::from_utf8(raw).map_err(|e| format!("invalid utf-8: {e}"))?;
    text.trim()
        .parse::<T>()
        .map_err(|e| format!("cannot parse {text:?}: {e}"))
}

pub(crate) fn decode_f32(raw: &[u8], mode: NumericDecoding) -> Result<f32, String> {
    match mode {
        NumericDecoding::Binary => fixed::<4>(raw).map(f32::from_be_bytes),
        NumericDecoding::LegacyText => parse_text(raw),
    }
}

pub(crate) fn decode_f64(raw: &[u8], mode: NumericDecoding) -> Result<f64, String> {
    match mode {
        NumericDecoding::Binary => fixed::<8>(raw).map(f64::from_be_bytes),
        NumericDecoding::LegacyText => parse_text(raw),
    }
}

pub(crate) fn decode_decimal(raw: &[u8]) -> Result<BigDecimal, String> {
    parse_text(raw)
}
