//! Display-unit conversions used by front ends and scripts before anything
//! reaches a ledger.
//!
//! Token amounts use [`TOKEN_DECIMALS`] decimals and must fall in
//! `[1, u64::MAX]` base units. Native prices use whatever decimals the chain's
//! currency has (18 for wei-denominated prices).

use alloc::string::String;
use core::fmt::Write;

/// Decimals of every sale token.
pub const TOKEN_DECIMALS: u8 = 6;

/// Decimals of a wei-denominated native currency.
pub const NATIVE_DECIMALS: u8 = 18;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitsError {
    Empty,
    InvalidDigit,
    TooManyDecimals,
    Overflow,
    /// Amount is zero or does not fit in `u64` base units.
    OutOfRange,
}

/// Parse a decimal string such as `"1.25"` into integer base units.
pub fn parse_units(input: &str, decimals: u8) -> Result<u128, UnitsError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(UnitsError::Empty);
    }
    let (whole, frac) = match input.split_once('.') {
        Some((w, f)) => (w, f),
        None => (input, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(UnitsError::Empty);
    }
    if frac.len() > decimals as usize {
        return Err(UnitsError::TooManyDecimals);
    }

    let mut value: u128 = 0;
    let padding = decimals as usize - frac.len();
    let digits = whole.bytes().chain(frac.bytes()).chain(core::iter::repeat(b'0').take(padding));
    for d in digits {
        if !d.is_ascii_digit() {
            return Err(UnitsError::InvalidDigit);
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add((d - b'0') as u128))
            .ok_or(UnitsError::Overflow)?;
    }
    Ok(value)
}

/// Render integer base units with `decimals` fractional digits, trimming
/// trailing zeros (`2_500_000` at 6 decimals is `"2.5"`).
pub fn format_units(value: u128, decimals: u8) -> String {
    let scale = 10u128.pow(decimals as u32);
    let whole = value / scale;
    let frac = value % scale;

    let mut out = String::new();
    let _ = write!(out, "{whole}");
    if frac != 0 {
        let mut digits = String::new();
        let _ = write!(digits, "{frac:0width$}", width = decimals as usize);
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }
    out
}

/// Accept only amounts a ledger can take: `1..=u64::MAX`.
pub fn validate_amount(raw: u128) -> Result<u64, UnitsError> {
    match u64::try_from(raw) {
        Ok(0) | Err(_) => Err(UnitsError::OutOfRange),
        Ok(v) => Ok(v),
    }
}

/// Parse a human token amount (`"2"`, `"0.5"`) into base units.
pub fn parse_token_amount(input: &str) -> Result<u64, UnitsError> {
    let raw = match parse_units(input, TOKEN_DECIMALS) {
        Err(UnitsError::Overflow) => return Err(UnitsError::OutOfRange),
        other => other?,
    };
    validate_amount(raw)
}

pub fn format_token_amount(base_units: u64) -> String {
    format_units(base_units as u128, TOKEN_DECIMALS)
}
