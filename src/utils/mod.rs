/*
 * Amount and address helpers shared across the engine
 */

use ethers::types::{Address, U256};
use std::str::FromStr;

use crate::models::{HermesError, Result};

/// Parse a human decimal string into integer token units.
///
/// The string is shifted left by `decimals` places; more fractional digits
/// than the token carries is an input error, not a silent truncation.
pub fn parse_amount(raw: &str, decimals: u8) -> Result<U256> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(HermesError::InvalidInput("amount is empty".to_string()));
    }
    if s.starts_with('+') || s.starts_with('-') {
        return Err(HermesError::InvalidInput(format!(
            "amount must be an unsigned decimal: {s}"
        )));
    }

    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(HermesError::InvalidInput(format!("malformed amount: {s}")));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(HermesError::InvalidInput(format!(
            "amount contains non-decimal characters: {s}"
        )));
    }
    if frac_part.len() > usize::from(decimals) {
        return Err(HermesError::InvalidInput(format!(
            "amount {s} has more than {decimals} fractional digits"
        )));
    }

    let mut shifted = String::with_capacity(int_part.len() + usize::from(decimals));
    shifted.push_str(if int_part.is_empty() { "0" } else { int_part });
    shifted.push_str(frac_part);
    for _ in 0..(usize::from(decimals) - frac_part.len()) {
        shifted.push('0');
    }

    U256::from_dec_str(&shifted)
        .map_err(|e| HermesError::InvalidInput(format!("amount out of range: {s} ({e})")))
}

/// Format integer token units back into a human decimal string.
///
/// Inverse of [`parse_amount`]: trailing fractional zeros are trimmed and a
/// zero integer part renders as `0.<frac>`.
#[must_use]
pub fn format_amount(amount: U256, decimals: u8) -> String {
    let digits = amount.to_string();
    let width = usize::from(decimals) + 1;
    let padded = if digits.len() < width {
        let mut p = "0".repeat(width - digits.len());
        p.push_str(&digits);
        p
    } else {
        digits
    };

    let split = padded.len() - usize::from(decimals);
    let int_part = &padded[..split];
    let frac_part = padded[split..].trim_end_matches('0');

    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac_part}")
    }
}

/// Parse a 20-byte hex address. Mixed case is accepted and never affects the
/// result; checksum casing is deliberately not validated.
pub fn parse_address(raw: &str) -> Result<Address> {
    let s = raw.trim();
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| HermesError::InvalidInput(format!("address missing 0x prefix: {s}")))?;
    if hex.len() != 40 {
        return Err(HermesError::InvalidInput(format!(
            "address must be 20 bytes of hex: {s}"
        )));
    }
    Address::from_str(hex)
        .map_err(|e| HermesError::InvalidInput(format!("malformed address {s}: {e}")))
}

/// Canonical lowercase `0x…` form used in every response.
#[must_use]
pub fn format_address(address: Address) -> String {
    format!("{address:#x}")
}
