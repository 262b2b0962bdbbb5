//! Human-readable token amounts with 18 decimals.

use crate::params::{DECIMALS, TOKEN};

/// Parses `"12"`, `"0.5"` or `"1_000.25"` as whole tokens into base units.
pub fn parse_token_amount(raw: &str) -> Result<u128, String> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != '_').collect();
    let (whole, frac) = cleaned.split_once('.').unwrap_or((cleaned.as_str(), ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(format!("invalid amount: {:?}", raw));
    }
    if frac.len() > DECIMALS as usize {
        return Err(format!("at most {} decimal places", DECIMALS));
    }

    let parse = |s: &str| -> Result<u128, String> {
        if s.is_empty() {
            Ok(0)
        } else {
            s.parse::<u128>().map_err(|e| format!("invalid amount {:?}: {}", raw, e))
        }
    };
    let whole = parse(whole)?;
    let frac_units = parse(frac)? * 10u128.pow(DECIMALS as u32 - frac.len() as u32);

    whole
        .checked_mul(TOKEN)
        .and_then(|w| w.checked_add(frac_units))
        .ok_or_else(|| format!("amount too large: {:?}", raw))
}

pub fn format_token_amount(units: u128) -> String {
    let whole = units / TOKEN;
    let frac = units % TOKEN;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{:0width$}", frac, width = DECIMALS as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}
