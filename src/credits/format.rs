//! Conversions between wei and decimal token strings.

use alloy::primitives::utils::{self, format_units};
use alloy::primitives::U256;

use crate::blockchain::{BlockchainError, BlockchainResult};

/// Wei to a decimal ether string: `1.0`, `0.5`, `1234.000001`.
pub fn format_ether(wei: U256) -> String {
    match format_units(wei, "ether") {
        Ok(full) => trim_fraction(&full),
        Err(_) => "0.0".to_string(),
    }
}

fn trim_fraction(value: &str) -> String {
    match value.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                format!("{}.0", whole)
            } else {
                format!("{}.{}", whole, fraction)
            }
        }
        None => format!("{}.0", value),
    }
}

/// Decimal ether string to wei.
pub fn parse_ether(amount: &str) -> BlockchainResult<U256> {
    let trimmed = amount.trim();
    if trimmed.is_empty() || trimmed.starts_with('-') {
        return Err(BlockchainError::InvalidAmount(amount.to_string()));
    }
    utils::parse_ether(trimmed).map_err(|_| BlockchainError::InvalidAmount(amount.to_string()))
}

/// Two fraction digits with comma thousands separators: `1234.5` → `1,234.50`.
///
/// Input that is not a finite number renders as `0.00`.
pub fn format_token_amount(amount: &str) -> String {
    let value = match amount.trim().replace(',', "").parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => return "0.00".to_string(),
    };

    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, group_thousands(whole), fraction)
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
