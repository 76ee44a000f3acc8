//! Unit conversion and slippage arithmetic.
//!
//! Everything that ends up in a transaction is computed on `U256` in integer
//! math. `Decimal` is only used to read a percentage the user typed.

use std::str::FromStr;

use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;

use super::ServiceResult;
use super::error::TradeError;

/// Basis points in 100%.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Decimals of ETH and BNB.
pub const NATIVE_DECIMALS: u8 = 18;

/// Parse a human-readable amount (e.g. "1.5") into base units.
///
/// # Examples
/// - "1" with 18 decimals -> 1000000000000000000
/// - "100.5" with 6 decimals -> 100500000
///
/// More fractional digits than `decimals` is an error rather than a silent
/// truncation.
pub fn parse_units(amount: &str, decimals: u8) -> ServiceResult<U256> {
    let amount = amount.trim();
    let invalid =
        |reason: &str| TradeError::InvalidInput(format!("Invalid amount '{amount}': {reason}"));

    if amount.is_empty() {
        return Err(invalid("empty"));
    }
    if amount.starts_with('-') {
        return Err(invalid("must not be negative"));
    }

    let (whole, fraction) = match amount.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (amount, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("no digits"));
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid("not a decimal number"));
    }
    if fraction.len() > decimals as usize {
        return Err(invalid(&format!("more than {decimals} fractional digits")));
    }

    let digits = format!(
        "{}{:0<width$}",
        if whole.is_empty() { "0" } else { whole },
        fraction,
        width = decimals as usize
    );

    U256::from_str_radix(&digits, 10).map_err(|e| invalid(&e.to_string()))
}

/// Format an amount in base units with trailing zeros removed.
///
/// Inverse of [`parse_units`].
pub fn format_units(value: U256, decimals: u8) -> String {
    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = value / divisor;
    let remainder = value % divisor;

    if remainder.is_zero() {
        return whole.to_string();
    }

    let padded = format!("{:0>width$}", remainder.to_string(), width = decimals as usize);
    let trimmed = padded.trim_end_matches('0');
    if trimmed.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{trimmed}")
    }
}

/// `amount_out * (10000 - slippage_bps) / 10000`, rounded down.
///
/// A zero result while `slippage_bps < 10000` means the quote is too small
/// for any protection to survive rounding, which is rejected.
pub fn calculate_minimum_out(amount_out: U256, slippage_bps: u32) -> ServiceResult<U256> {
    if slippage_bps > BPS_DENOMINATOR {
        return Err(TradeError::InvalidInput(format!(
            "Slippage {slippage_bps} bps exceeds {BPS_DENOMINATOR} bps"
        )));
    }

    let keep = U256::from(BPS_DENOMINATOR - slippage_bps);
    let minimum = amount_out
        .checked_mul(keep)
        .ok_or_else(|| TradeError::InternalError("Minimum output overflowed".to_string()))?
        / U256::from(BPS_DENOMINATOR);

    if minimum.is_zero() && slippage_bps < BPS_DENOMINATOR {
        return Err(TradeError::InvalidMinimumAmount {
            expected_out: amount_out.to_string(),
            slippage_bps,
        });
    }

    Ok(minimum)
}

/// Amount accepted by a sell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SellAmount {
    /// Human-readable token amount, e.g. "1.5".
    Tokens(String),
    /// Base units given as decimal digits or `0x` hex.
    Raw(U256),
    /// Share of the current balance, `0 < p <= 100`.
    Percent(Decimal),
}

impl FromStr for SellAmount {
    type Err = TradeError;

    fn from_str(input: &str) -> ServiceResult<Self> {
        let input = input.trim();

        if let Some(percent) = input.strip_suffix('%') {
            let percent = Decimal::from_str(percent.trim()).map_err(|_| {
                TradeError::InvalidInput(format!("Invalid percentage '{input}'"))
            })?;
            if percent <= Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
                return Err(TradeError::InvalidInput(format!(
                    "Percentage must be greater than 0 and at most 100, got {percent}"
                )));
            }
            return Ok(SellAmount::Percent(percent));
        }

        if let Some(hex) = input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
            return U256::from_str_radix(hex, 16)
                .map(SellAmount::Raw)
                .map_err(|e| {
                    TradeError::InvalidInput(format!("Invalid hex amount '{input}': {e}"))
                });
        }

        if !input.is_empty() && input.chars().all(|c| c.is_ascii_digit()) {
            return U256::from_str_radix(input, 10)
                .map(SellAmount::Raw)
                .map_err(|e| TradeError::InvalidInput(format!("Invalid amount '{input}': {e}")));
        }

        Ok(SellAmount::Tokens(input.to_string()))
    }
}

impl SellAmount {
    /// Base units to sell given the wallet's current `balance`.
    pub fn resolve(&self, balance: U256, decimals: u8) -> ServiceResult<U256> {
        let amount = match self {
            SellAmount::Tokens(amount) => parse_units(amount, decimals)?,
            SellAmount::Raw(raw) => *raw,
            SellAmount::Percent(percent) => apply_percent(balance, *percent)?,
        };

        if amount.is_zero() {
            return Err(TradeError::InvalidInput(
                "Sell amount must be greater than zero".to_string(),
            ));
        }
        Ok(amount)
    }
}

/// `balance * percent / 100` using the exact decimal mantissa.
fn apply_percent(balance: U256, percent: Decimal) -> ServiceResult<U256> {
    let mantissa = U256::from(percent.mantissa().unsigned_abs());
    let scale = U256::from(10u64).pow(U256::from(percent.scale()));

    let numerator = balance
        .checked_mul(mantissa)
        .ok_or_else(|| TradeError::InternalError("Percentage amount overflowed".to_string()))?;

    Ok(numerator / (scale * U256::from(100u64)))
}

pub fn parse_address(address: &str) -> ServiceResult<Address> {
    Address::from_str(address.trim())
        .map_err(|e| TradeError::InvalidInput(format!("Invalid token address '{address}': {e}")))
}

/// Swap deadline: now + 300 seconds.
pub fn swap_deadline() -> U256 {
    U256::from(chrono::Utc::now().timestamp() + 300)
}
