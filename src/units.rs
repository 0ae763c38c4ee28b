use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

use crate::error::{LedgerPilotError, Result};

pub const DISPLAY_DECIMALS: u32 = 4;

/// Raw integer units to human units, exact.
pub fn to_human(raw: u64, decimals: u32) -> Decimal {
    Decimal::from_i128_with_scale(raw as i128, decimals)
}

/// Human units to raw integer units. Rejects non-positive amounts and
/// amounts with more fractional digits than the token carries.
pub fn to_raw(amount: Decimal, decimals: u32) -> Result<u64> {
    if amount <= Decimal::ZERO {
        return Err(LedgerPilotError::ExtractionInvalid(format!(
            "amount must be greater than zero: {amount}"
        )));
    }
    let scale = Decimal::from_i128_with_scale(10i128.pow(decimals), 0);
    let raw = amount.checked_mul(scale).ok_or_else(|| {
        LedgerPilotError::ExtractionInvalid(format!("amount is too large: {amount}"))
    })?;
    if !raw.fract().is_zero() {
        return Err(LedgerPilotError::ExtractionInvalid(format!(
            "amount {amount} has more than {decimals} decimal places"
        )));
    }
    let mantissa = raw.trunc().normalize();
    u64::try_from(mantissa).map_err(|_| {
        LedgerPilotError::ExtractionInvalid(format!("amount is too large: {amount}"))
    })
}

/// Parses a decimal from free text such as `"1.5"` or `"2e3"`.
pub fn parse_decimal(text: &str) -> Result<Decimal> {
    let trimmed = text.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| LedgerPilotError::ExtractionInvalid(format!("not a number: {trimmed}")))
}

/// Accepts the string-or-number shapes language models emit for amounts.
pub fn decimal_from_json(value: &Value) -> Result<Decimal> {
    match value {
        Value::Number(number) => parse_decimal(&number.to_string()),
        Value::String(text) => parse_decimal(text),
        other => Err(LedgerPilotError::ExtractionInvalid(format!(
            "amount must be a string or number, got {other}"
        ))),
    }
}

/// Presentation rounding; intermediate values stay at full precision.
pub fn display(value: Decimal) -> String {
    let mut rounded =
        value.round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(DISPLAY_DECIMALS);
    rounded.to_string()
}
