use thiserror::Error;

/// Money is held as integer minor units to keep balance arithmetic exact.
/// For two-decimal currencies like EUR/USD, 1 unit = 100 cents, so
/// €12.34 = 1234 cents.
pub type Cents = i64;

/// Smallest representable amount. Split rounding and settlement tolerance
/// are both expressed as multiples of this unit.
pub const MINOR_UNIT: Cents = 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("invalid money format: {0:?}")]
    Invalid(String),
    #[error("more than two decimal places: {0:?}")]
    TooPrecise(String),
}

/// Format cents as a decimal string: 5000 -> "50.00", -34 -> "-0.34".
pub fn format_cents(cents: Cents) -> String {
    let units = cents / 100;
    let frac = (cents % 100).abs();
    // The sign rides on `units` unless the amount is below one unit.
    let sign = if cents < 0 && units == 0 { "-" } else { "" };
    format!("{sign}{units}.{frac:02}")
}

/// Parse a decimal string into cents. Accepts whole units ("50"), one or
/// two decimal places ("12.5", "12.34") and a leading minus. Anything
/// more precise than the minor unit is rejected rather than truncated.
pub fn parse_cents(input: &str) -> Result<Cents, MoneyError> {
    let trimmed = input.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    if body.is_empty() {
        return Err(MoneyError::Invalid(input.to_string()));
    }

    let (unit_part, frac_part) = match body.split_once('.') {
        Some((units, frac)) => (units, frac),
        None => (body, ""),
    };

    let units: i64 = if unit_part.is_empty() {
        0
    } else {
        unit_part
            .parse()
            .map_err(|_| MoneyError::Invalid(input.to_string()))?
    };
    if units < 0 {
        // A second minus sign after the stripped prefix.
        return Err(MoneyError::Invalid(input.to_string()));
    }

    let frac: i64 = match frac_part.len() {
        0 => 0,
        1 => {
            // A single digit is tenths: "12.5" means 12.50.
            frac_part
                .parse::<i64>()
                .map_err(|_| MoneyError::Invalid(input.to_string()))?
                * 10
        }
        2 => frac_part
            .parse()
            .map_err(|_| MoneyError::Invalid(input.to_string()))?,
        _ => {
            // Make sure "12.3.4" reads as malformed, not as over-precise.
            frac_part
                .parse::<i64>()
                .map_err(|_| MoneyError::Invalid(input.to_string()))?;
            return Err(MoneyError::TooPrecise(input.to_string()));
        }
    };
    if frac < 0 {
        return Err(MoneyError::Invalid(input.to_string()));
    }

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(frac))
        .ok_or_else(|| MoneyError::Invalid(input.to_string()))?;
    Ok(if negative { -cents } else { cents })
}
