//! Currency codes and money formatting.
//!
//! Amounts are carried as [`Decimal`] in the currency's standard unit
//! (dollars, not cents). Conversion to minor units happens only at the
//! payment-provider boundary.

use core::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes the store sells in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol used in the admin UI.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Three-letter ISO code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when parsing an unsupported currency code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported currency: {0}")]
pub struct UnknownCurrency(pub String);

impl FromStr for CurrencyCode {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            _ => Err(UnknownCurrency(s.to_string())),
        }
    }
}

/// Format an amount for display, e.g. `$19.99`.
///
/// Rounds half away from zero to two places. No thousands separators.
#[must_use]
pub fn format_money(amount: Decimal, currency: CurrencyCode) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{}{:.2}", currency.symbol(), rounded.abs())
    } else {
        format!("{}{:.2}", currency.symbol(), rounded)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(Decimal::new(500, 0), CurrencyCode::USD), "$500.00");
        assert_eq!(format_money(Decimal::new(1999, 2), CurrencyCode::GBP), "£19.99");
        assert_eq!(format_money(Decimal::new(12345, 3), CurrencyCode::EUR), "€12.35");
        assert_eq!(format_money(Decimal::new(-50, 1), CurrencyCode::CAD), "-$5.00");
    }

    #[test]
    fn test_currency_from_str_is_case_insensitive() {
        assert_eq!("usd".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert_eq!(" Aud ".parse::<CurrencyCode>().unwrap(), CurrencyCode::AUD);
        assert!("JPY".parse::<CurrencyCode>().is_err());
    }
}
