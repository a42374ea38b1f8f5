//! Type-safe price representation using decimal arithmetic.
//!
//! The provider stores amounts as integers in the smallest currency unit
//! (centavos for BRL). `Price` converts them into a `Decimal` in the
//! standard unit and renders them the way `Intl.NumberFormat("pt-BR",
//! { style: "currency", currency: "BRL" })` does:
//!
//! ```rust
//! use ignite_shop_core::{CurrencyCode, Price};
//!
//! let price = Price::from_minor_units(123_456, CurrencyCode::BRL);
//! assert_eq!(price.to_string(), "R$\u{a0}1.234,56");
//! ```

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Separator between the currency symbol and the amount (no-break space).
const SYMBOL_SEPARATOR: char = '\u{a0}';

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., reais, not centavos).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a price from an integer amount in the smallest currency unit.
    #[must_use]
    pub fn from_minor_units(units: i64, currency_code: CurrencyCode) -> Self {
        Self {
            amount: Decimal::new(units, currency_code.minor_unit_exponent()),
            currency_code,
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let exponent = self.currency_code.minor_unit_exponent();
        let rounded = self
            .amount
            .abs()
            .round_dp_with_strategy(exponent, RoundingStrategy::MidpointAwayFromZero);
        let digits = format!("{rounded:.prec$}", prec = exponent as usize);
        let (integer, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), ""));

        if self.amount.is_sign_negative() && !rounded.is_zero() {
            f.write_str("-")?;
        }
        write!(
            f,
            "{}{SYMBOL_SEPARATOR}{}",
            self.currency_code.symbol(),
            group_thousands(integer, self.currency_code.group_separator())
        )?;
        if !fraction.is_empty() {
            write!(f, "{}{fraction}", self.currency_code.decimal_separator())?;
        }
        Ok(())
    }
}

/// Insert a separator every three digits, counting from the right.
fn group_thousands(integer: &str, separator: char) -> String {
    let len = integer.len();
    let mut grouped = String::with_capacity(len + len / 3);
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(c);
    }
    grouped
}

/// ISO 4217 currency codes supported by the storefront.
///
/// Display rules follow the currency's home locale (`pt-BR` for BRL).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    BRL,
}

impl CurrencyCode {
    /// ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::BRL => "BRL",
        }
    }

    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::BRL => "R$",
        }
    }

    /// Number of decimal places in the smallest currency unit.
    #[must_use]
    pub const fn minor_unit_exponent(self) -> u32 {
        match self {
            Self::BRL => 2,
        }
    }

    const fn group_separator(self) -> char {
        match self {
            Self::BRL => '.',
        }
    }

    const fn decimal_separator(self) -> char {
        match self {
            Self::BRL => ',',
        }
    }
}
