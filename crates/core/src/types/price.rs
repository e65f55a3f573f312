//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are held in the currency's standard unit (euros, not cents) as a
//! [`Decimal`], so listing prices and order totals never pass through binary
//! floating point.
//!
//! # Minor units
//!
//! The payment processor works in integer minor units (cents). The conversion
//! in [`Price::to_minor_units`] multiplies by 100 and rounds to the nearest
//! cent with **half away from zero** (`0.005` becomes `1`, `-0.005` becomes
//! `-1`). For the positive amounts the storefront deals in this matches the
//! browser's `Math.round(price * 100)`.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of minor units (cents) in one major unit.
const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Errors that can occur when validating or converting a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Listing prices must be strictly positive.
    #[error("price must be greater than zero")]
    NotPositive,
    /// Listing prices are stored with cent precision.
    #[error("price must have at most two decimal places")]
    TooPrecise,
    /// The amount does not fit the processor's integer minor units.
    #[error("price {0} is out of range")]
    OutOfRange(Decimal),
}

/// A monetary amount in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(transparent))]
pub struct Price(Decimal);

impl Price {
    /// A zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal amount without validation.
    ///
    /// Use [`Price::listing`] for amounts entered by an administrator.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Validate an amount as a catalog listing price.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::NotPositive`] for zero or negative amounts and
    /// [`PriceError::TooPrecise`] for fractions of a cent.
    pub fn listing(amount: Decimal) -> Result<Self, PriceError> {
        if amount <= Decimal::ZERO {
            return Err(PriceError::NotPositive);
        }
        if amount.normalize().scale() > 2 {
            return Err(PriceError::TooPrecise);
        }
        Ok(Self(amount))
    }

    /// Build a price from integer minor units (cents).
    #[must_use]
    pub fn from_minor_units(minor: i64) -> Self {
        Self(Decimal::new(minor, 2))
    }

    /// Convert to integer minor units, rounding half away from zero.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::OutOfRange`] if the result does not fit in `i64`.
    pub fn to_minor_units(&self) -> Result<i64, PriceError> {
        self.0
            .checked_mul(Decimal::from(MINOR_UNITS_PER_MAJOR))
            .map(|cents| cents.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|cents| cents.to_i64())
            .ok_or(PriceError::OutOfRange(self.0))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is strictly positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Multiply by an item quantity.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Format for display, e.g. `"120.00 €"`.
    #[must_use]
    pub fn display(&self) -> String {
        format!("{:.2} €", self.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Price {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}
