//! Wad - 1e18 fixed-point values and the shared rounding primitives
//!
//! Every valuation in Termlend (prices, position values, borrowing power) is a
//! `Wad`. Token amounts stay plain `u64` base units.
//!
//! Rounding direction is part of the contract of each function: `_floor`
//! variants are used for anything that benefits the borrower (values, borrowing
//! power), `_ceil` variants for anything the protocol demands or seizes (fees,
//! repay and seize amounts). Both engines call into this module so the two can
//! never disagree on a rounding rule.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 1e18 fixed-point scale
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Denominator for basis-point ratios (100% = 10_000 bps)
pub const BPS_DENOMINATOR: u128 = 10_000;

const WAD_DECIMALS: u32 = 18;

/// Errors raised by fixed-point arithmetic.
///
/// Nothing in this module wraps or saturates.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Arithmetic underflow")]
    Underflow,

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Negative value cannot be represented as a wad")]
    Negative,
}

/// `a * b / c`, rounded down
pub fn mul_div_floor(a: u128, b: u128, c: u128) -> Result<u128, MathError> {
    if c == 0 {
        return Err(MathError::DivisionByZero);
    }
    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    Ok(product / c)
}

/// `a * b / c`, rounded up
pub fn mul_div_ceil(a: u128, b: u128, c: u128) -> Result<u128, MathError> {
    if c == 0 {
        return Err(MathError::DivisionByZero);
    }
    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    div_ceil(product, c)
}

/// `a / b`, rounded up
pub fn div_ceil(a: u128, b: u128) -> Result<u128, MathError> {
    if b == 0 {
        return Err(MathError::DivisionByZero);
    }
    let quotient = a / b;
    if a % b == 0 {
        Ok(quotient)
    } else {
        Ok(quotient + 1)
    }
}

/// `amount * bps / 10_000`, rounded up. Used for fees.
pub fn bps_of_amount_ceil(amount: u64, bps: u16) -> Result<u64, MathError> {
    let fee = mul_div_ceil(amount as u128, bps as u128, BPS_DENOMINATOR)?;
    u64::try_from(fee).map_err(|_| MathError::Overflow)
}

/// Convert a human-readable decimal into a wad, truncating digits past 1e-18.
pub fn from_decimal(value: Decimal) -> Result<Wad, MathError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(MathError::Negative);
    }
    let mantissa = value.mantissa() as u128;
    let scale = value.scale();
    let raw = if scale <= WAD_DECIMALS {
        let factor = 10u128.pow(WAD_DECIMALS - scale);
        mantissa.checked_mul(factor).ok_or(MathError::Overflow)?
    } else {
        mantissa / 10u128.pow(scale - WAD_DECIMALS)
    };
    Ok(Wad(raw))
}

/// A non-negative 1e18 fixed-point number.
///
/// # Example
/// ```
/// use termlend_core::Wad;
///
/// let price = Wad::from_integer(5);
/// let value = price.times_amount(100).unwrap();
/// assert_eq!(value, Wad::from_integer(500));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wad(u128);

impl Wad {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(WAD);

    #[inline]
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Whole units. `u64::MAX` whole units still fit in a `u128`.
    #[inline]
    pub const fn from_integer(units: u64) -> Self {
        Self(units as u128 * WAD)
    }

    #[inline]
    pub const fn raw(&self) -> u128 {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn try_add(self, other: Wad) -> Result<Wad, MathError> {
        self.0.checked_add(other.0).map(Wad).ok_or(MathError::Overflow)
    }

    pub fn try_sub(self, other: Wad) -> Result<Wad, MathError> {
        self.0.checked_sub(other.0).map(Wad).ok_or(MathError::Underflow)
    }

    /// `self - other`, or zero when `other >= self`
    pub fn saturating_gap(self, other: Wad) -> Wad {
        Wad(self.0.saturating_sub(other.0))
    }

    /// Value of `amount` base units priced at `self` per unit (exact).
    pub fn times_amount(self, amount: u64) -> Result<Wad, MathError> {
        self.0
            .checked_mul(amount as u128)
            .map(Wad)
            .ok_or(MathError::Overflow)
    }

    /// `self * numerator / denominator`, rounded down
    pub fn mul_ratio_floor(self, numerator: u128, denominator: u128) -> Result<Wad, MathError> {
        mul_div_floor(self.0, numerator, denominator).map(Wad)
    }

    /// `self * numerator / denominator`, rounded up
    pub fn mul_ratio_ceil(self, numerator: u128, denominator: u128) -> Result<Wad, MathError> {
        mul_div_ceil(self.0, numerator, denominator).map(Wad)
    }

    /// `self * bps / 10_000`, rounded down
    pub fn mul_bps_floor(self, bps: u16) -> Result<Wad, MathError> {
        self.mul_ratio_floor(bps as u128, BPS_DENOMINATOR)
    }

    /// `self * bps / 10_000`, rounded up
    pub fn mul_bps_ceil(self, bps: u16) -> Result<Wad, MathError> {
        self.mul_ratio_ceil(bps as u128, BPS_DENOMINATOR)
    }

    /// Number of base units priced at `price` that `self` buys, rounded down.
    pub fn to_amount_floor(self, price: Wad) -> Result<u64, MathError> {
        if price.is_zero() {
            return Err(MathError::DivisionByZero);
        }
        u64::try_from(self.0 / price.0).map_err(|_| MathError::Overflow)
    }

    /// Number of base units priced at `price` needed to cover `self`, rounded up.
    pub fn to_amount_ceil(self, price: Wad) -> Result<u64, MathError> {
        let units = div_ceil(self.0, price.0)?;
        u64::try_from(units).map_err(|_| MathError::Overflow)
    }

    /// Lossless conversion for reporting; fails past the 96-bit decimal mantissa.
    pub fn to_decimal(self) -> Result<Decimal, MathError> {
        let raw = i128::try_from(self.0).map_err(|_| MathError::Overflow)?;
        Decimal::try_from_i128_with_scale(raw, WAD_DECIMALS)
            .map(|d| d.normalize())
            .map_err(|_| MathError::Overflow)
    }
}

impl fmt::Display for Wad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / WAD;
        let frac = self.0 % WAD;
        if frac == 0 {
            write!(f, "{}", whole)
        } else {
            let digits = format!("{:018}", frac);
            write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
        }
    }
}

impl TryFrom<Decimal> for Wad {
    type Error = MathError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        from_decimal(value)
    }
}
