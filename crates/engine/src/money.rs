use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::EngineError;

/// Signed money amount represented as **integer minor units** (cents).
///
/// Use this type for **all** monetary values in the engine (costs, charges,
/// payments, balances) to avoid floating-point drift.
///
/// The value is signed:
/// - positive = amount owed / money received
/// - negative = credit / money given back
///
/// On the wire (backup archives, HTTP bodies) the amount is a JSON number in
/// major units, e.g. `18.5`.
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(18_50);
/// assert_eq!(amount.minor(), 1850);
/// assert_eq!(amount.to_string(), "18.50");
/// assert_eq!("18,5".parse::<Money>().unwrap(), amount);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Money(i64);

/// Minor units in one rounding step (one decimal place of the major unit).
pub const TENTH_MINOR: i64 = 10;

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from integer minor units.
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    /// Rounds to one decimal place of the major unit (a multiple of
    /// [`TENTH_MINOR`]), half away from zero. Saturates at the `i64` range.
    ///
    /// ```rust
    /// use engine::Money;
    ///
    /// assert_eq!(Money::new(1845).round_to_tenth(), Money::new(1850));
    /// assert_eq!(Money::new(1844).round_to_tenth(), Money::new(1840));
    /// assert_eq!(Money::new(-1845).round_to_tenth(), Money::new(-1850));
    /// ```
    #[must_use]
    pub fn round_to_tenth(self) -> Self {
        Self(saturate(
            div_round_half_away(i128::from(self.0), i128::from(TENTH_MINOR))
                * i128::from(TENTH_MINOR),
        ))
    }

    /// [`Money::round_to_tenth`] returning `None` when the rounded value
    /// leaves the `i64` range.
    #[must_use]
    pub fn checked_round_to_tenth(self) -> Option<Self> {
        let rounded = div_round_half_away(i128::from(self.0), i128::from(TENTH_MINOR))
            * i128::from(TENTH_MINOR);
        i64::try_from(rounded).ok().map(Self)
    }

    /// Multiplies a rate by a fractional quantity (e.g. hours), rounding the
    /// product to the nearest minor unit. `None` on overflow.
    #[must_use]
    pub fn checked_times(self, quantity: Quantity) -> Option<Self> {
        let product = i128::from(self.0) * i128::from(quantity.hundredths());
        let rounded = div_round_half_away(product, i128::from(Quantity::SCALE));
        i64::try_from(rounded).ok().map(Self)
    }

    /// Multiplies a rate by a whole count. `None` on overflow.
    #[must_use]
    pub fn checked_times_count(self, count: u32) -> Option<Self> {
        self.0.checked_mul(i64::from(count)).map(Self)
    }

    /// Splits the amount in `parts` shares, each rounded to one decimal place.
    ///
    /// Returns [`Money::ZERO`] when `parts` is zero.
    #[must_use]
    pub fn split_to_tenth(self, parts: usize) -> Self {
        if parts == 0 {
            return Self::ZERO;
        }
        let parts = i128::try_from(parts).unwrap_or(i128::MAX / 100);
        let tenths = div_round_half_away(i128::from(self.0), parts * i128::from(TENTH_MINOR));
        Self(saturate(tenths * i128::from(TENTH_MINOR)))
    }

    /// Sum of `amounts`, or `None` as soon as it overflows.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, amount| acc.checked_add(amount))
    }

    #[must_use]
    pub const fn saturating_add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }

    #[must_use]
    pub const fn saturating_sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Major-unit value as a float. Only meant for serialization.
    #[must_use]
    pub fn as_major_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Converts a major-unit float (as found in JSON) into minor units.
    pub fn from_major_f64(value: f64) -> Result<Self, EngineError> {
        if !value.is_finite() {
            return Err(EngineError::InvalidAmount("amount is not finite".to_string()));
        }
        let minor = (value * 100.0).round();
        if minor.abs() > i64::MAX as f64 / 2.0 {
            return Err(EngineError::InvalidAmount("amount too large".to_string()));
        }
        Ok(Self(minor as i64))
    }
}

/// Integer division rounding half away from zero. `den` must be positive.
fn div_round_half_away(num: i128, den: i128) -> i128 {
    let half = den / 2;
    if num >= 0 {
        (num + half) / den
    } else {
        -((-num + half) / den)
    }
}

fn saturate(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

/// Saturating sum. Use [`Money::checked_sum`] where an overflow must surface.
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Money::saturating_add)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_major_f64())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Money::from_major_f64(value).map_err(serde::de::Error::custom)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a decimal string into minor units.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
    /// At most 2 fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed(s, "amount").map(Money)
    }
}

/// A non-negative fractional quantity with two decimals (e.g. court hours).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity(i64);

impl Quantity {
    const SCALE: i64 = 100;

    /// A whole quantity (e.g. `Quantity::whole(2)` hours).
    #[must_use]
    pub const fn whole(units: i64) -> Self {
        Self(units * Self::SCALE)
    }

    #[must_use]
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Self(hundredths)
    }

    #[must_use]
    pub const fn hundredths(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / Self::SCALE, (self.0 % Self::SCALE).abs())
    }
}

impl FromStr for Quantity {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = parse_fixed(s, "quantity")?;
        if value < 0 {
            return Err(EngineError::InvalidAmount(
                "quantity must be >= 0".to_string(),
            ));
        }
        Ok(Quantity(value))
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0 as f64 / Self::SCALE as f64)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() || value < 0.0 {
            return Err(serde::de::Error::custom("quantity must be a non-negative number"));
        }
        Ok(Quantity((value * Self::SCALE as f64).round() as i64))
    }
}

/// Parses a signed decimal with at most two fractional digits into hundredths.
fn parse_fixed(s: &str, label: &str) -> Result<i64, EngineError> {
    let empty = || EngineError::InvalidAmount(format!("empty {label}"));
    let invalid = || EngineError::InvalidAmount(format!("invalid {label}"));
    let overflow = || EngineError::InvalidAmount(format!("{label} too large"));

    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(empty());
    }

    let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
        (true, stripped)
    } else if let Some(stripped) = trimmed.strip_prefix('+') {
        (false, stripped)
    } else {
        (false, trimmed)
    };

    let rest = rest.trim();
    if rest.is_empty() {
        return Err(empty());
    }

    let rest = rest.replace(',', ".");
    let mut parts = rest.split('.');
    let units_str = parts.next().ok_or_else(invalid)?;
    let frac_str = parts.next();
    if parts.next().is_some() {
        return Err(invalid());
    }

    if units_str.is_empty() || !units_str.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let units: i64 = units_str.parse().map_err(|_| invalid())?;

    let frac: i64 = match frac_str {
        None | Some("") => 0,
        Some(frac) => {
            if !frac.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            match frac.len() {
                1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
                2 => frac.parse::<i64>().map_err(|_| invalid())?,
                _ => {
                    return Err(EngineError::InvalidAmount(format!(
                        "too many decimals in {label}"
                    )));
                }
            }
        }
    };

    let total = units
        .checked_mul(100)
        .and_then(|v| v.checked_add(frac))
        .ok_or_else(overflow)?;

    if negative {
        total.checked_neg().ok_or_else(overflow)
    } else {
        Ok(total)
    }
}
