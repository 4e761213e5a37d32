use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{EngineError, ResultEngine};

/// Number of fractional digits kept for every quantity.
pub const QUANTITY_DECIMALS: u32 = 5;

const SCALE: i64 = 10_i64.pow(QUANTITY_DECIMALS);

/// Signed quantity represented as an integer count of **minor units**
/// (1 minor unit = 0.00001).
///
/// Use this type for **all** entry, drain and deed quantities in the engine:
/// every allocation is computed on integers, so rounding to 5 decimals
/// happens once, at the edge, and never drifts afterwards.
///
/// # Examples
///
/// ```rust
/// use engine::Quantity;
///
/// let qty = Quantity::from_minor(12_50000);
/// assert_eq!(qty.minor(), 1_250_000);
/// assert_eq!(qty.to_string(), "12.5");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator; rejects
/// more than 5 decimals):
///
/// ```rust
/// use engine::Quantity;
///
/// assert_eq!("10".parse::<Quantity>().unwrap().minor(), 1_000_000);
/// assert_eq!("0,00001".parse::<Quantity>().unwrap().minor(), 1);
/// assert!("1.000001".parse::<Quantity>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Quantity(i64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    /// Creates a quantity from minor units.
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Creates a quantity from whole units, saturating at the `i64` bounds.
    #[must_use]
    pub const fn from_units(units: i64) -> Self {
        Self(units.saturating_mul(SCALE))
    }

    /// Rounds a float to 5 decimals (half away from zero).
    ///
    /// Fails on NaN, infinities and values outside the representable range.
    pub fn from_f64(value: f64) -> Result<Self, EngineError> {
        if !value.is_finite() {
            return Err(EngineError::Invalid("quantity must be finite".to_string()));
        }
        let scaled = (value * SCALE as f64).round();
        if scaled > i64::MAX as f64 || scaled < i64::MIN as f64 {
            return Err(EngineError::Invalid("quantity too large".to_string()));
        }
        Ok(Self(scaled as i64))
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    #[must_use]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / SCALE as f64
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

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Quantity) -> Option<Quantity> {
        self.0.checked_add(rhs.0).map(Quantity)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Quantity) -> Option<Quantity> {
        self.0.checked_sub(rhs.0).map(Quantity)
    }

    /// Addition that fails with [`EngineError::Invalid`] on overflow.
    pub fn try_add(self, rhs: Quantity) -> ResultEngine<Quantity> {
        self.checked_add(rhs).ok_or_else(too_large)
    }

    /// Subtraction that fails with [`EngineError::Invalid`] on overflow.
    pub fn try_sub(self, rhs: Quantity) -> ResultEngine<Quantity> {
        self.checked_sub(rhs).ok_or_else(too_large)
    }

    /// Sum of `items`, failing on overflow.
    pub fn try_sum(items: impl IntoIterator<Item = Quantity>) -> ResultEngine<Quantity> {
        items
            .into_iter()
            .try_fold(Quantity::ZERO, Quantity::try_add)
    }

    #[must_use]
    pub const fn saturating_add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0.saturating_add(rhs.0))
    }

    /// `self - rhs`, clamped at zero.
    #[must_use]
    pub const fn saturating_remaining(self, rhs: Quantity) -> Quantity {
        let diff = self.0.saturating_sub(rhs.0);
        Quantity(if diff > 0 { diff } else { 0 })
    }
}

fn too_large() -> EngineError {
    EngineError::Invalid("quantity too large".to_string())
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / SCALE as u64;
        let frac = abs % SCALE as u64;
        if frac == 0 {
            return write!(f, "{sign}{units}");
        }
        let frac = format!("{frac:05}");
        write!(f, "{sign}{units}.{}", frac.trim_end_matches('0'))
    }
}

impl From<Quantity> for i64 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Quantity::from_f64(value).map_err(serde::de::Error::custom)
    }
}

impl FromStr for Quantity {
    type Err = EngineError;

    /// Parses a decimal string into minor units.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
    ///
    /// Validation rules:
    /// - max 5 fractional digits (rejects `1.000001`)
    /// - rejects empty/invalid strings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let empty = || EngineError::Invalid("empty quantity".to_string());
        let invalid = || EngineError::Invalid("invalid quantity".to_string());
        let overflow = || EngineError::Invalid("quantity too large".to_string());

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

        let units: i64 = units_str.parse().map_err(|_| overflow())?;

        let frac: i64 = match frac_str {
            None | Some("") => 0,
            Some(frac) => {
                if !frac.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid());
                }
                if frac.len() > QUANTITY_DECIMALS as usize {
                    return Err(EngineError::Invalid("too many decimals".to_string()));
                }
                let padded = format!("{frac:0<width$}", width = QUANTITY_DECIMALS as usize);
                padded.parse::<i64>().map_err(|_| invalid())?
            }
        };

        let total = units
            .checked_mul(SCALE)
            .and_then(|v| v.checked_add(frac))
            .ok_or_else(overflow)?;

        let signed = if negative {
            total.checked_neg().ok_or_else(overflow)?
        } else {
            total
        };

        Ok(Quantity(signed))
    }
}
