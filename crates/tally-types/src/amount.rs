use crate::error::TypesError;
use std::fmt;
use std::iter::Sum;
use std::str::FromStr;

/// Unsigned quantity of the treasury's native unit, also used for voting weight.
///
/// Arithmetic is explicit: `checked_*` returns `None` on overflow/underflow
/// and the ledger turns that into a rejected operation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u128::MAX);

    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    pub const fn get(&self) -> u128 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition
    pub fn checked_add(&self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Checked subtraction
    pub fn checked_sub(&self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Saturating addition
    pub fn saturating_add(&self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Saturating subtraction
    pub fn saturating_sub(&self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Convert into the signed domain used for net vote tallies.
    pub fn to_signed(&self) -> Result<i128, TypesError> {
        i128::try_from(self.0).map_err(|_| TypesError::AmountOverflow)
    }

    /// Parse from decimal string. Underscores are accepted as digit separators.
    pub fn from_decimal_str(s: &str) -> Result<Self, TypesError> {
        let digits: String = s.chars().filter(|c| *c != '_').collect();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(TypesError::InvalidAmount(s.to_string()));
        }
        digits
            .parse::<u128>()
            .map(Self)
            .map_err(|_| TypesError::AmountOverflow)
    }
}

impl From<u64> for Amount {
    fn from(val: u64) -> Self {
        Self(val as u128)
    }
}

impl From<u128> for Amount {
    fn from(val: u128) -> Self {
        Self(val)
    }
}

impl From<u32> for Amount {
    fn from(val: u32) -> Self {
        Self(val as u128)
    }
}

impl From<Amount> for u128 {
    fn from(val: Amount) -> Self {
        val.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self.0)
    }
}

impl FromStr for Amount {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_decimal_str(s.trim())
    }
}

impl Sum for Amount {
    /// Saturates at `Amount::MAX`.
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, a| acc.saturating_add(a))
    }
}
