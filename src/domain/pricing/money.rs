use serde::{Deserialize, Serialize};
use std::fmt;

/// Amount of money in minor units (cents). All pricing math is integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    pub fn checked_mul(self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(i64::from(quantity)).map(Money)
    }

    /// `self * basis_points / 10_000`, rounded half up.
    pub fn percent_bp(self, basis_points: u32) -> Option<Money> {
        let scaled = i128::from(self.0) * i128::from(basis_points);
        let rounded = (scaled + 5_000).div_euclid(10_000);
        i64::try_from(rounded).ok().map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_rounds_half_up() {
        // 15% of 9.99 = 1.4985 -> 1.50
        assert_eq!(Money::from_cents(999).percent_bp(1_500), Some(Money::from_cents(150)));
        // 10% of 0.05 = 0.005 -> 0.01
        assert_eq!(Money::from_cents(5).percent_bp(1_000), Some(Money::from_cents(1)));
        // 10% of 0.04 = 0.004 -> 0.00
        assert_eq!(Money::from_cents(4).percent_bp(1_000), Some(Money::ZERO));
        assert_eq!(Money::from_cents(1234).percent_bp(10_000), Some(Money::from_cents(1234)));
    }

    #[test]
    fn test_checked_arithmetic() {
        let a = Money::from_cents(250);
        assert_eq!(a.checked_mul(3), Some(Money::from_cents(750)));
        assert_eq!(a.checked_add(Money::from_cents(50)), Some(Money::from_cents(300)));
        assert_eq!(a.checked_sub(Money::from_cents(300)), Some(Money::from_cents(-50)));
        assert_eq!(Money::from_cents(i64::MAX).checked_add(a), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1999).to_string(), "19.99");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-150).to_string(), "-1.50");
    }
}
