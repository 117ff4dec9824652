use std::fmt;
use std::iter::Sum;

/// Monetary amount as a count of minor units, stored as a scaled integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_minor(value: i64) -> Self {
        Amount(value)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Round up to the next multiple of `unit`.
    ///
    /// Replenishment credits are only granted in whole units, so a shortfall
    /// of 400 with a 10,000 unit becomes a 10,000 credit.
    pub fn round_up_to(self, unit: Amount) -> Amount {
        debug_assert!(unit.0 > 0, "rounding unit must be positive");
        // Equivalent to `self.0.div_ceil(unit.0)`, which is unstable for
        // signed integers (int_roundings, rust-lang/rust#88581).
        let d = self.0 / unit.0;
        let r = self.0 % unit.0;
        let ceil = if (r > 0 && unit.0 > 0) || (r < 0 && unit.0 < 0) {
            d + 1
        } else {
            d
        };
        Amount(ceil * unit.0)
    }

    /// Divide by `n`, truncating toward zero.
    pub fn div_floor(self, n: i64) -> Amount {
        Amount(self.0 / n)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Amount {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Amount(self.0 - rhs.0)
    }
}

impl std::ops::Mul<i64> for Amount {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Amount(self.0 * rhs)
    }
}

impl std::ops::AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::ops::SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}
