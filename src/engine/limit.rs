//! Daily usage ceiling on account debits.
//!
//! The counter is date-scoped: the first check of a new day resets usage to
//! zero before consuming. The reset and the consume are plain in-memory
//! mutations; they only become visible through the same version-guarded
//! save as the balance, which is what makes concurrent rollovers safe.

use chrono::NaiveDate;

use crate::Amount;
use crate::engine::error::DailyLimitExceeded;

/// Default ceiling on daily debits from a main account.
pub const DEFAULT_DAILY_MAX: Amount = Amount::from_minor(3_000_000);

/// Per-account daily usage state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyLimit {
    used: Amount,
    max: Amount,
    period: NaiveDate,
}

impl DailyLimit {
    pub fn new(max: Amount, today: NaiveDate) -> Self {
        Self {
            used: Amount::ZERO,
            max,
            period: today,
        }
    }

    /// Usage consumed so far within the current period.
    pub fn used(&self) -> Amount {
        self.used
    }

    pub fn max(&self) -> Amount {
        self.max
    }

    /// The calendar date the usage applies to.
    pub fn period(&self) -> NaiveDate {
        self.period
    }

    /// Roll the period over if the date has advanced, then consume `amount`
    /// against the ceiling. On rejection the counter is left untouched.
    pub fn check_and_consume(
        &mut self,
        amount: Amount,
        today: NaiveDate,
    ) -> Result<(), DailyLimitExceeded> {
        if self.period < today {
            self.used = Amount::ZERO;
            self.period = today;
        }

        let next = self.used + amount;
        if next > self.max {
            return Err(DailyLimitExceeded {
                used: self.used,
                requested: amount,
                max: self.max,
            });
        }

        self.used = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn limit(max: i64) -> DailyLimit {
        DailyLimit::new(Amount::from_minor(max), date(1))
    }

    #[test]
    fn consume_accumulates_within_a_day() {
        let mut l = limit(1000);
        l.check_and_consume(Amount::from_minor(400), date(1)).unwrap();
        l.check_and_consume(Amount::from_minor(600), date(1)).unwrap();
        assert_eq!(l.used(), Amount::from_minor(1000));
    }

    #[test]
    fn exceeding_the_ceiling_leaves_usage_unchanged() {
        let mut l = limit(3_000_000);
        l.check_and_consume(Amount::from_minor(2_800_000), date(1)).unwrap();

        let err = l
            .check_and_consume(Amount::from_minor(300_000), date(1))
            .unwrap_err();
        assert_eq!(err.used, Amount::from_minor(2_800_000));
        assert_eq!(err.requested, Amount::from_minor(300_000));
        assert_eq!(l.used(), Amount::from_minor(2_800_000));
    }

    #[test]
    fn exact_ceiling_is_allowed() {
        let mut l = limit(1000);
        l.check_and_consume(Amount::from_minor(1000), date(1)).unwrap();
        assert_eq!(l.used(), l.max());
    }

    #[test]
    fn new_day_resets_usage_before_consuming() {
        let mut l = limit(1000);
        l.check_and_consume(Amount::from_minor(900), date(1)).unwrap();

        l.check_and_consume(Amount::from_minor(800), date(2)).unwrap();
        assert_eq!(l.used(), Amount::from_minor(800));
        assert_eq!(l.period(), date(2));
    }

    #[test]
    fn rollover_happens_even_when_the_check_fails() {
        let mut l = limit(1000);
        l.check_and_consume(Amount::from_minor(900), date(1)).unwrap();

        // the new day's usage starts at zero, so only amounts above the full
        // ceiling are rejected
        let err = l
            .check_and_consume(Amount::from_minor(1500), date(2))
            .unwrap_err();
        assert_eq!(err.used, Amount::ZERO);
        assert_eq!(l.used(), Amount::ZERO);
        assert_eq!(l.period(), date(2));
    }

    #[test]
    fn same_day_repeat_check_does_not_reset() {
        let mut l = limit(1000);
        l.check_and_consume(Amount::from_minor(500), date(1)).unwrap();
        l.check_and_consume(Amount::from_minor(100), date(1)).unwrap();
        assert_eq!(l.used(), Amount::from_minor(600));
    }
}
