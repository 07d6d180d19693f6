//! Calendar source for the daily dedup window.

use chrono::{NaiveDate, Utc};

pub trait Clock: Send + Sync {
    /// The current calendar day. Must not change within a single day.
    fn today(&self) -> NaiveDate;
}

/// Production clock. Days roll over at 00:00 UTC regardless of host timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct UtcClock;

impl Clock for UtcClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Clock pinned to a day that tests advance by hand.
#[cfg(test)]
pub struct ManualClock {
    day: parking_lot::Mutex<NaiveDate>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(day: NaiveDate) -> Self {
        Self {
            day: parking_lot::Mutex::new(day),
        }
    }

    pub fn advance_days(&self, days: u64) {
        let mut day = self.day.lock();
        *day = *day + chrono::Days::new(days);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        *self.day.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        clock.advance_days(1);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn test_utc_clock_matches_utc_date() {
        let before = Utc::now().date_naive();
        let today = UtcClock.today();
        let after = Utc::now().date_naive();
        assert!(today >= before && today <= after);
    }
}
