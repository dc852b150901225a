//! Broken-down calendar time and month-length queries.
//!
//! The counter never reads a wall clock itself. Drivers hand it a
//! [`CalendarTime`] each tick, built either from an RTC/SNTP source or from
//! Unix seconds via [`CalendarTime::from_unix_secs`].

use core::fmt::Display;

use crate::error::CounterError;
use crate::storage::{HOURS_IN_DAY, MINUTES_IN_HOUR, MONTHS_IN_YEAR};

const SECONDS_IN_MINUTE: u8 = 60;
const SECONDS_IN_DAY: i64 = 86_400;

/// Gregorian leap year rule
pub const fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` (0 = January) of `year`.
///
/// Months outside 0..=11 report 31 so callers sizing arrays never undershoot.
pub const fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        1 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        3 | 5 | 8 | 10 => 30,
        _ => 31,
    }
}

/// Validated broken-down UTC time.
///
/// Month is zero based (0 = January), day of month is one based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarTime {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
}

impl CalendarTime {
    /// Build a time, rejecting any field outside its calendar range.
    pub fn new(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<Self, CounterError> {
        if usize::from(month) >= MONTHS_IN_YEAR
            || day == 0
            || day > days_in_month(year, month)
            || usize::from(hour) >= HOURS_IN_DAY
            || usize::from(minute) >= MINUTES_IN_HOUR
            || second >= SECONDS_IN_MINUTE
        {
            return Err(CounterError::InvalidTime);
        }

        Ok(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
    }

    /// Convert seconds since the Unix epoch (UTC) into calendar fields.
    pub fn from_unix_secs(secs: u64) -> Result<Self, CounterError> {
        let secs = i64::try_from(secs).map_err(|_| CounterError::InvalidTime)?;
        let days = secs.div_euclid(SECONDS_IN_DAY);
        let rem = secs.rem_euclid(SECONDS_IN_DAY);

        // Civil-from-days over 400 year eras, with years starting in March
        let z = days + 719_468;
        let era = z.div_euclid(146_097);
        let doe = z - era * 146_097;
        let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
        let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
        let mp = (5 * doy + 2) / 153;
        let day = doy - (153 * mp + 2) / 5 + 1;
        let month = if mp < 10 { mp + 2 } else { mp - 10 };
        let year = yoe + era * 400 + i64::from(month <= 1);

        let year = u16::try_from(year).map_err(|_| CounterError::InvalidTime)?;

        Self::new(
            year,
            month as u8,
            day as u8,
            (rem / 3600) as u8,
            ((rem % 3600) / 60) as u8,
            (rem % 60) as u8,
        )
    }

    pub const fn year(&self) -> u16 {
        self.year
    }

    /// Zero based month index (0 = January)
    pub const fn month(&self) -> u8 {
        self.month
    }

    /// One based day of month
    pub const fn day(&self) -> u8 {
        self.day
    }

    pub const fn hour(&self) -> u8 {
        self.hour
    }

    pub const fn minute(&self) -> u8 {
        self.minute
    }

    pub const fn second(&self) -> u8 {
        self.second
    }

    /// Length of the month this time falls in
    pub const fn days_in_month(&self) -> u8 {
        days_in_month(self.year, self.month)
    }

    pub const fn is_last_day_of_month(&self) -> bool {
        self.day == self.days_in_month()
    }
}

impl Display for CalendarTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year,
            self.month + 1,
            self.day,
            self.hour,
            self.minute,
            self.second
        )
    }
}
