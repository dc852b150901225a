pub mod counter;
pub mod image;
pub mod record;

pub use counter::*;
pub use image::*;
pub use record::*;

/// Historical minute slots per channel
pub const MINUTES_IN_HOUR: usize = 60;
/// Historical hour slots per channel
pub const HOURS_IN_DAY: usize = 24;
/// Day slots are sized for the longest month
pub const DAYS_IN_MONTH_MAX: usize = 31;
/// Historical month slots per channel
pub const MONTHS_IN_YEAR: usize = 12;

/// Largest channel count a store can be created with
pub const MAX_CHANNELS: usize = 255;

/// The to-date accumulators kept for every channel.
///
/// Each one has its own width and wraps independently of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accumulator {
    /// 8 bit, frozen every minute
    Minute,
    /// 8 bit, frozen at the top of every hour
    Hour,
    /// 16 bit, frozen at midnight
    Day,
    /// 16 bit, frozen at midnight on the 1st
    Month,
    /// 32 bit, frozen at midnight on the 1st of January
    Year,
}

impl Accumulator {
    /// Get a short label for display
    pub const fn label(self) -> &'static str {
        match self {
            Self::Minute => "Min",
            Self::Hour => "Hour",
            Self::Day => "Day",
            Self::Month => "Mon",
            Self::Year => "Year",
        }
    }

    /// Largest value the accumulator holds before wrapping to zero
    pub const fn max_value(self) -> u32 {
        match self {
            Self::Minute | Self::Hour => u8::MAX as u32,
            Self::Day | Self::Month => u16::MAX as u32,
            Self::Year => u32::MAX,
        }
    }
}

/// Outcome of a call to [`PulseCounter::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceStatus {
    /// Seconds were nonzero or this minute was already processed; nothing changed
    Repeated,
    /// A rollup ran
    Normal,
    /// A rollup ran at 23:59 on the last day of the month and unused day slots were cleared
    MonthEnd,
}

/// A to-date accumulator wrapped to zero before it was frozen.
///
/// Advisory only: the wrapped value is still stored at the next rollup, so the
/// period undercounts. It means pulses arrive faster than the accumulator can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow {
    pub channel: usize,
    pub accumulator: Accumulator,
}
