//! Per-channel bucket record and its on-flash byte layout.
//!
//! Binary format (little-endian, packed, 184 bytes):
//! - minute_td: 1 byte (u8)
//! - minute: 60 bytes (60 × u8)
//! - hour_td: 1 byte (u8)
//! - hour: 24 bytes (24 × u8)
//! - day_td: 2 bytes (u16)
//! - day: 62 bytes (31 × u16)
//! - month_td: 2 bytes (u16)
//! - month: 24 bytes (12 × u16)
//! - year_td: 4 bytes (u32)
//! - year: 4 bytes (u32)
//!
//! Field widths define the wrap behaviour of the accumulators, so they are
//! part of the contract and must not be widened.

use core::fmt::Display;

use super::{DAYS_IN_MONTH_MAX, HOURS_IN_DAY, MINUTES_IN_HOUR, MONTHS_IN_YEAR};

/// Encoded size of one [`BucketRecord`]
pub const RECORD_SIZE: usize = 1
    + MINUTES_IN_HOUR
    + 1
    + HOURS_IN_DAY
    + 2
    + DAYS_IN_MONTH_MAX * 2
    + 2
    + MONTHS_IN_YEAR * 2
    + 4
    + 4;

/// Snapshot of one channel: the in-progress to-date totals plus the frozen
/// history of completed periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketRecord {
    pub minute_td: u8,
    /// Frozen per-minute totals for the current hour
    pub minute: [u8; MINUTES_IN_HOUR],
    pub hour_td: u8,
    /// Frozen per-hour totals for the current day
    pub hour: [u8; HOURS_IN_DAY],
    pub day_td: u16,
    /// Frozen per-day totals, indexed by day of month − 1
    pub day: [u16; DAYS_IN_MONTH_MAX],
    pub month_td: u16,
    /// Frozen per-month totals, indexed 0 = January
    pub month: [u16; MONTHS_IN_YEAR],
    pub year_td: u32,
    /// Frozen total of the previous year
    pub year: u32,
}

impl Default for BucketRecord {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Display for BucketRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "[BucketRecord] MinTD={} HourTD={} DayTD={} MonTD={} YearTD={} Year={}",
            self.minute_td, self.hour_td, self.day_td, self.month_td, self.year_td, self.year
        )
    }
}

impl BucketRecord {
    /// A record with every field zeroed, the state of a channel at first boot
    pub const ZERO: Self = Self {
        minute_td: 0,
        minute: [0; MINUTES_IN_HOUR],
        hour_td: 0,
        hour: [0; HOURS_IN_DAY],
        day_td: 0,
        day: [0; DAYS_IN_MONTH_MAX],
        month_td: 0,
        month: [0; MONTHS_IN_YEAR],
        year_td: 0,
        year: 0,
    };

    /// Returns the encoded size of this structure in bytes (184).
    pub const fn size() -> usize {
        RECORD_SIZE
    }

    /// True when every to-date and historical field reads zero
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Converts the record to its packed byte layout.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0u8; RECORD_SIZE];
        let mut offset = 0;

        bytes[offset] = self.minute_td;
        offset += 1;
        bytes[offset..offset + MINUTES_IN_HOUR].copy_from_slice(&self.minute);
        offset += MINUTES_IN_HOUR;

        bytes[offset] = self.hour_td;
        offset += 1;
        bytes[offset..offset + HOURS_IN_DAY].copy_from_slice(&self.hour);
        offset += HOURS_IN_DAY;

        bytes[offset..offset + 2].copy_from_slice(&self.day_td.to_le_bytes());
        offset += 2;
        for &value in &self.day {
            bytes[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
            offset += 2;
        }

        bytes[offset..offset + 2].copy_from_slice(&self.month_td.to_le_bytes());
        offset += 2;
        for &value in &self.month {
            bytes[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
            offset += 2;
        }

        bytes[offset..offset + 4].copy_from_slice(&self.year_td.to_le_bytes());
        offset += 4;
        bytes[offset..offset + 4].copy_from_slice(&self.year.to_le_bytes());

        bytes
    }

    /// Creates a record from its packed byte layout.
    pub fn from_bytes(bytes: &[u8; RECORD_SIZE]) -> Self {
        let mut record = Self::ZERO;
        let mut offset = 0;

        record.minute_td = bytes[offset];
        offset += 1;
        record
            .minute
            .copy_from_slice(&bytes[offset..offset + MINUTES_IN_HOUR]);
        offset += MINUTES_IN_HOUR;

        record.hour_td = bytes[offset];
        offset += 1;
        record
            .hour
            .copy_from_slice(&bytes[offset..offset + HOURS_IN_DAY]);
        offset += HOURS_IN_DAY;

        record.day_td = read_u16(bytes, offset);
        offset += 2;
        for slot in record.day.iter_mut() {
            *slot = read_u16(bytes, offset);
            offset += 2;
        }

        record.month_td = read_u16(bytes, offset);
        offset += 2;
        for slot in record.month.iter_mut() {
            *slot = read_u16(bytes, offset);
            offset += 2;
        }

        record.year_td = read_u32(bytes, offset);
        offset += 4;
        record.year = read_u32(bytes, offset);

        record
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    let mut value_bytes = [0u8; 2];
    value_bytes.copy_from_slice(&bytes[offset..offset + 2]);
    u16::from_le_bytes(value_bytes)
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut value_bytes = [0u8; 4];
    value_bytes.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(value_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_size() {
        assert_eq!(BucketRecord::size(), 184, "BucketRecord must encode to 184 bytes");
    }

    #[test]
    fn test_default_is_zero() {
        assert!(BucketRecord::default().is_zero());
    }

    #[test]
    fn test_field_order_in_layout() {
        let mut record = BucketRecord::ZERO;
        record.minute_td = 0xAA;
        record.minute[59] = 0x11;
        record.hour_td = 0xBB;
        record.day_td = 0x0102;
        record.year = 0xDEAD_BEEF;

        let bytes = record.to_bytes();

        assert_eq!(bytes[0], 0xAA);
        assert_eq!(bytes[60], 0x11);
        assert_eq!(bytes[61], 0xBB);
        // day_td follows the 24 hour slots, little-endian
        assert_eq!(bytes[86], 0x02);
        assert_eq!(bytes[87], 0x01);
        assert_eq!(&bytes[180..184], &[0xEF, 0xBE, 0xAD, 0xDE]);
    }

    #[test]
    fn test_record_serialization() {
        let mut record = BucketRecord::ZERO;
        record.minute_td = 7;
        record.minute[12] = 200;
        record.hour_td = 3;
        record.hour[23] = 255;
        record.day_td = 1000;
        record.day[30] = 65_535;
        record.month_td = 4321;
        record.month[11] = 12_345;
        record.year_td = 99_999;
        record.year = 1_234_567;

        let deserialized = BucketRecord::from_bytes(&record.to_bytes());

        assert_eq!(record, deserialized);
    }
}
