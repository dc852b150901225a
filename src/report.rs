//! Text rendering of the counter buckets.
//!
//! Prints, per channel, the to-date totals followed by one row per history
//! level with the slot for the current time marked.

use core::fmt::{self, Write};

use crate::calendar::CalendarTime;
use crate::config::CounterConfig;
use crate::storage::{Accumulator, PulseCounter};

const SGR_CYAN: &str = "\x1b[36m";
const SGR_RESET: &str = "\x1b[0m";

/// How the slot for the current time is marked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    /// ANSI cyan, for terminals
    Ansi,
    /// Square brackets, for logs and plain text sinks
    Brackets,
}

impl Highlight {
    fn open(self) -> &'static str {
        match self {
            Self::Ansi => SGR_CYAN,
            Self::Brackets => "[",
        }
    }

    fn close(self) -> &'static str {
        match self {
            Self::Ansi => SGR_RESET,
            Self::Brackets => "]",
        }
    }
}

/// Render every channel of `counter` into `out`.
///
/// `labels` supplies channel names; channels without a label are shown by index.
pub fn write_report<W: Write>(
    out: &mut W,
    counter: &PulseCounter<'_>,
    now: &CalendarTime,
    labels: Option<&CounterConfig<'_>>,
    highlight: Highlight,
) -> fmt::Result {
    for (index, record) in counter.records().iter().enumerate() {
        match labels.and_then(|config| config.label(index)) {
            Some(label) => write!(out, "{} ({})", index, label)?,
            None => write!(out, "{}", index)?,
        }
        writeln!(
            out,
            ": MinTD={}  HourTD={}  DayTD={}  MonTD={}  YearTD={}",
            record.minute_td, record.hour_td, record.day_td, record.month_td, record.year_td
        )?;

        write_row(
            out,
            Accumulator::Minute,
            &record.minute,
            usize::from(now.minute()),
            highlight,
        )?;
        write_row(
            out,
            Accumulator::Hour,
            &record.hour,
            usize::from(now.hour()),
            highlight,
        )?;
        write_row(
            out,
            Accumulator::Day,
            &record.day,
            usize::from(now.day()) - 1,
            highlight,
        )?;
        write_row(
            out,
            Accumulator::Month,
            &record.month,
            usize::from(now.month()),
            highlight,
        )?;
        writeln!(out, "{:<4}:  {}", Accumulator::Year.label(), record.year)?;
        writeln!(out)?;
    }

    Ok(())
}

fn write_row<W: Write, T: fmt::Display>(
    out: &mut W,
    level: Accumulator,
    slots: &[T],
    current: usize,
    highlight: Highlight,
) -> fmt::Result {
    write!(out, "{:<4}:", level.label())?;
    for (index, value) in slots.iter().enumerate() {
        if index == current {
            write!(out, "  {}{}{}", highlight.open(), value, highlight.close())?;
        } else {
            write!(out, "  {}", value)?;
        }
    }
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    #[test]
    fn test_report_marks_current_slots() {
        let counter = PulseCounter::new(1).unwrap();
        for _ in 0..5 {
            counter.increment(0).unwrap();
        }
        let now = CalendarTime::new(2024, 2, 1, 0, 0, 0).unwrap();
        counter.advance(&now);

        let mut out = String::new();
        write_report(&mut out, &counter, &now, None, Highlight::Brackets).unwrap();

        let lines: alloc::vec::Vec<&str> = out.lines().collect();
        assert_eq!(
            lines[0],
            "0: MinTD=0  HourTD=0  DayTD=0  MonTD=0  YearTD=5"
        );
        assert!(lines[1].starts_with("Min :  [5]  0  0"));
        assert!(lines[2].starts_with("Hour:  [5]  0"));
        assert!(lines[3].starts_with("Day :  [5]  0"));
        assert_eq!(lines[4], "Mon :  0  0  [5]  0  0  0  0  0  0  0  0  0");
        assert_eq!(lines[5], "Year:  0");
    }

    #[test]
    fn test_report_uses_labels_and_ansi() {
        let counter = PulseCounter::new(2).unwrap();
        let config = CounterConfig {
            channel_count: 2,
            labels: alloc::vec!["water"],
        };
        let now = CalendarTime::new(2024, 5, 10, 10, 15, 0).unwrap();

        let mut out = String::new();
        write_report(&mut out, &counter, &now, Some(&config), Highlight::Ansi).unwrap();

        assert!(out.starts_with("0 (water): MinTD=0"));
        assert!(out.contains("\n1: MinTD=0"));
        assert!(out.contains("\x1b[36m0\x1b[0m"));
    }
}
