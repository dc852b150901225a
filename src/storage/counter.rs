use core::cell::RefCell;
use core::sync::atomic::{AtomicU8, AtomicU16, AtomicU32, Ordering};

use critical_section::Mutex;
use log::{debug, info, warn};

extern crate alloc;
use alloc::boxed::Box;
use alloc::vec::Vec;

use super::{
    Accumulator, AdvanceStatus, BucketRecord, DAYS_IN_MONTH_MAX, HOURS_IN_DAY, MAX_CHANNELS,
    MINUTES_IN_HOUR, MONTHS_IN_YEAR, Overflow,
};
use crate::calendar::CalendarTime;
use crate::config::CounterConfig;
use crate::error::CounterError;
use crate::events::{CounterEvent, EventPublisher};

/// Cursor value before any minute has been processed
const NO_MINUTE: u8 = u8::MAX;

/// In-progress totals, written from interrupt context.
///
/// Each accumulator is an atomic of its record width so that an increment is
/// a single wrapping add and a freeze is a single swap.
struct ToDate {
    minute: AtomicU8,
    hour: AtomicU8,
    day: AtomicU16,
    month: AtomicU16,
    year: AtomicU32,
}

impl ToDate {
    fn new(record: &BucketRecord) -> Self {
        Self {
            minute: AtomicU8::new(record.minute_td),
            hour: AtomicU8::new(record.hour_td),
            day: AtomicU16::new(record.day_td),
            month: AtomicU16::new(record.month_td),
            year: AtomicU32::new(record.year_td),
        }
    }

    /// Count one pulse in every accumulator, calling `on_wrap` for each one
    /// that rolled over to zero.
    fn increment(&self, mut on_wrap: impl FnMut(Accumulator)) {
        if self.minute.fetch_add(1, Ordering::Relaxed) == u8::MAX {
            on_wrap(Accumulator::Minute);
        }
        if self.hour.fetch_add(1, Ordering::Relaxed) == u8::MAX {
            on_wrap(Accumulator::Hour);
        }
        if self.day.fetch_add(1, Ordering::Relaxed) == u16::MAX {
            on_wrap(Accumulator::Day);
        }
        if self.month.fetch_add(1, Ordering::Relaxed) == u16::MAX {
            on_wrap(Accumulator::Month);
        }
        if self.year.fetch_add(1, Ordering::Relaxed) == u32::MAX {
            on_wrap(Accumulator::Year);
        }
    }
}

/// Frozen totals, only touched by the rollup and by readers
struct History {
    minute: [u8; MINUTES_IN_HOUR],
    hour: [u8; HOURS_IN_DAY],
    day: [u16; DAYS_IN_MONTH_MAX],
    month: [u16; MONTHS_IN_YEAR],
    year: u32,
}

impl History {
    fn new(record: &BucketRecord) -> Self {
        Self {
            minute: record.minute,
            hour: record.hour,
            day: record.day,
            month: record.month,
            year: record.year,
        }
    }
}

struct Channel {
    to_date: ToDate,
    history: Mutex<RefCell<History>>,
    /// Accumulator wraps seen since start
    overflows: AtomicU32,
}

impl Channel {
    fn new(record: &BucketRecord) -> Self {
        Self {
            to_date: ToDate::new(record),
            history: Mutex::new(RefCell::new(History::new(record))),
            overflows: AtomicU32::new(0),
        }
    }

    fn snapshot(&self) -> BucketRecord {
        critical_section::with(|cs| {
            let history = self.history.borrow_ref(cs);
            BucketRecord {
                minute_td: self.to_date.minute.load(Ordering::Relaxed),
                minute: history.minute,
                hour_td: self.to_date.hour.load(Ordering::Relaxed),
                hour: history.hour,
                day_td: self.to_date.day.load(Ordering::Relaxed),
                day: history.day,
                month_td: self.to_date.month.load(Ordering::Relaxed),
                month: history.month,
                year_td: self.to_date.year.load(Ordering::Relaxed),
                year: history.year,
            }
        })
    }

    /// Apply one tick's cascade to this channel.
    ///
    /// A pulse landing between two swaps is counted in the new period of the
    /// coarser accumulator; that skew is accepted.
    fn roll(&self, now: &CalendarTime, cascade: &Cascade) {
        let to_date = &self.to_date;

        critical_section::with(|cs| {
            let mut history = self.history.borrow_ref_mut(cs);

            history.minute[usize::from(now.minute())] = to_date.minute.swap(0, Ordering::Relaxed);

            if cascade.hour {
                history.hour[usize::from(now.hour())] = to_date.hour.swap(0, Ordering::Relaxed);
            }
            if cascade.month_end {
                // Slots past the end of a short month must not keep a longer month's totals
                history.day[usize::from(now.day())..].fill(0);
            }
            if cascade.day {
                history.day[usize::from(now.day()) - 1] = to_date.day.swap(0, Ordering::Relaxed);
            }
            if cascade.month {
                history.month[usize::from(now.month())] =
                    to_date.month.swap(0, Ordering::Relaxed);
            }
            if cascade.year {
                history.year = to_date.year.swap(0, Ordering::Relaxed);
            }
        });
    }
}

/// Which levels roll on a given tick.
///
/// Each level only rolls when the one below it did, so the flags form a
/// ripple carry keyed to wall-clock boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cascade {
    hour: bool,
    month_end: bool,
    day: bool,
    month: bool,
    year: bool,
}

impl Cascade {
    fn plan(now: &CalendarTime) -> Self {
        let hour = now.minute() == 0;
        let month_end = !hour
            && usize::from(now.minute()) == MINUTES_IN_HOUR - 1
            && usize::from(now.hour()) == HOURS_IN_DAY - 1
            && now.is_last_day_of_month();
        let day = (hour || month_end) && now.hour() == 0;
        let month = day && now.day() == 1;
        let year = month && now.month() == 0;

        Self {
            hour,
            month_end,
            day,
            month,
            year,
        }
    }
}

/// Fixed set of per-channel pulse counters with minute/hour/day/month/year history.
///
/// Storage for every channel is allocated once at construction. All
/// operations take `&self`: [`increment`](Self::increment) is lock-free and
/// safe to call from an interrupt handler, while [`advance`](Self::advance)
/// is driven by a periodic task and holds a critical section for one
/// channel at a time.
///
/// ## Usage
///
/// ```rust,ignore
/// let counter = PulseCounter::new(2)?;
///
/// // From the pulse interrupt
/// counter.increment(0)?;
///
/// // Once per second from the clock task
/// let status = counter.advance(&CalendarTime::from_unix_secs(now)?);
/// ```
pub struct PulseCounter<'a> {
    channels: Box<[Channel]>,
    /// Minute field of the last processed tick, or `NO_MINUTE`
    last_minute: AtomicU8,
    events: Option<EventPublisher<'a>>,
}

impl<'a> PulseCounter<'a> {
    /// Create a store of `channel_count` zeroed channels.
    pub fn new(channel_count: usize) -> Result<Self, CounterError> {
        check_channel_count(channel_count)?;

        let channels = (0..channel_count)
            .map(|_| Channel::new(&BucketRecord::ZERO))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        info!("Pulse counter initialised with {} channels", channel_count);

        Ok(Self {
            channels,
            last_minute: AtomicU8::new(NO_MINUTE),
            events: None,
        })
    }

    /// Create a store sized by the configured channel count
    pub fn from_config(config: &CounterConfig<'_>) -> Result<Self, CounterError> {
        Self::new(usize::from(config.channel_count))
    }

    /// Rebuild a store from previously captured records and rollup cursor.
    pub fn from_records(
        records: &[BucketRecord],
        last_minute: Option<u8>,
    ) -> Result<Self, CounterError> {
        check_channel_count(records.len())?;

        let last_minute = match last_minute {
            Some(minute) if usize::from(minute) >= MINUTES_IN_HOUR => {
                return Err(CounterError::InvalidTime);
            }
            Some(minute) => minute,
            None => NO_MINUTE,
        };

        let channels = records
            .iter()
            .map(Channel::new)
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            channels,
            last_minute: AtomicU8::new(last_minute),
            events: None,
        })
    }

    /// Publish rollup and overflow events to `publisher`
    pub fn with_events(mut self, publisher: EventPublisher<'a>) -> Self {
        self.events = Some(publisher);
        self
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Minute of the last tick that rolled up, if any
    pub fn last_minute(&self) -> Option<u8> {
        match self.last_minute.load(Ordering::Relaxed) {
            NO_MINUTE => None,
            minute => Some(minute),
        }
    }

    /// Record one pulse on `index`.
    ///
    /// Bounded and lock-free. An accumulator that wraps is reported through
    /// the log, the channel's overflow tally and the event channel, but the
    /// pulse is still counted and the call succeeds.
    pub fn increment(&self, index: usize) -> Result<(), CounterError> {
        let channel = self
            .channels
            .get(index)
            .ok_or(CounterError::IndexOutOfRange {
                index,
                channel_count: self.channels.len(),
            })?;

        channel.to_date.increment(|accumulator| {
            channel.overflows.fetch_add(1, Ordering::Relaxed);
            warn!(
                "Channel {} {} accumulator wrapped, pulse rate too high",
                index,
                accumulator.label()
            );
            self.publish(CounterEvent::Overflow(Overflow {
                channel: index,
                accumulator,
            }));
        });

        Ok(())
    }

    /// Roll the bucket hierarchy forward for the minute `now` falls in.
    ///
    /// Only acts on the first call at `hh:mm:00` of a new minute; any other
    /// call returns [`AdvanceStatus::Repeated`] and changes nothing, so it is
    /// safe to call every second.
    pub fn advance(&self, now: &CalendarTime) -> AdvanceStatus {
        if now.second() != 0 || self.last_minute.load(Ordering::Relaxed) == now.minute() {
            return AdvanceStatus::Repeated;
        }
        self.last_minute.store(now.minute(), Ordering::Relaxed);

        let cascade = Cascade::plan(now);
        for channel in self.channels.iter() {
            channel.roll(now, &cascade);
        }

        let status = if cascade.month_end {
            info!("Month end at {}, cleared unused day slots", now);
            AdvanceStatus::MonthEnd
        } else {
            AdvanceStatus::Normal
        };

        if cascade.year {
            info!("Year rollup at {}", now);
        }
        debug!("Rollup at {}: {:?}", now, cascade);

        self.publish(CounterEvent::Advanced { at: *now, status });

        status
    }

    /// Copy of one channel's to-date and historical fields
    pub fn record(&self, index: usize) -> Option<BucketRecord> {
        self.channels.get(index).map(Channel::snapshot)
    }

    /// Copies of every channel, in channel order
    pub fn records(&self) -> Vec<BucketRecord> {
        self.channels.iter().map(Channel::snapshot).collect()
    }

    /// Accumulator wraps seen on `index` since this store was created
    pub fn overflow_count(&self, index: usize) -> Option<u32> {
        self.channels
            .get(index)
            .map(|channel| channel.overflows.load(Ordering::Relaxed))
    }

    fn publish(&self, event: CounterEvent) {
        if let Some(publisher) = &self.events {
            publisher.publish_immediate(event);
        }
    }
}

fn check_channel_count(channel_count: usize) -> Result<(), CounterError> {
    if channel_count == 0 || channel_count > MAX_CHANNELS {
        return Err(CounterError::InvalidArgument { channel_count });
    }
    Ok(())
}
