//! Hardware-independent core for interrupt-driven pulse counters
//!
//! Each channel (flow meter, energy meter, ...) counts pulses into to-date
//! accumulators which a once-a-second clock task rolls up into minute, hour,
//! day, month and year history buckets. The store can be written to and
//! restored from non-volatile memory as a fixed-layout image.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod calendar;
pub mod config;
pub mod error;
pub mod events;
pub mod report;
pub mod storage;

pub use calendar::{CalendarTime, days_in_month, is_leap_year};
pub use error::CounterError;
pub use storage::{
    Accumulator, AdvanceStatus, BucketRecord, ImageStore, Overflow, PulseCounter, RamImageStore,
};
