//! Desktop simulator for the pulse-counter core.
//!
//! Runs a synthetic UTC clock one second at a time, feeds each channel with
//! pulses from a mock meter, and ticks the rollup engine every second the way
//! the firmware clock task does. The default run starts a few minutes before
//! the end of February 2024 so the month-end clearing and the 1st-of-month
//! cascade are both exercised.
//!
//! # Usage
//!
//! ```text
//! RUST_LOG=info pulse-simulator [minutes]
//! ```
//!
//! At the end the store is persisted, restored into a second counter and the
//! bucket report is printed to stdout.

use std::process::ExitCode;

use log::{error, info, warn};

use pulse_counter::config::{Config, CounterConfig};
use pulse_counter::events::{CounterEvent, EventChannel, EventSubscriber};
use pulse_counter::report::{Highlight, write_report};
use pulse_counter::{AdvanceStatus, CalendarTime, CounterError, PulseCounter, RamImageStore};

// ---------------------------------------------------------------------------
// Simulation constants
// ---------------------------------------------------------------------------

/// 2024-02-29T23:55:00Z
const SIM_START_UNIX_SECS: u64 = 1_709_250_900;

/// Simulated minutes when none are given on the command line.
const DEFAULT_SIM_MINUTES: u64 = 10;

const CHANNEL_LABELS: [&str; 3] = ["water", "gas", "electricity"];

// ---------------------------------------------------------------------------
// Mock meters
// ---------------------------------------------------------------------------

/// Generates pulses from a slowly varying flow rate.
struct MockMeter {
    /// Mean pulses per second
    mean_rate: f64,
    /// Peak deviation from the mean, pulses per second
    swing: f64,
    /// Period of the variation in seconds
    period_secs: f64,
    /// Fractional pulses carried to the next second
    carry: f64,
}

impl MockMeter {
    fn new(mean_rate: f64, swing: f64, period_secs: f64) -> Self {
        Self {
            mean_rate,
            swing,
            period_secs,
            carry: 0.0,
        }
    }

    /// Whole pulses produced during second `t`
    fn pulses_at(&mut self, t: f64) -> u32 {
        let rate = (self.mean_rate + self.swing * (t / self.period_secs).sin()).max(0.0);
        self.carry += rate;
        let whole = self.carry.floor();
        self.carry -= whole;
        whole as u32
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Encode then decode the configuration the way it would come off flash.
fn boot_config() -> Result<Vec<u8>, CounterError> {
    let config = Config {
        counter: CounterConfig {
            channel_count: CHANNEL_LABELS.len() as u16,
            labels: CHANNEL_LABELS.to_vec(),
        },
    };
    config.to_vec()
}

fn drain_events(subscriber: &mut EventSubscriber<'_>) {
    while let Some(event) = subscriber.try_next_message_pure() {
        match event {
            CounterEvent::Advanced {
                at,
                status: AdvanceStatus::MonthEnd,
            } => info!("{}: month end, unused day slots cleared", at),
            CounterEvent::Advanced { at, status } => info!("{}: rollup {:?}", at, status),
            CounterEvent::Overflow(overflow) => warn!(
                "Channel {} {} accumulator overflowed",
                overflow.channel,
                overflow.accumulator.label()
            ),
        }
    }
}

fn run(minutes: u64) -> Result<(), CounterError> {
    let config_blob = boot_config()?;
    let config = Config::from_bytes(&config_blob)?;
    let channel_count = usize::from(config.counter.channel_count);

    let mut store = RamImageStore::new();
    let events = EventChannel::new();
    let mut subscriber = events.subscriber().expect("Failed to create subscriber");
    let publisher = events.publisher().expect("Failed to create publisher");

    let counter = PulseCounter::restore(&mut store, channel_count)?.with_events(publisher);

    let mut meters = [
        MockMeter::new(0.8, 0.5, 90.0),
        MockMeter::new(0.3, 0.3, 240.0),
        MockMeter::new(2.0, 1.5, 45.0),
    ];

    let mut now = CalendarTime::from_unix_secs(SIM_START_UNIX_SECS)?;
    for second in 0..minutes * 60 {
        let unix_secs = SIM_START_UNIX_SECS + second;
        now = CalendarTime::from_unix_secs(unix_secs)?;

        for (index, meter) in meters.iter_mut().enumerate() {
            for _ in 0..meter.pulses_at(unix_secs as f64) {
                counter.increment(index)?;
            }
        }

        counter.advance(&now);
        drain_events(&mut subscriber);
    }

    counter.persist(&mut store)?;
    let restored = PulseCounter::restore(&mut store, channel_count)?;
    if restored.records() != counter.records() {
        error!("Restored store differs from the running store");
    } else {
        info!("Store image round trip verified");
    }

    let mut report = String::new();
    if write_report(
        &mut report,
        &restored,
        &now,
        Some(&config.counter),
        Highlight::Ansi,
    )
    .is_err()
    {
        error!("Failed to render report");
    }
    print!("{}", report);

    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    env_logger::init();

    let minutes = match std::env::args().nth(1) {
        Some(arg) => match arg.parse::<u64>() {
            Ok(minutes) => minutes,
            Err(e) => {
                error!("Invalid minute count {:?}: {}", arg, e);
                return ExitCode::FAILURE;
            }
        },
        None => DEFAULT_SIM_MINUTES,
    };

    info!("Starting pulse-counter simulator for {} minutes", minutes);

    match run(minutes) {
        Ok(()) => {
            info!("Simulator exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Simulation failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
