use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    pubsub::{PubSubChannel, Publisher, Subscriber},
};

use crate::calendar::CalendarTime;
use crate::storage::{AdvanceStatus, Overflow};

/// Channel capacity for pub-sub events
/// Set to 8 to absorb a month-end tick plus a burst of overflow reports
pub const EVENT_CHANNEL_CAPACITY: usize = 8;

/// Number of subscribers that can listen to counter events
/// - Subscriber 0: persistence task (writes the store image after rollups)
/// - Subscriber 1: reporting/UI task
pub const EVENT_SUBSCRIBERS: usize = 2;

/// Number of publishers (just the counter)
pub const EVENT_PUBLISHERS: usize = 1;

/// Events published by the counter to notify subscribers of state changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterEvent {
    /// A minute tick was processed and buckets rolled up
    Advanced {
        at: CalendarTime,
        status: AdvanceStatus,
    },
    /// A to-date accumulator wrapped on increment
    Overflow(Overflow),
}

pub type EventChannel = PubSubChannel<
    CriticalSectionRawMutex,
    CounterEvent,
    EVENT_CHANNEL_CAPACITY,
    EVENT_SUBSCRIBERS,
    EVENT_PUBLISHERS,
>;

pub type EventPublisher<'a> = Publisher<
    'a,
    CriticalSectionRawMutex,
    CounterEvent,
    EVENT_CHANNEL_CAPACITY,
    EVENT_SUBSCRIBERS,
    EVENT_PUBLISHERS,
>;

pub type EventSubscriber<'a> = Subscriber<
    'a,
    CriticalSectionRawMutex,
    CounterEvent,
    EVENT_CHANNEL_CAPACITY,
    EVENT_SUBSCRIBERS,
    EVENT_PUBLISHERS,
>;
