use serde::{Deserialize, Serialize};

extern crate alloc;
use alloc::vec::Vec;

use crate::error::CounterError;

/// Device configuration, stored as a postcard blob next to the counter image.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct Config<'a> {
    pub counter: CounterConfig<'a>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct CounterConfig<'a> {
    /// Number of pulse inputs, 1..=255
    pub channel_count: u16,
    /// Display name per channel; channels without one are shown by index
    #[serde(borrow)]
    pub labels: Vec<&'a str>,
}

impl<'a> Config<'a> {
    /// Decode a config blob, borrowing labels from `bytes`
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self, CounterError> {
        postcard::from_bytes(bytes).map_err(CounterError::Config)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, CounterError> {
        postcard::to_allocvec(self).map_err(CounterError::Config)
    }
}

impl<'a> CounterConfig<'a> {
    pub fn label(&self, channel: usize) -> Option<&'a str> {
        self.labels.get(channel).copied()
    }
}
