//! Whole-store image and the persistence seam.
//!
//! Binary format (little-endian):
//! - magic: 4 bytes (`b"PCNT"`)
//! - version: 1 byte
//! - channel_count: 1 byte
//! - last_minute: 1 byte (`0xFF` before the first rollup)
//! - reserved: 1 byte (zero)
//! - records: channel_count × 184 bytes, see [`BucketRecord`]
//!
//! The backend only ever sees opaque bytes, so flash, an SD card file or RAM
//! can hold it.

use core::fmt::{Debug, Write};

use log::{error, info};

extern crate alloc;
use alloc::vec::Vec;

use super::{BucketRecord, PulseCounter, RECORD_SIZE};
use crate::error::CounterError;

pub const IMAGE_MAGIC: [u8; 4] = *b"PCNT";
pub const IMAGE_VERSION: u8 = 1;
pub const IMAGE_HEADER_SIZE: usize = 8;

const NO_MINUTE_BYTE: u8 = 0xFF;

/// Size of an image holding `channel_count` channels
pub const fn image_size(channel_count: usize) -> usize {
    IMAGE_HEADER_SIZE + channel_count * RECORD_SIZE
}

/// Non-volatile home for a store image.
pub trait ImageStore {
    type Error: Debug;

    /// Replace the stored image with `image`
    fn write_image(&mut self, image: &[u8]) -> Result<(), Self::Error>;

    /// Read back the stored image, `None` if nothing was ever written
    fn read_image(&mut self) -> Result<Option<Vec<u8>>, Self::Error>;
}

/// Image store held in RAM, for hosts and tests
#[derive(Debug, Default, Clone)]
pub struct RamImageStore {
    image: Option<Vec<u8>>,
}

impl RamImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(&self) -> Option<&[u8]> {
        self.image.as_deref()
    }
}

impl ImageStore for RamImageStore {
    type Error = core::convert::Infallible;

    fn write_image(&mut self, image: &[u8]) -> Result<(), Self::Error> {
        self.image = Some(image.to_vec());
        Ok(())
    }

    fn read_image(&mut self) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.image.clone())
    }
}

impl<'a> PulseCounter<'a> {
    /// Encode every channel and the rollup cursor into a store image.
    pub fn to_image(&self) -> Vec<u8> {
        let records = self.records();
        let mut image = Vec::with_capacity(image_size(records.len()));

        image.extend_from_slice(&IMAGE_MAGIC);
        image.push(IMAGE_VERSION);
        // Channel count is capped at 255 on construction
        image.push(records.len() as u8);
        image.push(self.last_minute().unwrap_or(NO_MINUTE_BYTE));
        image.push(0);

        for record in &records {
            image.extend_from_slice(&record.to_bytes());
        }

        image
    }

    /// Rebuild a store from an image produced by [`to_image`](Self::to_image).
    pub fn from_image(image: &[u8]) -> Result<Self, CounterError> {
        if image.len() < IMAGE_HEADER_SIZE {
            return Err(CounterError::CorruptImage("truncated header"));
        }
        if image[0..4] != IMAGE_MAGIC {
            return Err(CounterError::CorruptImage("bad magic"));
        }
        if image[4] != IMAGE_VERSION {
            return Err(CounterError::CorruptImage("unsupported version"));
        }

        let channel_count = usize::from(image[5]);
        if channel_count == 0 {
            return Err(CounterError::CorruptImage("no channels"));
        }
        if image.len() != image_size(channel_count) {
            return Err(CounterError::CorruptImage("length does not match channel count"));
        }

        let last_minute = match image[6] {
            NO_MINUTE_BYTE => None,
            minute if minute < 60 => Some(minute),
            _ => return Err(CounterError::CorruptImage("bad rollup cursor")),
        };

        let records = image[IMAGE_HEADER_SIZE..]
            .chunks_exact(RECORD_SIZE)
            .map(|chunk| {
                let mut bytes = [0u8; RECORD_SIZE];
                bytes.copy_from_slice(chunk);
                BucketRecord::from_bytes(&bytes)
            })
            .collect::<Vec<_>>();

        Self::from_records(&records, last_minute)
    }

    /// Write the current image to `store`
    pub fn persist<S: ImageStore>(&self, store: &mut S) -> Result<(), CounterError> {
        store.write_image(&self.to_image()).map_err(|e| {
            error!("Failed to persist pulse counters: {:?}", e);
            storage_error(&e)
        })?;

        info!("Persisted {} pulse counter channels", self.channel_count());
        Ok(())
    }

    /// Load the store image from `store`, or start zeroed if none was saved.
    ///
    /// A saved image for a different channel count is rejected rather than
    /// reshaped.
    pub fn restore<S: ImageStore>(
        store: &mut S,
        channel_count: usize,
    ) -> Result<Self, CounterError> {
        let image = store.read_image().map_err(|e| {
            error!("Failed to read pulse counter image: {:?}", e);
            storage_error(&e)
        })?;

        let Some(image) = image else {
            info!("No saved pulse counters, starting from zero");
            return Self::new(channel_count);
        };

        let counter = Self::from_image(&image)?;
        if counter.channel_count() != channel_count {
            return Err(CounterError::ChannelCountMismatch {
                expected: channel_count,
                found: counter.channel_count(),
            });
        }

        info!("Restored {} pulse counter channels", channel_count);
        Ok(counter)
    }
}

fn storage_error(e: &impl Debug) -> CounterError {
    let mut message = heapless::String::<64>::new();
    // Overlong messages are truncated, which is fine for a diagnostic
    let _ = write!(message, "{:?}", e);
    CounterError::Storage(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::CalendarTime;
    use crate::storage::AdvanceStatus;

    /// Backend that fails every call
    struct FailingStore;

    impl ImageStore for FailingStore {
        type Error = &'static str;

        fn write_image(&mut self, _image: &[u8]) -> Result<(), Self::Error> {
            Err("card removed")
        }

        fn read_image(&mut self) -> Result<Option<Vec<u8>>, Self::Error> {
            Err("card removed")
        }
    }

    fn busy_counter() -> PulseCounter<'static> {
        let counter = PulseCounter::new(3).unwrap();
        for _ in 0..7 {
            counter.increment(0).unwrap();
        }
        counter.increment(2).unwrap();
        counter.advance(&CalendarTime::new(2024, 1, 29, 23, 59, 0).unwrap());
        counter.increment(2).unwrap();
        counter
    }

    #[test]
    fn test_image_size() {
        let counter = PulseCounter::new(3).unwrap();
        assert_eq!(counter.to_image().len(), 8 + 3 * 184);
    }

    #[test]
    fn test_image_header() {
        let image = busy_counter().to_image();
        assert_eq!(&image[0..4], b"PCNT");
        assert_eq!(image[4], IMAGE_VERSION);
        assert_eq!(image[5], 3);
        assert_eq!(image[6], 59);
        assert_eq!(image[7], 0);

        let fresh = PulseCounter::new(1).unwrap().to_image();
        assert_eq!(fresh[6], 0xFF);
    }

    #[test]
    fn test_image_round_trip_preserves_behavior() {
        let original = busy_counter();
        let restored = PulseCounter::from_image(&original.to_image()).unwrap();

        assert_eq!(original.records(), restored.records());
        assert_eq!(original.last_minute(), restored.last_minute());

        // Same cursor, so the same minute is still a repeat
        let same_minute = CalendarTime::new(2024, 1, 29, 23, 59, 0).unwrap();
        assert_eq!(restored.advance(&same_minute), AdvanceStatus::Repeated);

        let next = CalendarTime::new(2024, 2, 1, 0, 0, 0).unwrap();
        for counter in [&original, &restored] {
            counter.increment(1).unwrap();
            assert_eq!(counter.advance(&next), AdvanceStatus::Normal);
        }
        assert_eq!(original.records(), restored.records());
    }

    #[test]
    fn test_corrupt_images_rejected() {
        let good = busy_counter().to_image();

        assert_eq!(
            PulseCounter::from_image(&good[..4]).err(),
            Some(CounterError::CorruptImage("truncated header"))
        );

        let mut bad_magic = good.clone();
        bad_magic[0] = b'X';
        assert_eq!(
            PulseCounter::from_image(&bad_magic).err(),
            Some(CounterError::CorruptImage("bad magic"))
        );

        let mut bad_version = good.clone();
        bad_version[4] = 2;
        assert_eq!(
            PulseCounter::from_image(&bad_version).err(),
            Some(CounterError::CorruptImage("unsupported version"))
        );

        assert_eq!(
            PulseCounter::from_image(&good[..good.len() - 1]).err(),
            Some(CounterError::CorruptImage("length does not match channel count"))
        );

        let mut no_channels = good[..IMAGE_HEADER_SIZE].to_vec();
        no_channels[5] = 0;
        assert_eq!(
            PulseCounter::from_image(&no_channels).err(),
            Some(CounterError::CorruptImage("no channels"))
        );

        let mut bad_cursor = good.clone();
        bad_cursor[6] = 60;
        assert_eq!(
            PulseCounter::from_image(&bad_cursor).err(),
            Some(CounterError::CorruptImage("bad rollup cursor"))
        );
    }

    #[test]
    fn test_persist_and_restore() {
        let mut store = RamImageStore::new();
        let original = busy_counter();
        original.persist(&mut store).unwrap();

        assert_eq!(store.image().map(<[u8]>::len), Some(image_size(3)));

        let restored = PulseCounter::restore(&mut store, 3).unwrap();
        assert_eq!(original.records(), restored.records());
    }

    #[test]
    fn test_restore_without_image_starts_zeroed() {
        let mut store = RamImageStore::new();
        let counter = PulseCounter::restore(&mut store, 4).unwrap();

        assert_eq!(counter.channel_count(), 4);
        assert_eq!(counter.last_minute(), None);
        assert!(counter.records().iter().all(BucketRecord::is_zero));
    }

    #[test]
    fn test_restore_channel_count_mismatch() {
        let mut store = RamImageStore::new();
        busy_counter().persist(&mut store).unwrap();

        assert_eq!(
            PulseCounter::restore(&mut store, 2).err(),
            Some(CounterError::ChannelCountMismatch {
                expected: 2,
                found: 3
            })
        );
    }

    #[test]
    fn test_backend_errors_surface_as_storage() {
        let counter = PulseCounter::new(1).unwrap();

        match counter.persist(&mut FailingStore) {
            Err(CounterError::Storage(message)) => assert_eq!(message.as_str(), "\"card removed\""),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            PulseCounter::restore(&mut FailingStore, 1),
            Err(CounterError::Storage(_))
        ));
    }
}
