// ── Reading history ──
//
// Bounded, newest-first buffer of readings for one device. Seeded once from
// the REST bootstrap, then grown one streamed update at a time. Entries
// are never reordered or deduplicated.

use std::collections::VecDeque;

use sensorlink_api::SensorReading;

/// Readings kept per device.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    readings: VecDeque<SensorReading>,
    capacity: usize,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Replace the contents wholesale. `readings` must already be
    /// newest-first; anything past capacity is dropped from the old end.
    pub fn bootstrap(&mut self, readings: impl IntoIterator<Item = SensorReading>) {
        self.readings.clear();
        self.readings
            .extend(readings.into_iter().take(self.capacity));
    }

    /// Prepend one reading, evicting the oldest past capacity.
    pub fn ingest(&mut self, reading: SensorReading) {
        self.readings.push_front(reading);
        self.readings.truncate(self.capacity);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn latest(&self) -> Option<&SensorReading> {
        self.readings.front()
    }

    /// Newest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &SensorReading> + ExactSizeIterator + Clone {
        self.readings.iter()
    }

    pub fn to_vec(&self) -> Vec<SensorReading> {
        self.readings.iter().cloned().collect()
    }
}
