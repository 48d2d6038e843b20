//! Bounded, newest-first reading buffer

use smartmeter_shared::wire::Reading;
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// Keeps the most recent readings, newest first
pub struct ReadingStore {
    readings: RwLock<VecDeque<Reading>>,
    capacity: usize,
}

impl ReadingStore {
    /// Create a store holding at most `capacity` readings
    pub fn new(capacity: usize) -> Self {
        Self {
            readings: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Insert a reading at the front, dropping the oldest beyond capacity.
    /// Returns the number of readings held afterwards.
    pub async fn push(&self, reading: Reading) -> usize {
        let mut readings = self.readings.write().await;
        readings.push_front(reading);
        readings.truncate(self.capacity);
        readings.len()
    }

    /// The newest `limit` readings, then narrowed to `user_id` if given
    pub async fn recent(&self, limit: usize, user_id: Option<&str>) -> Vec<Reading> {
        let readings = self.readings.read().await;
        readings
            .iter()
            .take(limit)
            .filter(|r| user_id.map_or(true, |id| r.user_id() == Some(id)))
            .cloned()
            .collect()
    }

    /// Number of readings held
    pub async fn count(&self) -> usize {
        self.readings.read().await.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ReadingStore {
    fn default() -> Self {
        Self::new(smartmeter_shared::electrical::MAX_READINGS)
    }
}
