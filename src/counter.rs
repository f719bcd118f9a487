use log::{debug, warn};

use crate::store::{keys, Store};

/// A persistent tally counter.
///
/// The value is stored as a plain decimal string; anything unreadable
/// restores as zero.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Counter {
    value: i64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn add(&mut self, n: i64) -> i64 {
        self.value = self.value.saturating_add(n);
        self.value
    }

    pub fn sub(&mut self, n: i64) -> i64 {
        self.value = self.value.saturating_sub(n);
        self.value
    }

    pub fn reset(&mut self) -> i64 {
        self.value = 0;
        self.value
    }

    pub fn load(store: &dyn Store) -> Self {
        let value = match store.get(keys::COUNTER) {
            Some(raw) => match raw.trim().parse() {
                Ok(value) => value,
                Err(e) => {
                    debug!("Discarding malformed counter value: {}", e);
                    0
                }
            },
            None => 0,
        };

        Self { value }
    }

    pub fn save(&self, store: &dyn Store) {
        if let Err(e) = store.set(keys::COUNTER, &self.value.to_string()) {
            warn!("Failed to persist counter: {:#}", e);
        }
    }
}
