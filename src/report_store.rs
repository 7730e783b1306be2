//! Keyed accumulation of incoming reports.
//!
//! The store assigns its own monotonically increasing keys at insertion
//! time; keys are never reused, even after removal. The key is distinct
//! from whatever id the analysis engine embedded in the report payload.

use {
    crate::model::Report,
    std::sync::{Arc, Mutex},
};

/// Notified synchronously after every successful insert, exactly once.
///
/// The UI side registers an implementation to refresh its report list.
pub trait StoreObserver: Send {
    fn report_added(&mut self, key: u64, report: &Report);
}

#[derive(Debug)]
pub struct NotFoundError {
    pub key: u64,
}

impl std::fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "No report stored under key {}", self.key)
    }
}

impl std::error::Error for NotFoundError {}

/// In-memory report store.
///
/// Entries live for the process lifetime unless explicitly removed; there
/// is no eviction. Insertion order is preserved for listing.
pub struct ReportStore {
    entries: Vec<(u64, Report)>,
    next_key: u64,
    observer: Option<Arc<Mutex<dyn StoreObserver>>>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_key: 0,
            observer: None,
        }
    }

    /// Register the observer notified on every insert.
    pub fn set_observer(&mut self, observer: Arc<Mutex<dyn StoreObserver>>) {
        self.observer = Some(observer);
    }

    /// Store a report under the next unused key and return that key.
    ///
    /// The entry is visible in the store before the observer runs.
    pub fn insert(&mut self, report: Report) -> u64 {
        let key = self.next_key;
        self.next_key += 1;
        self.entries.push((key, report));

        log::debug!("Stored report under key {} ({} live)", key, self.entries.len());

        if let Some(observer) = &self.observer {
            if let (Some((_, stored)), Ok(mut observer)) = (self.entries.last(), observer.lock()) {
                observer.report_added(key, stored);
            }
        }

        key
    }

    /// Delete the entry if present; absent keys are a no-op, not an error.
    pub fn remove(&mut self, key: u64) {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| *k != key);
        if self.entries.len() < before {
            log::debug!("Removed report {} ({} live)", key, self.entries.len());
        }
    }

    pub fn get(&self, key: u64) -> Result<&Report, NotFoundError> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, report)| report)
            .ok_or(NotFoundError { key })
    }

    /// Live entries in insertion order.
    pub fn list(&self) -> impl Iterator<Item = (u64, &Report)> + '_ {
        self.entries.iter().map(|(k, report)| (*k, report))
    }

    /// Number of live entries, not the highest key ever assigned.
    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

impl Default for ReportStore {
    fn default() -> Self {
        Self::new()
    }
}
