// Copyright (c) 2025 sokdak, dns-ingress
// SPDX-License-Identifier: MIT

//! Process-local, phase-keyed exponential backoff for reconcile requeues.
//!
//! Each `(namespace, name, phase)` triple owns an independent delay that
//! doubles on every failure of that phase and resets when the phase succeeds.
//! Keying per phase keeps failures in one phase from slowing retries of
//! another on the same object.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use dns_ingress::backoff::BackoffStore;
//!
//! let store = BackoffStore::new(Duration::from_secs(1), Duration::from_secs(300));
//! let first = store.next("default", "app", "Zone-Get");
//! let second = store.next("default", "app", "Zone-Get");
//! assert_eq!(second, first * 2);
//! store.reset("default", "app", "Zone-Get");
//! assert_eq!(store.next("default", "app", "Zone-Get"), first);
//! ```

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Thread-safe per-(object, phase) exponential backoff store.
pub struct BackoffStore {
    /// Delay returned on the first failure of a phase.
    initial: Duration,
    /// Cap on the returned delay.
    max: Duration,
    /// Next delay per backoff key.
    entries: Mutex<HashMap<String, Duration>>,
}

impl BackoffStore {
    /// Create a store with the given initial and maximum delays.
    ///
    /// # Arguments
    ///
    /// * `initial` - Delay returned on the first failure of a phase
    /// * `max` - Cap on the delay a phase can grow to
    ///
    /// # Returns
    ///
    /// An empty store; keys are created lazily on first use.
    #[must_use]
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Get the next delay for a phase and grow the stored delay.
    ///
    /// Returns the initial delay on first use of a key, then doubles up to
    /// the configured maximum on each subsequent call.
    ///
    /// # Arguments
    ///
    /// * `namespace` - Namespace of the object being reconciled
    /// * `name` - Name of the object being reconciled
    /// * `phase` - Phase label (e.g., "Zone-Get"); must be used verbatim so
    ///   retries of the same phase accumulate
    ///
    /// # Returns
    ///
    /// The delay to wait before requeueing this phase.
    pub fn next(&self, namespace: &str, name: &str, phase: &str) -> Duration {
        let key = backoff_key(namespace, name, phase);
        let mut entries = self.entries.lock().expect("backoff store lock poisoned");
        let entry = entries.entry(key).or_insert(self.initial);
        let delay = *entry;
        *entry = (*entry * 2).min(self.max);
        delay
    }

    /// Reset a phase's delay after it succeeds.
    ///
    /// The next failure of the phase starts again from the initial delay, so
    /// a transient provider hiccup does not permanently slow an object down.
    ///
    /// # Arguments
    ///
    /// * `namespace` - Namespace of the object being reconciled
    /// * `name` - Name of the object being reconciled
    /// * `phase` - Phase label whose delay is cleared
    pub fn reset(&self, namespace: &str, name: &str, phase: &str) {
        let key = backoff_key(namespace, name, phase);
        let mut entries = self.entries.lock().expect("backoff store lock poisoned");
        entries.remove(&key);
    }
}

fn backoff_key(namespace: &str, name: &str, phase: &str) -> String {
    format!("{namespace}/{name}/{phase}")
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod backoff_tests;
