//! Deduplication of concurrent identical requests.
//!
//! The registry maps a request key to a single-assignment, multi-waiter
//! completion handle (a `tokio::sync::watch` channel). The check-then-register
//! step happens under one mutex acquisition, so at most one fetch owns a key
//! at any time. The owner's guard removes the entry on drop, which covers the
//! success, failure, and panic paths alike.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::debug;

/// Terminal state of an owned fetch, shared with every waiter.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome<T> {
    pub value: Option<T>,
    pub missing: Vec<String>,
}

type FlightMap<T> = Arc<Mutex<HashMap<String, watch::Receiver<Option<FetchOutcome<T>>>>>>;

/// Map from request key to the completion handle of the fetch that owns it.
pub struct InFlightRegistry<T> {
    flights: FlightMap<T>,
}

impl<T: Clone> Default for InFlightRegistry<T> {
    fn default() -> Self {
        Self {
            flights: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

/// Outcome of the atomic check-then-register step.
pub enum Flight<T> {
    /// This caller owns the fetch and must publish through the guard.
    Owner(FlightGuard<T>),
    /// Another caller owns the fetch; await its published outcome.
    Waiter(watch::Receiver<Option<FetchOutcome<T>>>),
}

impl<T: Clone> InFlightRegistry<T> {
    /// Join the fetch already registered for `key`, or register a new one.
    pub fn join_or_begin(&self, key: &str) -> Flight<T> {
        let mut flights = self.flights.lock().expect("in-flight mutex poisoned");
        if let Some(rx) = flights.get(key) {
            debug!(%key, "joining in-flight computation");
            return Flight::Waiter(rx.clone());
        }

        let (tx, rx) = watch::channel(None);
        flights.insert(key.to_string(), rx);
        Flight::Owner(FlightGuard {
            key: key.to_string(),
            flights: Arc::clone(&self.flights),
            tx,
        })
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.flights.lock().expect("in-flight mutex poisoned").len()
    }
}

/// Owner handle for one registered fetch. Publishing wakes every waiter;
/// dropping unregisters the key unconditionally.
pub struct FlightGuard<T> {
    key: String,
    flights: FlightMap<T>,
    tx: watch::Sender<Option<FetchOutcome<T>>>,
}

impl<T> FlightGuard<T> {
    pub fn publish(&self, outcome: FetchOutcome<T>) {
        // Send only fails when every waiter is gone, which is fine.
        let _ = self.tx.send(Some(outcome));
    }
}

impl<T> Drop for FlightGuard<T> {
    fn drop(&mut self) {
        if let Ok(mut flights) = self.flights.lock() {
            flights.remove(&self.key);
        }
    }
}

/// Suspend until the owning fetch publishes. A `None` return means the owner
/// was dropped without publishing (it panicked or was aborted).
pub async fn await_outcome<T: Clone>(
    mut rx: watch::Receiver<Option<FetchOutcome<T>>>,
) -> Option<FetchOutcome<T>> {
    match rx.wait_for(|slot| slot.is_some()).await {
        Ok(slot) => slot.clone(),
        Err(_) => None,
    }
}
