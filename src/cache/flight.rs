//! Per-key single-flight registry.
//!
//! The first caller for a key installs a shared future; callers arriving
//! while it runs await the same future and receive a clone of its output.
//! Check-and-insert happens under one lock, so there is never more than
//! one flight per key.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

/// How a caller took part in a flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Started the flight
    Leader,
    /// Joined a flight already in progress
    Follower,
}

struct Flight<T> {
    id: u64,
    future: Shared<BoxFuture<'static, T>>,
}

pub struct SingleFlight<T: Clone> {
    flights: Mutex<HashMap<String, Flight<T>>>,
    next_id: AtomicU64,
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        SingleFlight {
            flights: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Run `start()` for `key` unless a flight for it is already running.
    ///
    /// `start` is only invoked by the leader. The registry entry is removed
    /// once the flight has produced its output.
    pub async fn run<F, Fut>(&self, key: &str, start: F) -> (T, Role)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (id, future, role) = {
            let mut flights = self.flights.lock();
            match flights.get(key) {
                Some(flight) => (flight.id, flight.future.clone(), Role::Follower),
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let future = start().boxed().shared();
                    flights.insert(
                        key.to_string(),
                        Flight {
                            id,
                            future: future.clone(),
                        },
                    );
                    (id, future, Role::Leader)
                }
            }
        };

        let output = future.await;

        let mut flights = self.flights.lock();
        if flights.get(key).is_some_and(|flight| flight.id == id) {
            flights.remove(key);
        }
        (output, role)
    }

    /// Whether a flight for `key` is currently registered
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.flights.lock().contains_key(key)
    }
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        SingleFlight::new()
    }
}
