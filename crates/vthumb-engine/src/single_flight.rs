//! In-process single-flight execution.
//!
//! At most one execution per key runs at a time; concurrent callers for the
//! same key wait for its result instead of starting their own. The entry
//! for a key is removed when the leader finishes or is dropped, so a
//! cancelled leader never leaves waiters blocked: they wake up and one of
//! them takes over.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

type Inflight<K, V> = Arc<Mutex<HashMap<K, watch::Receiver<Option<V>>>>>;

/// How a caller obtained its value.
#[derive(Debug, Clone, PartialEq)]
pub enum Flight<V> {
    /// This caller ran the work.
    Led(V),
    /// Another caller's run produced the value.
    Shared(V),
}

impl<V> Flight<V> {
    pub fn into_inner(self) -> V {
        match self {
            Flight::Led(v) | Flight::Shared(v) => v,
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, Flight::Shared(_))
    }
}

/// Per-key single-flight group.
pub struct SingleFlight<K, V> {
    inflight: Inflight<K, V>,
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

enum Role<V> {
    Leader(watch::Sender<Option<V>>),
    Follower(watch::Receiver<Option<V>>),
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with a run in progress.
    pub fn in_flight(&self) -> usize {
        lock(&self.inflight).len()
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        lock(&self.inflight).contains_key(key)
    }

    /// Run `work` for `key`, or wait for the run already in progress.
    pub async fn run<F, Fut>(&self, key: K, work: F) -> Flight<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        loop {
            match self.join_or_lead(&key) {
                Role::Leader(tx) => {
                    let _guard = FlightGuard {
                        inflight: Arc::clone(&self.inflight),
                        key: key.clone(),
                    };
                    let value = work().await;
                    tx.send_replace(Some(value.clone()));
                    return Flight::Led(value);
                }
                Role::Follower(mut rx) => {
                    if let Ok(value) = rx.wait_for(Option::is_some).await {
                        if let Some(value) = value.clone() {
                            return Flight::Shared(value);
                        }
                    }
                    // Leader dropped without a result; try again
                }
            }
        }
    }

    fn join_or_lead(&self, key: &K) -> Role<V> {
        let mut inflight = lock(&self.inflight);
        if let Some(rx) = inflight.get(key) {
            return Role::Follower(rx.clone());
        }
        let (tx, rx) = watch::channel(None);
        inflight.insert(key.clone(), rx);
        Role::Leader(tx)
    }
}

/// Removes the leader's entry on every exit path, including cancellation.
struct FlightGuard<K: Eq + Hash, V> {
    inflight: Inflight<K, V>,
    key: K,
}

impl<K: Eq + Hash, V> Drop for FlightGuard<K, V> {
    fn drop(&mut self) {
        lock(&self.inflight).remove(&self.key);
    }
}

fn lock<K, V>(inflight: &Inflight<K, V>) -> MutexGuard<'_, HashMap<K, watch::Receiver<Option<V>>>> {
    inflight.lock().unwrap_or_else(|e| e.into_inner())
}
