//! Keyed single-flight execution
//!
//! Concurrent callers asking for the same key share one execution of the work:
//! the first caller stores a shared, not-yet-resolved future under the key and
//! every later caller awaits that same future. The entry is removed as soon as
//! the work resolves, so the next call for the key starts fresh.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

type Calls<K, T> = Arc<Mutex<HashMap<K, Shared<BoxFuture<'static, T>>>>>;

/// Deduplicates concurrent executions of the same keyed work
pub struct SingleFlight<K, T> {
    calls: Calls<K, T>,
}

impl<K, T> Clone for SingleFlight<K, T> {
    fn clone(&self) -> Self {
        Self {
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<K, T> Default for SingleFlight<K, T> {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `work` for `key` unless a run for that key is already in flight
    ///
    /// `work` is only called by the caller that starts the run. Every caller
    /// receives a clone of the same outcome.
    pub async fn run<F, Fut>(&self, key: K, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let call = {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            match calls.get(&key) {
                Some(call) => call.clone(),
                None => {
                    let registry = Arc::clone(&self.calls);
                    let entry = key.clone();
                    let fut = work();
                    let call = async move {
                        let outcome = fut.await;
                        registry
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .remove(&entry);
                        outcome
                    }
                    .boxed()
                    .shared();
                    calls.insert(key, call.clone());
                    call
                }
            }
        };

        call.await
    }

    /// Whether work for `key` is currently in flight
    pub fn in_flight(&self, key: &K) -> bool {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }
}
