//! Keyed trailing-edge debounce.
//!
//! Each call takes a fresh generation for its key and schedules the task after
//! the idle delay; when the delay elapses only the task holding the latest
//! generation runs, and the key is forgotten.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct Debouncer<K> {
    delay: Duration,
    generations: Arc<Mutex<HashMap<K, u64>>>,
    counter: AtomicU64,
}

fn lock<K>(m: &Mutex<HashMap<K, u64>>) -> MutexGuard<'_, HashMap<K, u64>> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    pub fn new(delay: Duration) -> Self {
        Self { delay, generations: Arc::new(Mutex::new(HashMap::new())), counter: AtomicU64::new(0) }
    }

    pub fn delay(&self) -> Duration { self.delay }

    /// Keys with a task still waiting out the delay.
    pub fn pending(&self) -> usize { lock(&self.generations).len() }

    /// Schedules `task` for `key`. The handle resolves to `None` when a later
    /// call for the same key superseded this one.
    pub fn call<F, Fut>(&self, key: K, task: F) -> JoinHandle<Option<Fut::Output>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let generation = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        lock(&self.generations).insert(key.clone(), generation);
        let generations = self.generations.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut generations = lock(&generations);
                if generations.get(&key) != Some(&generation) { return None; }
                generations.remove(&key);
            }
            Some(task().await)
        })
    }
}
