//! Per-key debounced flushes.
//!
//! Every `schedule` for a key cancels that key's pending flush and starts a
//! new delayed task. When the delay passes without another `schedule`, the
//! flush runs once. `flush_all` runs every pending flush immediately.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

pub type FlushFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
pub type FlushFn = Arc<dyn Fn(String) -> FlushFuture + Send + Sync>;

struct Pending {
    generation: u64,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct PendingMap {
    next_generation: u64,
    entries: HashMap<String, Pending>,
}

pub struct Debouncer {
    delay: Duration,
    flush: FlushFn,
    pending: Arc<Mutex<PendingMap>>,
}

impl Debouncer {
    pub fn new(delay: Duration, flush: FlushFn) -> Self {
        Self {
            delay,
            flush,
            pending: Arc::new(Mutex::new(PendingMap::default())),
        }
    }

    /// (Re)start the idle timer for `key`.
    pub fn schedule(&self, key: &str) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.next_generation += 1;
        let generation = pending.next_generation;

        let delay = self.delay;
        let flush = self.flush.clone();
        let map = self.pending.clone();
        let owned_key = key.to_string();

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Only the latest scheduled task for a key may flush it.
            let current = {
                let mut pending = map.lock().unwrap_or_else(PoisonError::into_inner);
                match pending.entries.get(&owned_key) {
                    Some(entry) if entry.generation == generation => {
                        pending.entries.remove(&owned_key);
                        true
                    }
                    _ => false,
                }
            };
            if current {
                flush(owned_key).await;
            }
        });

        if let Some(previous) = pending
            .entries
            .insert(key.to_string(), Pending { generation, task })
        {
            previous.task.abort();
        }
    }

    /// Run every pending flush now. Returns how many ran.
    pub async fn flush_all(&self) -> usize {
        let keys: Vec<String> = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending
                .entries
                .drain()
                .map(|(key, entry)| {
                    entry.task.abort();
                    key
                })
                .collect()
        };

        let count = keys.len();
        for key in keys {
            (self.flush)(key).await;
        }
        count
    }

    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, entry) in pending.entries.drain() {
            entry.task.abort();
        }
    }
}
