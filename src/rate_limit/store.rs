use crate::clock::Clock;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const DEFAULT_SHARDS: usize = 16;

/// Counter for one key in its current fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    /// Requests observed in the current window, including the one just recorded.
    pub count: u32,
    /// Absolute time (clock millis) at which the window ends.
    pub reset_at: u64,
}

impl RateLimitEntry {
    fn fresh(now: u64, window_ms: u64) -> Self {
        Self { count: 0, reset_at: now.saturating_add(window_ms) }
    }

    /// A window is over once `now` reaches `reset_at`.
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.reset_at
    }
}

type Shard = Mutex<HashMap<String, RateLimitEntry>>;

/// In-memory, process-local store of fixed-window counters.
///
/// Keys are spread over independently locked shards, so distinct keys rarely contend.
/// Every read-modify-write of an entry happens under its shard's lock; the sweeper
/// takes the same lock and decides expiry from the entry it sees there.
#[derive(Debug)]
pub struct CounterStore {
    shards: Box<[Shard]>,
    hasher: RandomState,
}

impl Default for CounterStore {
    fn default() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }
}

impl CounterStore {
    /// Create an empty store with the default shard count.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with `shards` locks (at least one).
    pub fn with_shards(shards: usize) -> Self {
        let shards = (0..shards.max(1)).map(|_| Mutex::new(HashMap::new())).collect();
        Self { shards, hasher: RandomState::new() }
    }

    fn shard(&self, key: &str) -> MutexGuard<'_, HashMap<String, RateLimitEntry>> {
        let idx = (self.hasher.hash_one(key) as usize) % self.shards.len();
        // A panic while holding the lock cannot leave an entry half-written; keep counting.
        self.shards[idx].lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one request against `key` and return the entry after incrementing.
    ///
    /// A missing or expired entry is replaced by a fresh window ending at
    /// `now + window_ms` before the increment, so counts never carry over.
    pub fn hit(&self, key: &str, window_ms: u64, now: u64) -> RateLimitEntry {
        let mut shard = self.shard(key);
        if let Some(entry) = shard.get_mut(key) {
            if entry.is_expired(now) {
                *entry = RateLimitEntry::fresh(now, window_ms);
            }
            entry.count = entry.count.saturating_add(1);
            return *entry;
        }
        let mut entry = RateLimitEntry::fresh(now, window_ms);
        entry.count = 1;
        shard.insert(key.to_string(), entry);
        entry
    }

    /// Current entry for `key`, if one exists (expired or not).
    pub fn get(&self, key: &str) -> Option<RateLimitEntry> {
        self.shard(key).get(key).copied()
    }

    /// Delete every entry whose window has ended. Returns how many were removed.
    pub fn sweep(&self, now: u64) -> usize {
        let mut removed = 0;
        for shard in self.shards.iter() {
            let mut guard = shard.lock().unwrap_or_else(PoisonError::into_inner);
            let before = guard.len();
            guard.retain(|_, entry| !entry.is_expired(now));
            removed += before - guard.len();
        }
        removed
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    /// True when no key is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start a background task that sweeps expired entries every `interval`.
    ///
    /// The task holds only a weak reference and exits once the store is dropped.
    /// Must be called from within a tokio runtime.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> Sweeper {
        let store = Arc::downgrade(self);
        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(sweep_loop(store, interval, clock, stop_rx));
        let interval_ms = interval.as_millis() as u64;
        tracing::info!(target: "gatehouse::store", interval_ms, "sweeper started");
        Sweeper { stop: Some(stop_tx), handle: Some(handle) }
    }
}

async fn sweep_loop(
    store: Weak<CounterStore>,
    interval: Duration,
    clock: Arc<dyn Clock>,
    mut stop: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => {
                let Some(store) = store.upgrade() else { break };
                let removed = store.sweep(clock.now_millis());
                tracing::debug!(
                    target: "gatehouse::store",
                    removed, remaining = store.len(),
                    "swept expired windows"
                );
            }
        }
    }
    tracing::info!(target: "gatehouse::store", "sweeper stopped");
}

/// Handle to a running sweeper. Dropping it stops the task.
#[derive(Debug)]
pub struct Sweeper {
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Signal the sweeper to stop and wait for it to exit.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    /// True once the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}
