use crate::clock::{Clock, SystemClock};
use crate::config::{GateConfig, DEFAULT_SWEEP_INTERVAL};
use crate::rate_limit::caller::CallerKey;
use crate::rate_limit::policy::{CallerTier, OperationClass, PolicyTable};
use crate::rate_limit::store::{CounterStore, Sweeper};
use crate::rate_limit::{Decision, RateLimiter};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Fixed-window rate limiter over a shared [`CounterStore`].
///
/// Each (tier, caller, class) key gets `requests` admissions per `window`. The first
/// request of a key opens the window; the window closes at a fixed time and the next
/// request after that starts a fresh one.
#[derive(Debug, Clone)]
pub struct FixedWindowLimiter {
    store: Arc<CounterStore>,
    policies: PolicyTable,
    clock: Arc<dyn Clock>,
    sweep_interval: Duration,
    sweeper: Arc<Mutex<Option<Sweeper>>>,
}

impl FixedWindowLimiter {
    /// Limiter with its own store, wall clock and no background sweep.
    pub fn new(policies: PolicyTable) -> Self {
        Self::with_store(Arc::new(CounterStore::new()), policies, Arc::new(SystemClock))
    }

    /// Limiter using the policies and sweep interval from `config`.
    pub fn from_config(config: &GateConfig) -> Self {
        Self::new(*config.policies()).with_sweep_interval(config.sweep_interval())
    }

    /// Limiter over an existing store and clock.
    pub fn with_store(
        store: Arc<CounterStore>,
        policies: PolicyTable,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            policies,
            clock,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            sweeper: Arc::new(Mutex::new(None)),
        }
    }

    /// Replace the clock. Intended for tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Interval used by [`start_sweeper`](Self::start_sweeper). Zero is ignored.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.sweep_interval = interval;
        }
        self
    }

    /// Interval between sweeps once the sweeper runs.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Start sweeping expired windows at the configured interval. Replaces a running
    /// sweeper.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_sweeper(&self) {
        let sweeper = self.store.spawn_sweeper(self.sweep_interval, self.clock.clone());
        let mut slot = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(sweeper);
    }

    /// Stop the background sweep, if running, and wait for it to exit.
    pub async fn stop(&self) {
        let sweeper = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(sweeper) = sweeper {
            sweeper.stop().await;
        }
    }

    /// Policies in effect.
    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    /// Backing store.
    pub fn store(&self) -> &Arc<CounterStore> {
        &self.store
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn check(&self, identity: &str, is_authenticated: bool, class: OperationClass) -> Decision {
        let tier = CallerTier::from_authenticated(is_authenticated);
        let policy = self.policies.resolve(tier, class);
        let caller = if is_authenticated {
            CallerKey::User(identity.to_string())
        } else {
            CallerKey::Ip(identity.to_string())
        };
        let key = caller.store_key(tier, class);

        let now = self.clock.now_millis();
        let entry = self.store.hit(&key, policy.window_millis(), now);
        let limit = policy.requests();

        if entry.count > limit {
            let wait_ms = entry.reset_at.saturating_sub(now);
            let retry_after_secs = wait_ms.div_ceil(1000);
            tracing::warn!(
                target: "gatehouse::rate_limit",
                %caller, %tier, %class, count = entry.count, limit, retry_after_secs,
                "rate limit exceeded"
            );
            Decision::Denied { retry_after_secs, limit }
        } else {
            let remaining = limit - entry.count;
            tracing::debug!(
                target: "gatehouse::rate_limit",
                %caller, %class, remaining,
                "admitted"
            );
            Decision::Allowed { remaining, limit }
        }
    }
}
