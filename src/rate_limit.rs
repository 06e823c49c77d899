//! Rate limiting primitives.
//!
//! This module provides the building blocks for rate limiting:
//! - [`RateLimiter`]: The decision interface the request gate talks to.
//! - [`FixedWindowLimiter`]: Fixed-window counters tiered by caller and operation class.
//! - [`Decision`]: The result of a rate limit check (Allowed/Denied).
//!
//! # Architecture
//!
//! - **Policy**: [`PolicyTable`] maps (caller tier, operation class) to a request cap
//!   per window. It is fixed at construction.
//! - **Logic**: [`FixedWindowLimiter`] picks the policy, builds the key and applies it.
//! - **Storage**: [`CounterStore`] owns the counters and their expiry sweep.
//!
//! # Window boundaries
//!
//! Counters reset entirely when their window ends. A caller that spends its quota at
//! the end of one window and again at the start of the next can briefly reach twice
//! the nominal rate. This is accepted; a sliding window would change the observable
//! `remaining`/`retry_after` values callers rely on.

use http::{HeaderMap, HeaderValue};

pub mod caller;
pub mod fixed_window;
pub mod policy;
pub mod store;

pub use caller::{client_ip, CallerKey};
pub use fixed_window::FixedWindowLimiter;
pub use policy::{CallerTier, OperationClass, PolicyTable, RateLimitPolicy};
pub use store::{CounterStore, RateLimitEntry, Sweeper};

/// The decision returned by a rate limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The request is allowed to proceed.
    Allowed {
        /// Requests still admissible in this window.
        /// Useful for `X-RateLimit-Remaining` headers.
        remaining: u32,
        /// Cap of the applied policy.
        limit: u32,
    },
    /// The request is denied.
    Denied {
        /// Whole seconds until the window resets, rounded up.
        /// Useful for `Retry-After` headers.
        retry_after_secs: u64,
        /// Cap of the applied policy.
        limit: u32,
    },
}

impl Decision {
    /// Helper to check if allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }

    /// Remaining quota, when admitted.
    pub fn remaining(&self) -> Option<u32> {
        match self {
            Decision::Allowed { remaining, .. } => Some(*remaining),
            Decision::Denied { .. } => None,
        }
    }

    /// Retry delay in seconds, when denied.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Decision::Denied { retry_after_secs, .. } => Some(*retry_after_secs),
            Decision::Allowed { .. } => None,
        }
    }

    /// Informational headers for the response.
    pub fn rate_limit_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        match self {
            Decision::Allowed { remaining, limit } => {
                headers.insert("x-ratelimit-limit", HeaderValue::from(*limit));
                headers.insert("x-ratelimit-remaining", HeaderValue::from(*remaining));
            }
            Decision::Denied { retry_after_secs, limit } => {
                headers.insert("x-ratelimit-limit", HeaderValue::from(*limit));
                headers.insert("x-ratelimit-remaining", HeaderValue::from(0u32));
                headers.insert(http::header::RETRY_AFTER, HeaderValue::from(*retry_after_secs));
            }
        }
        headers
    }
}

/// Core interface for rate limiting logic.
///
/// Implementations never fail: missing state counts as no prior requests, but a caller
/// over its quota is always denied.
pub trait RateLimiter: Send + Sync {
    /// Record a request from `identity` and decide whether it is admitted.
    fn check(&self, identity: &str, is_authenticated: bool, class: OperationClass) -> Decision;

    /// [`check`](Self::check) for a resolved [`CallerKey`].
    fn check_caller(&self, caller: &CallerKey, class: OperationClass) -> Decision {
        self.check(caller.identity(), caller.is_authenticated(), class)
    }
}

impl<L: RateLimiter + ?Sized> RateLimiter for std::sync::Arc<L> {
    fn check(&self, identity: &str, is_authenticated: bool, class: OperationClass) -> Decision {
        (**self).check(identity, is_authenticated, class)
    }
}
