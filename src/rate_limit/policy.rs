//! Quota policies indexed by caller tier and operation class.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Which quota table applies to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerTier {
    /// No resolved session; keyed by client IP.
    Unauthenticated,
    /// Resolved user; keyed by user id.
    Authenticated,
}

impl CallerTier {
    /// Tier for a request given whether identity resolution found a user.
    pub fn from_authenticated(is_authenticated: bool) -> Self {
        if is_authenticated {
            CallerTier::Authenticated
        } else {
            CallerTier::Unauthenticated
        }
    }

    /// Stable name used in store keys and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            CallerTier::Unauthenticated => "unauthenticated",
            CallerTier::Authenticated => "authenticated",
        }
    }
}

impl fmt::Display for CallerTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse endpoint category used to pick a quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationClass {
    /// Plain reads.
    General,
    /// Search and listing with filters.
    Search,
    /// Writes.
    Mutations,
    /// Expensive endpoints (imports, exports).
    Heavy,
}

impl OperationClass {
    /// All classes, in table order.
    pub const ALL: [OperationClass; 4] = [
        OperationClass::General,
        OperationClass::Search,
        OperationClass::Mutations,
        OperationClass::Heavy,
    ];

    /// Parse a class name from a route table; unknown names get the `general` quota.
    pub fn parse_or_general(name: &str) -> Self {
        name.parse().unwrap_or(OperationClass::General)
    }

    /// Stable name used in store keys and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationClass::General => "general",
            OperationClass::Search => "search",
            OperationClass::Mutations => "mutations",
            OperationClass::Heavy => "heavy",
        }
    }
}

impl fmt::Display for OperationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known operation class.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation class: {0}")]
pub struct UnknownOperationClass(pub String);

impl FromStr for OperationClass {
    type Err = UnknownOperationClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(OperationClass::General),
            "search" => Ok(OperationClass::Search),
            "mutations" => Ok(OperationClass::Mutations),
            "heavy" => Ok(OperationClass::Heavy),
            other => Err(UnknownOperationClass(other.to_string())),
        }
    }
}

/// Request cap per fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPolicy", into = "RawPolicy")]
pub struct RateLimitPolicy {
    requests: u32,
    window: Duration,
}

#[derive(Serialize, Deserialize)]
struct RawPolicy {
    requests: u32,
    window_ms: u64,
}

impl TryFrom<RawPolicy> for RateLimitPolicy {
    type Error = ConfigError;

    fn try_from(raw: RawPolicy) -> Result<Self, Self::Error> {
        RateLimitPolicy::new(raw.requests, Duration::from_millis(raw.window_ms))
    }
}

impl From<RateLimitPolicy> for RawPolicy {
    fn from(policy: RateLimitPolicy) -> Self {
        RawPolicy { requests: policy.requests, window_ms: policy.window_millis() }
    }
}

impl RateLimitPolicy {
    /// Create a policy with validation.
    pub fn new(requests: u32, window: Duration) -> Result<Self, ConfigError> {
        if requests == 0 {
            return Err(ConfigError::InvalidRequests { provided: requests });
        }
        if window.is_zero() {
            return Err(ConfigError::InvalidWindow);
        }
        Ok(Self { requests, window })
    }

    /// Used by the built-in defaults, which are known valid.
    const fn per_minute(requests: u32) -> Self {
        Self { requests, window: Duration::from_secs(60) }
    }

    /// Maximum admitted requests per window.
    pub fn requests(&self) -> u32 {
        self.requests
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Window length in milliseconds, saturating.
    pub fn window_millis(&self) -> u64 {
        u64::try_from(self.window.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Policies for one caller tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPolicies {
    /// Quota for `general` endpoints; also the fallback.
    pub general: RateLimitPolicy,
    /// Quota for `search` endpoints.
    pub search: RateLimitPolicy,
    /// Quota for `mutations` endpoints.
    pub mutations: RateLimitPolicy,
    /// Quota for `heavy` endpoints.
    pub heavy: RateLimitPolicy,
}

impl TierPolicies {
    fn get(&self, class: OperationClass) -> RateLimitPolicy {
        match class {
            OperationClass::General => self.general,
            OperationClass::Search => self.search,
            OperationClass::Mutations => self.mutations,
            OperationClass::Heavy => self.heavy,
        }
    }

    fn slot(&mut self, class: OperationClass) -> &mut RateLimitPolicy {
        match class {
            OperationClass::General => &mut self.general,
            OperationClass::Search => &mut self.search,
            OperationClass::Mutations => &mut self.mutations,
            OperationClass::Heavy => &mut self.heavy,
        }
    }
}

/// Tier × class table of quotas. Fixed at process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTable {
    /// Anonymous callers.
    pub unauthenticated: TierPolicies,
    /// Callers with a resolved user.
    pub authenticated: TierPolicies,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            unauthenticated: TierPolicies {
                general: RateLimitPolicy::per_minute(100),
                search: RateLimitPolicy::per_minute(30),
                mutations: RateLimitPolicy::per_minute(5),
                heavy: RateLimitPolicy::per_minute(2),
            },
            authenticated: TierPolicies {
                general: RateLimitPolicy::per_minute(300),
                search: RateLimitPolicy::per_minute(60),
                mutations: RateLimitPolicy::per_minute(30),
                heavy: RateLimitPolicy::per_minute(10),
            },
        }
    }
}

impl PolicyTable {
    /// Replace a single cell, builder style.
    pub fn with(
        mut self,
        tier: CallerTier,
        class: OperationClass,
        policy: RateLimitPolicy,
    ) -> Self {
        *self.tier_mut(tier).slot(class) = policy;
        self
    }

    /// Resolve the policy for a tier and class.
    pub fn resolve(&self, tier: CallerTier, class: OperationClass) -> RateLimitPolicy {
        self.tier(tier).get(class)
    }

    fn tier(&self, tier: CallerTier) -> &TierPolicies {
        match tier {
            CallerTier::Unauthenticated => &self.unauthenticated,
            CallerTier::Authenticated => &self.authenticated,
        }
    }

    fn tier_mut(&mut self, tier: CallerTier) -> &mut TierPolicies {
        match tier {
            CallerTier::Unauthenticated => &mut self.unauthenticated,
            CallerTier::Authenticated => &mut self.authenticated,
        }
    }
}
