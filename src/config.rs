//! Static configuration loaded at process start.

use crate::error::ConfigError;
use crate::rate_limit::caller::DEFAULT_CLIENT_IP_HEADERS;
use crate::rate_limit::PolicyTable;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default interval between sweeps of expired rate-limit windows.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Validated gate configuration. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawConfig", into = "RawConfig")]
pub struct GateConfig {
    policies: PolicyTable,
    sweep_interval: Duration,
    client_ip_headers: Vec<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    policies: PolicyTable,
    #[serde(default = "default_sweep_ms")]
    sweep_interval_ms: u64,
    #[serde(default = "default_ip_headers")]
    client_ip_headers: Vec<String>,
}

fn default_sweep_ms() -> u64 {
    DEFAULT_SWEEP_INTERVAL.as_secs() * 1000
}

fn default_ip_headers() -> Vec<String> {
    DEFAULT_CLIENT_IP_HEADERS.iter().map(|h| h.to_string()).collect()
}

impl TryFrom<RawConfig> for GateConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let sweep_interval = Duration::from_millis(raw.sweep_interval_ms);
        GateConfig::new(raw.policies, sweep_interval, raw.client_ip_headers)
    }
}

impl From<GateConfig> for RawConfig {
    fn from(cfg: GateConfig) -> Self {
        RawConfig {
            policies: cfg.policies,
            sweep_interval_ms: u64::try_from(cfg.sweep_interval.as_millis()).unwrap_or(u64::MAX),
            client_ip_headers: cfg.client_ip_headers,
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            policies: PolicyTable::default(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            client_ip_headers: default_ip_headers(),
        }
    }
}

impl GateConfig {
    /// Create a config with validation. Header names are lowercased.
    pub fn new(
        policies: PolicyTable,
        sweep_interval: Duration,
        client_ip_headers: Vec<String>,
    ) -> Result<Self, ConfigError> {
        if sweep_interval.is_zero() {
            return Err(ConfigError::InvalidSweepInterval);
        }
        let client_ip_headers =
            client_ip_headers.into_iter().map(|h| h.to_ascii_lowercase()).collect();
        Ok(Self { policies, sweep_interval, client_ip_headers })
    }

    /// Parse and validate a JSON document. Omitted fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Replace the policy table.
    pub fn with_policies(mut self, policies: PolicyTable) -> Self {
        self.policies = policies;
        self
    }

    /// Rate-limit policies.
    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    /// Interval between sweeps of expired windows.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Headers trusted for the client IP, in order.
    pub fn client_ip_headers(&self) -> &[String] {
        &self.client_ip_headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::{CallerTier, OperationClass};

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = GateConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, GateConfig::default());
        assert_eq!(cfg.sweep_interval(), Duration::from_secs(300));
        assert_eq!(cfg.client_ip_headers(), ["x-forwarded-for", "x-real-ip"]);
    }

    #[test]
    fn policies_override_from_json() {
        let json = r#"{
            "policies": {
                "unauthenticated": {
                    "general":   {"requests": 10, "window_ms": 1000},
                    "search":    {"requests": 5,  "window_ms": 1000},
                    "mutations": {"requests": 5,  "window_ms": 60000},
                    "heavy":     {"requests": 1,  "window_ms": 60000}
                },
                "authenticated": {
                    "general":   {"requests": 20, "window_ms": 1000},
                    "search":    {"requests": 10, "window_ms": 1000},
                    "mutations": {"requests": 10, "window_ms": 60000},
                    "heavy":     {"requests": 2,  "window_ms": 60000}
                }
            },
            "sweep_interval_ms": 1000,
            "client_ip_headers": ["CF-Connecting-IP"]
        }"#;
        let cfg = GateConfig::from_json_str(json).unwrap();
        let policy = cfg.policies().resolve(CallerTier::Authenticated, OperationClass::Heavy);
        assert_eq!(policy.requests(), 2);
        assert_eq!(cfg.sweep_interval(), Duration::from_secs(1));
        assert_eq!(cfg.client_ip_headers(), ["cf-connecting-ip"]);
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let err = GateConfig::from_json_str(r#"{"sweep_interval_ms": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(msg) if msg.contains("sweep_interval")));
    }

    #[test]
    fn invalid_policy_is_rejected() {
        let json = r#"{"policies": {"unauthenticated": {
            "general": {"requests": 0, "window_ms": 1000},
            "search": {"requests": 1, "window_ms": 1000},
            "mutations": {"requests": 1, "window_ms": 1000},
            "heavy": {"requests": 1, "window_ms": 1000}
        }}}"#;
        let err = GateConfig::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("requests must be > 0"), "{err}");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(GateConfig::from_json_str(r#"{"sweep": 5}"#).is_err());
    }
}
