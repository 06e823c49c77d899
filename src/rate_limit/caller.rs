//! Caller identity used as the rate-limit key.

use super::policy::{CallerTier, OperationClass};
use http::HeaderMap;
use std::fmt;

/// Placeholder identity for anonymous callers with no usable IP header.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Headers consulted for the client IP, in order of trust.
pub const DEFAULT_CLIENT_IP_HEADERS: [&str; 2] = ["x-forwarded-for", "x-real-ip"];

/// Who a request is counted against: a user id or a client IP, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallerKey {
    /// Authenticated caller; the quota follows the user across IPs.
    User(String),
    /// Anonymous caller, keyed by client IP (or [`UNKNOWN_CLIENT`]).
    Ip(String),
}

impl CallerKey {
    /// Key for a request: the user when identity resolution found one, else the IP.
    pub fn resolve(user_id: Option<&str>, client_ip: impl Into<String>) -> Self {
        match user_id {
            Some(id) => CallerKey::User(id.to_string()),
            None => CallerKey::Ip(client_ip.into()),
        }
    }

    /// Whether this caller gets the authenticated quota.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, CallerKey::User(_))
    }

    /// Tier implied by the key kind.
    pub fn tier(&self) -> CallerTier {
        CallerTier::from_authenticated(self.is_authenticated())
    }

    /// Raw identity string.
    pub fn identity(&self) -> &str {
        match self {
            CallerKey::User(id) | CallerKey::Ip(id) => id,
        }
    }

    /// Deterministic store key `tier:kind:identity:class`.
    ///
    /// The kind segment keeps a user named like an IP from colliding with that IP.
    /// Identity is the only free-form segment and tier/kind/class never contain the
    /// delimiter, so equal tuples always produce equal keys and distinct tuples never do.
    pub fn store_key(&self, tier: CallerTier, class: OperationClass) -> String {
        let kind = match self {
            CallerKey::User(_) => "user",
            CallerKey::Ip(_) => "ip",
        };
        format!("{}:{}:{}:{}", tier.as_str(), kind, class.as_str(), self.identity())
    }
}

impl fmt::Display for CallerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallerKey::User(id) => write!(f, "user:{}", id),
            CallerKey::Ip(ip) => write!(f, "ip:{}", ip),
        }
    }
}

/// Client IP taken from proxy headers, trusting `headers` in order.
///
/// For `x-forwarded-for` style lists the first (client-most) hop is used. Falls back to
/// [`UNKNOWN_CLIENT`]. These headers are spoofable unless a trusted reverse proxy
/// overwrites them.
pub fn client_ip<S: AsRef<str>>(request_headers: &HeaderMap, headers: &[S]) -> String {
    headers
        .iter()
        .filter_map(|name| request_headers.get(name.as_ref()))
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(',').next())
        .map(str::trim)
        .find(|ip| !ip.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn forwarded_for_wins_and_uses_first_hop() {
        let h = headers(&[("x-forwarded-for", "1.2.3.4, 10.0.0.1"), ("x-real-ip", "9.9.9.9")]);
        assert_eq!(client_ip(&h, &DEFAULT_CLIENT_IP_HEADERS), "1.2.3.4");
    }

    #[test]
    fn real_ip_used_when_forwarded_for_missing() {
        let h = headers(&[("x-real-ip", "9.9.9.9")]);
        assert_eq!(client_ip(&h, &DEFAULT_CLIENT_IP_HEADERS), "9.9.9.9");
    }

    #[test]
    fn empty_forwarded_for_falls_through() {
        let h = headers(&[("x-forwarded-for", " "), ("x-real-ip", "9.9.9.9")]);
        assert_eq!(client_ip(&h, &DEFAULT_CLIENT_IP_HEADERS), "9.9.9.9");
    }

    #[test]
    fn unknown_when_no_headers() {
        assert_eq!(client_ip(&HeaderMap::new(), &DEFAULT_CLIENT_IP_HEADERS), UNKNOWN_CLIENT);
    }

    #[test]
    fn user_key_never_collides_with_ip_key() {
        let user = CallerKey::User("1.2.3.4".into());
        let ip = CallerKey::Ip("1.2.3.4".into());
        let class = OperationClass::General;
        assert_ne!(user.store_key(user.tier(), class), ip.store_key(ip.tier(), class));
        assert_eq!(ip.store_key(ip.tier(), class), "unauthenticated:ip:general:1.2.3.4");
    }

    #[test]
    fn resolve_prefers_user() {
        assert_eq!(CallerKey::resolve(Some("u1"), "1.2.3.4"), CallerKey::User("u1".into()));
        assert_eq!(CallerKey::resolve(None, "1.2.3.4"), CallerKey::Ip("1.2.3.4".into()));
    }
}
