//! Error types for admission control.
//!
//! The rate limiter and the permission evaluator never fail; they return decisions.
//! [`GateError`] is what the request gate produces when a decision is a denial, or
//! when one of its external collaborators (identity resolver, ownership lookup)
//! fails. [`GateError::into_rejection`] turns it into the HTTP shape handlers send.
use crate::permission::ResourceType;
use crate::rate_limit::policy::{CallerTier, OperationClass};
use http::StatusCode;
use serde::Serialize;
use std::time::Duration;

/// Reason reported when the matrix has no rule for a resource/action pair.
pub const INVALID_RESOURCE_OR_ACTION: &str = "Invalid resource or action";

/// Unified error type for a gated request.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GateError {
    /// The caller used up its quota for this operation class.
    #[error("rate limit exceeded for {tier} {class} requests; retry after {retry_after_secs}s")]
    QuotaExceeded {
        /// Whole seconds until the current window resets.
        retry_after_secs: u64,
        /// Operation class that was exhausted.
        class: OperationClass,
        /// Tier whose quota applied.
        tier: CallerTier,
    },
    /// The caller's permission level does not satisfy the matrix.
    #[error("permission denied: {reason}")]
    PermissionDenied {
        /// Single best explanation for the denial.
        reason: String,
    },
    /// The resource being acted on does not exist.
    #[error("{resource} {id} not found")]
    ResourceNotFound {
        /// Resource type that was looked up.
        resource: ResourceType,
        /// Identifier that was looked up.
        id: String,
    },
    /// The matrix has no rule for the checked pair. A programming error.
    #[error("configuration error: {reason}")]
    Configuration {
        /// Description of the missing rule.
        reason: String,
    },
    /// Identity resolution or ownership lookup failed.
    #[error("{collaborator} failed: {message}")]
    Collaborator {
        /// Which collaborator failed (e.g. "identity resolver").
        collaborator: &'static str,
        /// Underlying failure message. Logged, never sent to the client.
        message: String,
    },
}

impl GateError {
    /// HTTP status a handler should respond with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::PermissionDenied { .. } | Self::Configuration { .. } => StatusCode::FORBIDDEN,
            Self::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Collaborator { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this error is a quota denial.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }

    /// Check if this error is a permission denial (including configuration denials).
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. } | Self::Configuration { .. })
    }

    /// Check if this error is a missing resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound { .. })
    }

    /// Check if this error came from an external collaborator.
    pub fn is_collaborator(&self) -> bool {
        matches!(self, Self::Collaborator { .. })
    }

    /// Seconds to put in `Retry-After`, if this is a quota denial.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::QuotaExceeded { retry_after_secs, .. } => {
                Some(Duration::from_secs(*retry_after_secs))
            }
            _ => None,
        }
    }

    /// Message shown to the caller. Collaborator details are withheld.
    pub fn public_message(&self) -> String {
        match self {
            Self::QuotaExceeded { .. } => "Too many requests, please try again later".into(),
            Self::PermissionDenied { reason } => reason.clone(),
            Self::Configuration { .. } => INVALID_RESOURCE_OR_ACTION.into(),
            Self::ResourceNotFound { resource, .. } => format!("{} not found", resource.title()),
            Self::Collaborator { .. } => "Internal server error".into(),
        }
    }

    /// Convert into the response a handler sends.
    pub fn into_rejection(self) -> Rejection {
        Rejection {
            status: self.status(),
            retry_after_secs: self.retry_after().map(|d| d.as_secs()),
            body: RejectionBody { success: false, error: self.public_message() },
        }
    }
}

/// JSON body of a rejected request: `{ "success": false, "error": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectionBody {
    /// Always `false`.
    pub success: bool,
    /// Human-readable reason.
    pub error: String,
}

/// HTTP-shaped denial consumed by the surrounding handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Response status.
    pub status: StatusCode,
    /// Value of the `Retry-After` header, set only for 429.
    pub retry_after_secs: Option<u64>,
    /// Response body.
    pub body: RejectionBody,
}

impl Rejection {
    /// Headers the handler must attach.
    pub fn headers(&self) -> http::HeaderMap {
        let mut headers = http::HeaderMap::new();
        if let Some(secs) = self.retry_after_secs {
            headers.insert(http::header::RETRY_AFTER, http::HeaderValue::from(secs));
        }
        headers
    }

    /// Body as a JSON value.
    pub fn body_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(&self.body)
    }
}

/// Errors produced when loading or validating configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A policy must allow at least one request.
    #[error("requests must be > 0 (got {provided})")]
    InvalidRequests {
        /// Value provided by caller.
        provided: u32,
    },
    /// A policy window must be non-zero.
    #[error("window must be > 0ms")]
    InvalidWindow,
    /// Sweep interval must be non-zero.
    #[error("sweep_interval must be > 0ms")]
    InvalidSweepInterval,
    /// The configuration document could not be parsed.
    #[error("invalid configuration document: {0}")]
    Parse(String),
}
