//! Per-request admission: identity, then rate limit, then (when the endpoint needs it)
//! ownership lookup and permission check. The first denial ends the request.
//!
//! ```text
//! Start → IdentityResolved → RateChecked → [OwnershipResolved →] PermissionChecked → Admitted
//!                                  ↓ 429            ↓ 404                 ↓ 403
//! ```
//!
//! Rate limiting runs before authorization so abusive traffic is rejected on a cheap
//! key lookup before any storage round-trip.

use crate::config::GateConfig;
use crate::error::GateError;
use crate::permission::{
    ActionType, PermissionEvaluator, PermissionLevel, ResourceOwnership, ResourceType,
};
use crate::rate_limit::{client_ip, CallerKey, Decision, OperationClass, RateLimiter};
use async_trait::async_trait;
use http::HeaderMap;
use std::fmt;
use std::sync::Arc;

pub mod endpoints;
pub mod middleware;

pub use endpoints::{Authorization, Endpoint};
pub use middleware::{AdmittedRequest, GateLayer, GateService, GatedError};

/// Failure of an external collaborator (storage, session backend).
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

/// Resolves the signed-in user from request headers/cookies.
///
/// Returns `Ok(None)` for anonymous requests. Must be free of side effects.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve the user id for a request.
    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<String>, CollaboratorError>;
}

/// Fetches owner and moderator data for a resource instance.
///
/// Returns `Ok(None)` when the resource does not exist.
#[async_trait]
pub trait OwnershipLookup: Send + Sync {
    /// Look up ownership of `resource` `id`.
    async fn lookup(
        &self,
        resource: ResourceType,
        id: &str,
    ) -> Result<Option<ResourceOwnership>, CollaboratorError>;
}

/// States a request passes through in the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStage {
    /// Identity resolution succeeded (possibly anonymous).
    IdentityResolved,
    /// Rate limit admitted the request.
    RateChecked,
    /// Resource ownership was fetched.
    OwnershipResolved,
    /// Permission matrix admitted the request.
    PermissionChecked,
    /// Handler may run.
    Admitted,
}

impl fmt::Display for GateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GateStage::IdentityResolved => "identity_resolved",
            GateStage::RateChecked => "rate_checked",
            GateStage::OwnershipResolved => "ownership_resolved",
            GateStage::PermissionChecked => "permission_checked",
            GateStage::Admitted => "admitted",
        };
        f.write_str(name)
    }
}

/// A request as seen by the gate.
#[derive(Debug, Clone)]
pub struct GateRequest<B = ()> {
    /// Endpoint being called; declares class and authorization statically.
    pub endpoint: Endpoint,
    /// Request headers (session cookie, proxy IP headers).
    pub headers: HeaderMap,
    /// Target instance for endpoints that act on an existing resource.
    pub resource_id: Option<String>,
    /// Request payload, passed through untouched.
    pub body: B,
}

impl GateRequest<()> {
    /// Request with no payload.
    pub fn new(endpoint: Endpoint, headers: HeaderMap) -> Self {
        Self { endpoint, headers, resource_id: None, body: () }
    }
}

impl<B> GateRequest<B> {
    /// Set the target instance.
    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    /// Replace the payload.
    pub fn with_body<T>(self, body: T) -> GateRequest<T> {
        GateRequest {
            endpoint: self.endpoint,
            headers: self.headers,
            resource_id: self.resource_id,
            body,
        }
    }
}

/// What the gate learned about an admitted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    /// Resolved user, if any.
    pub user_id: Option<String>,
    /// Key the request was counted against.
    pub caller: CallerKey,
    /// Rate-limit decision (always `Allowed`).
    pub decision: Decision,
    /// Level the caller was evaluated at, when a permission check ran.
    pub level: Option<PermissionLevel>,
    /// Stages passed, in order.
    pub path: Vec<GateStage>,
}

/// Composes identity resolution, rate limiting and permission evaluation.
#[derive(Clone)]
pub struct RequestGate {
    identity: Arc<dyn IdentityResolver>,
    ownership: Arc<dyn OwnershipLookup>,
    limiter: Arc<dyn RateLimiter>,
    evaluator: PermissionEvaluator,
    client_ip_headers: Arc<[String]>,
}

impl fmt::Debug for RequestGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestGate")
            .field("evaluator", &self.evaluator)
            .field("client_ip_headers", &self.client_ip_headers)
            .finish_non_exhaustive()
    }
}

impl RequestGate {
    /// Gate using the standard permission matrix.
    pub fn new(
        config: &GateConfig,
        limiter: Arc<dyn RateLimiter>,
        identity: Arc<dyn IdentityResolver>,
        ownership: Arc<dyn OwnershipLookup>,
    ) -> Self {
        Self {
            identity,
            ownership,
            limiter,
            evaluator: PermissionEvaluator::default(),
            client_ip_headers: config.client_ip_headers().into(),
        }
    }

    /// Replace the permission evaluator.
    pub fn with_evaluator(mut self, evaluator: PermissionEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Run the admission protocol for `req`.
    ///
    /// # Errors
    ///
    /// `QuotaExceeded` (429), `ResourceNotFound` (404), `PermissionDenied` or
    /// `Configuration` (403), or `Collaborator` (5xx) when identity resolution or
    /// ownership lookup fails.
    pub async fn admit<B>(&self, req: &GateRequest<B>) -> Result<Admission, GateError> {
        let endpoint = req.endpoint;
        let mut path = Vec::with_capacity(5);

        let user_id = self
            .identity
            .resolve(&req.headers)
            .await
            .map_err(|e| collaborator_failure("identity resolver", e))?;
        let caller = match user_id.as_deref() {
            Some(id) => CallerKey::User(id.to_string()),
            None => CallerKey::Ip(client_ip(&req.headers, &self.client_ip_headers[..])),
        };
        enter(&mut path, GateStage::IdentityResolved, endpoint, &caller);

        let decision = self.limiter.check_caller(&caller, endpoint.class);
        if let Decision::Denied { retry_after_secs, .. } = decision {
            tracing::info!(
                target: "gatehouse::gate",
                endpoint = endpoint.name, %caller, retry_after_secs,
                "rejected: rate limit"
            );
            return Err(GateError::QuotaExceeded {
                retry_after_secs,
                class: endpoint.class,
                tier: caller.tier(),
            });
        }
        enter(&mut path, GateStage::RateChecked, endpoint, &caller);

        let ownership = match endpoint.authorization {
            Authorization::RateOnly => None,
            Authorization::Matrix => Some(ResourceOwnership::unowned()),
            Authorization::Instance => {
                let id = req.resource_id.as_deref();
                let ownership = self.resolve_ownership(endpoint, id).await?;
                enter(&mut path, GateStage::OwnershipResolved, endpoint, &caller);
                Some(ownership)
            }
        };

        let level = match ownership {
            Some(ownership) => {
                let check = self.evaluator.check(
                    endpoint.resource,
                    endpoint.action,
                    user_id.as_deref(),
                    &ownership,
                );
                let level = check.into_result().map_err(|err| {
                    tracing::info!(
                        target: "gatehouse::gate",
                        endpoint = endpoint.name, %caller, error = %err,
                        "rejected: permission"
                    );
                    err
                })?;
                enter(&mut path, GateStage::PermissionChecked, endpoint, &caller);
                Some(level)
            }
            None => None,
        };

        enter(&mut path, GateStage::Admitted, endpoint, &caller);
        Ok(Admission { user_id, caller, decision, level, path })
    }

    async fn resolve_ownership(
        &self,
        endpoint: Endpoint,
        resource_id: Option<&str>,
    ) -> Result<ResourceOwnership, GateError> {
        let Some(id) = resource_id else {
            tracing::warn!(
                target: "gatehouse::gate",
                endpoint = endpoint.name,
                "instance endpoint called without resource id"
            );
            return Err(GateError::Configuration {
                reason: format!("endpoint {} requires a resource id", endpoint.name),
            });
        };
        self.ownership
            .lookup(endpoint.resource, id)
            .await
            .map_err(|e| collaborator_failure("ownership lookup", e))?
            .ok_or_else(|| GateError::ResourceNotFound {
                resource: endpoint.resource,
                id: id.to_string(),
            })
    }

    /// Permission check only, for handlers that gate a second resource mid-request.
    pub fn check_permission(
        &self,
        resource: ResourceType,
        action: ActionType,
        user_id: Option<&str>,
        ownership: &ResourceOwnership,
    ) -> Result<PermissionLevel, GateError> {
        self.evaluator.check(resource, action, user_id, ownership).into_result()
    }

    /// Rate check only, for handlers outside the endpoint catalog.
    pub fn check_rate(&self, caller: &CallerKey, class: OperationClass) -> Decision {
        self.limiter.check_caller(caller, class)
    }
}

fn enter(path: &mut Vec<GateStage>, stage: GateStage, endpoint: Endpoint, caller: &CallerKey) {
    tracing::debug!(target: "gatehouse::gate", endpoint = endpoint.name, %caller, %stage, "stage");
    path.push(stage);
}

fn collaborator_failure(collaborator: &'static str, err: CollaboratorError) -> GateError {
    tracing::error!(target: "gatehouse::gate", collaborator, error = %err, "collaborator failed");
    GateError::Collaborator { collaborator, message: err.to_string() }
}
