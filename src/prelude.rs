//! Convenient re-exports for common Gatehouse types.
pub use crate::{
    gate::{endpoints, Authorization, Endpoint, GateService, GatedError},
    permission::{check_permission, is_allowed, permission_level},
    rate_limit::{client_ip, RateLimitEntry, Sweeper},
    ActionType, Admission, CallerKey, CallerTier, Clock, Decision, FixedWindowLimiter,
    GateConfig, GateError, GateLayer, GateRequest, IdentityResolver, OperationClass,
    OwnershipLookup, PermissionLevel, PolicyTable, RateLimiter, RequestGate, ResourceOwnership,
    ResourceType,
};
