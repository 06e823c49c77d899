#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # Gatehouse
//!
//! Admission control for web API handlers: every request passes a rate limiter and,
//! where the endpoint requires it, an ownership-aware permission check before it
//! reaches storage.
//!
//! ## Features
//!
//! - **Fixed-window rate limiting** tiered by caller (anonymous IP vs signed-in user)
//!   and operation class (`general`, `search`, `mutations`, `heavy`)
//! - **Sharded counter store** with a background sweep of expired windows
//! - **Declarative permission matrix** over resources and actions, fail-closed
//! - **Request gate** composing both, with HTTP-shaped rejections (429/403/404)
//! - **Tower layer** to run the gate in front of any handler service
//!
//! ## Quick Start
//!
//! ```rust
//! use gatehouse::permission::{check_permission, ActionType, ResourceType};
//! use gatehouse::rate_limit::{FixedWindowLimiter, OperationClass, PolicyTable, RateLimiter};
//!
//! let limiter = FixedWindowLimiter::new(PolicyTable::default());
//! let decision = limiter.check("1.2.3.4", false, OperationClass::Mutations);
//! assert_eq!(decision.remaining(), Some(4));
//!
//! let no_moderators: &[&str] = &[];
//! let check = check_permission(
//!     ResourceType::Clip,
//!     ActionType::Update,
//!     Some("u42"),
//!     Some("u99"),
//!     no_moderators,
//! );
//! assert_eq!(check.reason(), Some("You must be the owner to perform this action"));
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
pub mod permission;
pub mod prelude;
pub mod rate_limit;

// Re-exports
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::GateConfig;
pub use error::{ConfigError, GateError, Rejection};
pub use gate::{
    Admission, GateLayer, GateRequest, GateStage, IdentityResolver, OwnershipLookup, RequestGate,
};
pub use permission::{
    ActionType, PermissionCheck, PermissionEvaluator, PermissionLevel, PermissionMatrix,
    ResourceOwnership, ResourceType,
};
pub use rate_limit::{
    CallerKey, CallerTier, CounterStore, Decision, FixedWindowLimiter, OperationClass,
    PolicyTable, RateLimitPolicy, RateLimiter,
};
