//! Authorization: who may do what to which resource.
//!
//! - [`PermissionMatrix`]: static (resource, action) → allowed levels table.
//! - [`permission_level`] / [`is_allowed`] / [`check_permission`]: pure evaluation
//!   over a caller id and the resource's ownership data.
//!
//! Unlike the rate limiter, evaluation is fail-closed: a pair with no rule is denied.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod evaluator;
pub mod matrix;

pub use evaluator::{
    check_permission, check_permission_str, is_allowed, permission_level, PermissionCheck,
    PermissionEvaluator, ResourceOwnership,
};
pub use matrix::PermissionMatrix;

/// Resource types guarded by the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// A video clip.
    Clip,
    /// A sports entity (team, player, league).
    Entity,
    /// A user following an entity.
    Follow,
    /// A player's membership in a team.
    Membership,
    /// A user account.
    User,
}

impl ResourceType {
    /// All resource types, in table order.
    pub const ALL: [ResourceType; 5] = [
        ResourceType::Clip,
        ResourceType::Entity,
        ResourceType::Follow,
        ResourceType::Membership,
        ResourceType::User,
    ];

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Clip => "clip",
            ResourceType::Entity => "entity",
            ResourceType::Follow => "follow",
            ResourceType::Membership => "membership",
            ResourceType::User => "user",
        }
    }

    /// Capitalized name for messages.
    pub fn title(&self) -> &'static str {
        match self {
            ResourceType::Clip => "Clip",
            ResourceType::Entity => "Entity",
            ResourceType::Follow => "Follow",
            ResourceType::Membership => "Membership",
            ResourceType::User => "User",
        }
    }
}

/// Actions on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new instance.
    Create,
    /// Read an instance.
    Read,
    /// Modify an instance.
    Update,
    /// Remove an instance.
    Delete,
}

impl ActionType {
    /// All actions, in table order.
    pub const ALL: [ActionType; 4] =
        [ActionType::Create, ActionType::Read, ActionType::Update, ActionType::Delete];

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Create => "create",
            ActionType::Read => "read",
            ActionType::Update => "update",
            ActionType::Delete => "delete",
        }
    }
}

/// A caller's relationship to a resource instance.
///
/// `Public < Authenticated < Owner` by privilege; `Moderator` is a separate privileged
/// level and is only satisfied where the matrix names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    /// No session. As a rule entry: no restriction.
    Public,
    /// Signed in, no special relationship.
    Authenticated,
    /// Owns the resource.
    Owner,
    /// Listed as a moderator of the resource.
    Moderator,
}

impl PermissionLevel {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::Public => "public",
            PermissionLevel::Authenticated => "authenticated",
            PermissionLevel::Owner => "owner",
            PermissionLevel::Moderator => "moderator",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    )*};
}

display_as_str!(ResourceType, ActionType, PermissionLevel);

/// A resource or action name that the matrix does not model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {name}")]
pub struct UnknownName {
    /// "resource" or "action".
    pub kind: &'static str,
    /// The rejected input.
    pub name: String,
}

impl FromStr for ResourceType {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceType::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownName { kind: "resource", name: s.to_string() })
    }
}

impl FromStr for ActionType {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionType::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownName { kind: "action", name: s.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for r in ResourceType::ALL {
            assert_eq!(r.as_str().parse::<ResourceType>().unwrap(), r);
        }
        for a in ActionType::ALL {
            assert_eq!(a.to_string().parse::<ActionType>().unwrap(), a);
        }
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = "widget".parse::<ResourceType>().unwrap_err();
        assert_eq!(err.kind, "resource");
        assert!("publish".parse::<ActionType>().is_err());
        assert!("Clip".parse::<ResourceType>().is_err());
    }
}
