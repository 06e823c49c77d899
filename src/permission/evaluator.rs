use super::matrix::PermissionMatrix;
use super::{ActionType, PermissionLevel, ResourceType};
use crate::error::{GateError, INVALID_RESOURCE_OR_ACTION};
use std::sync::Arc;

/// Denial reason when the rule requires ownership.
pub const OWNER_REQUIRED: &str = "You must be the owner to perform this action";
/// Denial reason when the rule requires a session.
pub const LOGIN_REQUIRED: &str = "You must be logged in to perform this action";
/// Denial reason when the rule requires moderator status.
pub const MODERATOR_REQUIRED: &str = "You must be a moderator to perform this action";
/// Denial reason when no specific explanation applies.
pub const NOT_PERMITTED: &str = "You do not have permission to perform this action";

/// Ownership data for one resource instance, as returned by storage.
///
/// `owner_ids` is any-of: a caller matching any entry owns the resource. Most resources
/// have exactly one owner; a membership is owned through its player or its team.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceOwnership {
    /// Users counted as owners.
    pub owner_ids: Vec<String>,
    /// Users counted as moderators.
    pub moderator_ids: Vec<String>,
}

impl ResourceOwnership {
    /// Resource with no owner (or one not yet created).
    pub fn unowned() -> Self {
        Self::default()
    }

    /// Resource with a single owner.
    pub fn owned_by(owner_id: impl Into<String>) -> Self {
        Self { owner_ids: vec![owner_id.into()], moderator_ids: Vec::new() }
    }

    /// Resource with an optional single owner.
    pub fn maybe_owned_by(owner_id: Option<&str>) -> Self {
        let owner_ids = owner_id.map(str::to_string).into_iter().collect();
        Self { owner_ids, moderator_ids: Vec::new() }
    }

    /// Membership-style ownership: owning either the player or the team suffices.
    pub fn delegated(player_owner: Option<&str>, team_owner: Option<&str>) -> Self {
        let owner_ids =
            [player_owner, team_owner].into_iter().flatten().map(str::to_string).collect();
        Self { owner_ids, moderator_ids: Vec::new() }
    }

    /// Attach moderator ids.
    pub fn with_moderators<I, S>(mut self, moderators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.moderator_ids.extend(moderators.into_iter().map(Into::into));
        self
    }

    /// Caller's level for this resource. Ownership is checked before moderator status.
    pub fn level_for(&self, caller_id: Option<&str>) -> PermissionLevel {
        let Some(caller) = caller_id else {
            return PermissionLevel::Public;
        };
        if self.owner_ids.iter().any(|owner| owner == caller) {
            PermissionLevel::Owner
        } else if self.moderator_ids.iter().any(|m| m == caller) {
            PermissionLevel::Moderator
        } else {
            PermissionLevel::Authenticated
        }
    }
}

/// Outcome of a permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionCheck {
    /// The caller's level satisfies the rule.
    Allowed {
        /// Level the caller was evaluated at.
        level: PermissionLevel,
    },
    /// The caller's level does not satisfy the rule.
    Denied {
        /// Level the caller was evaluated at.
        level: PermissionLevel,
        /// Single best explanation.
        reason: &'static str,
    },
    /// The matrix has no rule for the pair (or the names were not recognized).
    InvalidRule {
        /// What was missing, for logs.
        detail: String,
    },
}

impl PermissionCheck {
    /// Helper to check if allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, PermissionCheck::Allowed { .. })
    }

    /// Caller-facing reason for a denial.
    pub fn reason(&self) -> Option<&str> {
        match self {
            PermissionCheck::Allowed { .. } => None,
            PermissionCheck::Denied { reason, .. } => Some(*reason),
            PermissionCheck::InvalidRule { .. } => Some(INVALID_RESOURCE_OR_ACTION),
        }
    }

    /// Convert to the gate's error type.
    pub fn into_result(self) -> Result<PermissionLevel, GateError> {
        match self {
            PermissionCheck::Allowed { level } => Ok(level),
            PermissionCheck::Denied { reason, .. } => {
                Err(GateError::PermissionDenied { reason: reason.to_string() })
            }
            PermissionCheck::InvalidRule { detail } => {
                Err(GateError::Configuration { reason: detail })
            }
        }
    }
}

/// Picks the explanation for a denial: owner, then login, then moderator, then generic.
fn denial_reason(levels: &[PermissionLevel]) -> &'static str {
    if levels.contains(&PermissionLevel::Owner) {
        OWNER_REQUIRED
    } else if levels.contains(&PermissionLevel::Authenticated) {
        LOGIN_REQUIRED
    } else if levels.contains(&PermissionLevel::Moderator) {
        MODERATOR_REQUIRED
    } else {
        NOT_PERMITTED
    }
}

/// Evaluates callers against a [`PermissionMatrix`]. Stateless apart from the table.
#[derive(Debug, Clone)]
pub struct PermissionEvaluator {
    matrix: Arc<PermissionMatrix>,
}

impl Default for PermissionEvaluator {
    fn default() -> Self {
        Self::new(PermissionMatrix::standard().clone())
    }
}

impl PermissionEvaluator {
    /// Evaluator over `matrix`.
    pub fn new(matrix: PermissionMatrix) -> Self {
        Self { matrix: Arc::new(matrix) }
    }

    /// Table in use.
    pub fn matrix(&self) -> &PermissionMatrix {
        &self.matrix
    }

    /// See [`PermissionMatrix::is_allowed`].
    pub fn is_allowed(
        &self,
        resource: ResourceType,
        action: ActionType,
        level: PermissionLevel,
    ) -> bool {
        self.matrix.is_allowed(resource, action, level)
    }

    /// Evaluate `caller_id` against `ownership` for the given pair.
    pub fn check(
        &self,
        resource: ResourceType,
        action: ActionType,
        caller_id: Option<&str>,
        ownership: &ResourceOwnership,
    ) -> PermissionCheck {
        let Some(levels) = self.matrix.rule(resource, action) else {
            let detail = format!("no rule for {}:{}", resource, action);
            tracing::warn!(
                target: "gatehouse::permission",
                %resource, %action,
                "unmodeled resource/action pair"
            );
            return PermissionCheck::InvalidRule { detail };
        };

        let level = ownership.level_for(caller_id);
        if self.matrix.is_allowed(resource, action, level) {
            tracing::debug!(
                target: "gatehouse::permission",
                %resource, %action, %level,
                "permitted"
            );
            PermissionCheck::Allowed { level }
        } else {
            let reason = denial_reason(levels);
            tracing::debug!(
                target: "gatehouse::permission",
                %resource, %action, %level, reason,
                "denied"
            );
            PermissionCheck::Denied { level, reason }
        }
    }

    /// [`check`](Self::check) with resource and action given by name.
    ///
    /// Unrecognized names are denied as an invalid rule, never permitted.
    pub fn check_str(
        &self,
        resource: &str,
        action: &str,
        caller_id: Option<&str>,
        ownership: &ResourceOwnership,
    ) -> PermissionCheck {
        match (resource.parse::<ResourceType>(), action.parse::<ActionType>()) {
            (Ok(resource), Ok(action)) => self.check(resource, action, caller_id, ownership),
            (Err(err), _) | (_, Err(err)) => {
                tracing::warn!(
                    target: "gatehouse::permission",
                    error = %err,
                    "unrecognized permission check"
                );
                PermissionCheck::InvalidRule { detail: err.to_string() }
            }
        }
    }
}

/// Caller's level given a single owner and a moderator list.
///
/// No caller is `Public`; the owner is `Owner` even if also a moderator; a listed
/// moderator is `Moderator`; anyone else is `Authenticated`.
pub fn permission_level<S: AsRef<str>>(
    caller_id: Option<&str>,
    owner_id: Option<&str>,
    moderator_ids: &[S],
) -> PermissionLevel {
    ResourceOwnership::maybe_owned_by(owner_id)
        .with_moderators(moderator_ids.iter().map(|m| m.as_ref().to_string()))
        .level_for(caller_id)
}

/// Whether `level` may perform `action` on `resource` under the standard matrix.
pub fn is_allowed(resource: ResourceType, action: ActionType, level: PermissionLevel) -> bool {
    PermissionMatrix::standard().is_allowed(resource, action, level)
}

/// Full check under the standard matrix for a single-owner resource.
pub fn check_permission<S: AsRef<str>>(
    resource: ResourceType,
    action: ActionType,
    caller_id: Option<&str>,
    owner_id: Option<&str>,
    moderator_ids: &[S],
) -> PermissionCheck {
    let ownership = ResourceOwnership::maybe_owned_by(owner_id)
        .with_moderators(moderator_ids.iter().map(|m| m.as_ref().to_string()));
    PermissionEvaluator::default().check(resource, action, caller_id, &ownership)
}

/// [`check_permission`] with resource and action given by name.
pub fn check_permission_str<S: AsRef<str>>(
    resource: &str,
    action: &str,
    caller_id: Option<&str>,
    owner_id: Option<&str>,
    moderator_ids: &[S],
) -> PermissionCheck {
    let ownership = ResourceOwnership::maybe_owned_by(owner_id)
        .with_moderators(moderator_ids.iter().map(|m| m.as_ref().to_string()));
    PermissionEvaluator::default().check_str(resource, action, caller_id, &ownership)
}
