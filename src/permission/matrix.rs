use super::{ActionType, PermissionLevel, ResourceType};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use PermissionLevel::{Authenticated, Moderator, Owner, Public};

/// The application's authorization table. Any listed level is sufficient.
///
/// For `membership`, `Owner` means owning the referenced player or the referenced team;
/// see [`ResourceOwnership::delegated`](super::ResourceOwnership::delegated).
const STANDARD_RULES: &[(ResourceType, ActionType, &[PermissionLevel])] = &[
    (ResourceType::Clip, ActionType::Create, &[Authenticated]),
    (ResourceType::Clip, ActionType::Read, &[Public]),
    (ResourceType::Clip, ActionType::Update, &[Owner]),
    (ResourceType::Clip, ActionType::Delete, &[Owner]),
    (ResourceType::Entity, ActionType::Create, &[Authenticated]),
    (ResourceType::Entity, ActionType::Read, &[Public]),
    (ResourceType::Entity, ActionType::Update, &[Owner, Moderator]),
    (ResourceType::Entity, ActionType::Delete, &[Owner]),
    (ResourceType::Follow, ActionType::Create, &[Authenticated]),
    (ResourceType::Follow, ActionType::Read, &[Owner]),
    (ResourceType::Follow, ActionType::Update, &[Owner]),
    (ResourceType::Follow, ActionType::Delete, &[Owner]),
    (ResourceType::Membership, ActionType::Create, &[Authenticated]),
    (ResourceType::Membership, ActionType::Read, &[Public]),
    (ResourceType::Membership, ActionType::Update, &[Owner]),
    (ResourceType::Membership, ActionType::Delete, &[Owner]),
    (ResourceType::User, ActionType::Create, &[Public]),
    (ResourceType::User, ActionType::Read, &[Public]),
    (ResourceType::User, ActionType::Update, &[Owner]),
    (ResourceType::User, ActionType::Delete, &[Owner]),
];

/// Declarative (resource, action) → permitted levels table.
///
/// Plain data so it can be enumerated and audited. Pairs without an entry are denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionMatrix {
    rules: BTreeMap<(ResourceType, ActionType), Vec<PermissionLevel>>,
}

impl Default for PermissionMatrix {
    fn default() -> Self {
        Self::from_rules(STANDARD_RULES.iter().map(|(r, a, levels)| (*r, *a, levels.to_vec())))
    }
}

impl PermissionMatrix {
    /// Shared instance of the application table.
    pub fn standard() -> &'static PermissionMatrix {
        static STANDARD: OnceLock<PermissionMatrix> = OnceLock::new();
        STANDARD.get_or_init(PermissionMatrix::default)
    }

    /// Build a matrix from explicit rules. Later duplicates replace earlier ones.
    pub fn from_rules<I>(rules: I) -> Self
    where
        I: IntoIterator<Item = (ResourceType, ActionType, Vec<PermissionLevel>)>,
    {
        Self { rules: rules.into_iter().map(|(r, a, levels)| ((r, a), levels)).collect() }
    }

    /// Levels permitted for a pair, or `None` when the pair is unmodeled.
    pub fn rule(&self, resource: ResourceType, action: ActionType) -> Option<&[PermissionLevel]> {
        self.rules.get(&(resource, action)).map(Vec::as_slice)
    }

    /// Every modeled rule, ordered by resource then action.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceType, ActionType, &[PermissionLevel])> {
        self.rules.iter().map(|((r, a), levels)| (*r, *a, levels.as_slice()))
    }

    /// Number of modeled pairs.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when nothing is modeled.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Fail-closed admission: unmodeled pairs deny, `Public` admits anyone, otherwise the
    /// level must be listed literally.
    pub fn is_allowed(
        &self,
        resource: ResourceType,
        action: ActionType,
        level: PermissionLevel,
    ) -> bool {
        match self.rule(resource, action) {
            None => false,
            Some(levels) if levels.contains(&Public) => true,
            Some(levels) => levels.contains(&level),
        }
    }
}
