use gatehouse::permission::evaluator::{LOGIN_REQUIRED, OWNER_REQUIRED};
use gatehouse::permission::{
    check_permission, check_permission_str, is_allowed, permission_level, ActionType,
    PermissionCheck, PermissionEvaluator, PermissionLevel, PermissionMatrix, ResourceOwnership,
    ResourceType,
};

const ALL_LEVELS: [PermissionLevel; 4] = [
    PermissionLevel::Public,
    PermissionLevel::Authenticated,
    PermissionLevel::Owner,
    PermissionLevel::Moderator,
];
const NO_MODERATORS: &[&str] = &[];

#[test]
fn matrix_matches_published_table() {
    use ActionType::*;
    use PermissionLevel::*;
    use ResourceType::*;

    let expected: &[(ResourceType, [&[PermissionLevel]; 4])] = &[
        (Clip, [&[Authenticated], &[Public], &[Owner], &[Owner]]),
        (Entity, [&[Authenticated], &[Public], &[Owner, Moderator], &[Owner]]),
        (Follow, [&[Authenticated], &[Owner], &[Owner], &[Owner]]),
        (Membership, [&[Authenticated], &[Public], &[Owner], &[Owner]]),
        (User, [&[Public], &[Public], &[Owner], &[Owner]]),
    ];

    let matrix = PermissionMatrix::standard();
    for (resource, row) in expected {
        for (action, levels) in [Create, Read, Update, Delete].into_iter().zip(row.iter()) {
            assert_eq!(matrix.rule(*resource, action), Some(*levels), "{resource}:{action}");
        }
    }
}

#[test]
fn public_rules_admit_every_level() {
    for level in ALL_LEVELS {
        assert!(is_allowed(ResourceType::Clip, ActionType::Read, level));
        assert!(is_allowed(ResourceType::User, ActionType::Create, level));
    }
}

#[test]
fn clip_delete_requires_owner() {
    assert!(!is_allowed(ResourceType::Clip, ActionType::Delete, PermissionLevel::Authenticated));
    assert!(is_allowed(ResourceType::Clip, ActionType::Delete, PermissionLevel::Owner));
}

#[test]
fn anonymous_level_ignores_ownership_inputs() {
    for owner in [None, Some("u1")] {
        for mods in [&[][..], &["u1"][..]] {
            assert_eq!(permission_level(None, owner, mods), PermissionLevel::Public);
        }
    }
}

#[test]
fn owner_listed_as_moderator_is_owner() {
    assert_eq!(permission_level(Some("u"), Some("u"), &["u"]), PermissionLevel::Owner);
}

#[test]
fn non_owner_clip_update_is_denied_with_owner_reason() {
    let check = check_permission(
        ResourceType::Clip,
        ActionType::Update,
        Some("u42"),
        Some("u99"),
        NO_MODERATORS,
    );
    assert!(!check.is_allowed());
    assert_eq!(check.reason(), Some("You must be the owner to perform this action"));
    assert_eq!(check.reason(), Some(OWNER_REQUIRED));
}

#[test]
fn moderator_may_update_entity() {
    let check =
        check_permission(ResourceType::Entity, ActionType::Update, Some("m1"), Some("u1"), &["m1"]);
    assert_eq!(check, PermissionCheck::Allowed { level: PermissionLevel::Moderator });
}

#[test]
fn anonymous_follow_is_asked_to_log_in() {
    let check =
        check_permission(ResourceType::Follow, ActionType::Create, None, None, NO_MODERATORS);
    assert_eq!(check.reason(), Some(LOGIN_REQUIRED));
}

#[test]
fn unmodeled_resource_is_a_configuration_denial() {
    let check = check_permission_str("widget", "read", Some("u1"), Some("u1"), NO_MODERATORS);
    assert!(!check.is_allowed());
    assert_eq!(check.reason(), Some("Invalid resource or action"));
    assert!(matches!(check, PermissionCheck::InvalidRule { .. }));

    let check = check_permission_str("clip", "publish", Some("u1"), Some("u1"), NO_MODERATORS);
    assert!(matches!(check, PermissionCheck::InvalidRule { .. }));
}

#[test]
fn membership_update_admits_team_owner() {
    // u1 owns the team; the player is owned by u2.
    let ownership = ResourceOwnership::delegated(Some("u2"), Some("u1"));
    let evaluator = PermissionEvaluator::default();
    let check =
        evaluator.check(ResourceType::Membership, ActionType::Update, Some("u1"), &ownership);
    assert_eq!(check, PermissionCheck::Allowed { level: PermissionLevel::Owner });

    let outsider =
        evaluator.check(ResourceType::Membership, ActionType::Update, Some("u3"), &ownership);
    assert_eq!(outsider.reason(), Some(OWNER_REQUIRED));
}

#[test]
fn every_modeled_pair_decides_without_panicking() {
    let evaluator = PermissionEvaluator::default();
    let ownership = ResourceOwnership::owned_by("owner").with_moderators(["mod"]);
    for (resource, action, _) in PermissionMatrix::standard().iter() {
        for caller in [None, Some("owner"), Some("mod"), Some("other")] {
            let check = evaluator.check(resource, action, caller, &ownership);
            assert!(!matches!(check, PermissionCheck::InvalidRule { .. }));
        }
    }
}
