//! Static endpoint catalog.
//!
//! Each endpoint declares its operation class and how it is authorized. The mapping
//! is fixed here and never inferred from the incoming request.

use crate::permission::{ActionType, ResourceType};
use crate::rate_limit::OperationClass;

/// How an endpoint is authorized after the rate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    /// Rate limit only.
    RateOnly,
    /// Matrix check with no resource instance (creates); the caller cannot be owner.
    Matrix,
    /// Fetch the instance's ownership, then check the matrix. Missing instance is 404.
    Instance,
}

/// An API endpoint's admission contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// Route name for logs.
    pub name: &'static str,
    /// Resource the endpoint acts on.
    pub resource: ResourceType,
    /// Action it performs.
    pub action: ActionType,
    /// Quota class.
    pub class: OperationClass,
    /// Authorization mode.
    pub authorization: Authorization,
}

impl Endpoint {
    /// Declare an endpoint.
    pub const fn new(
        name: &'static str,
        resource: ResourceType,
        action: ActionType,
        class: OperationClass,
        authorization: Authorization,
    ) -> Self {
        Self { name, resource, action, class, authorization }
    }

    const fn read(name: &'static str, resource: ResourceType) -> Self {
        let class = OperationClass::General;
        Self::new(name, resource, ActionType::Read, class, Authorization::RateOnly)
    }

    const fn create(name: &'static str, resource: ResourceType) -> Self {
        let class = OperationClass::Mutations;
        Self::new(name, resource, ActionType::Create, class, Authorization::Matrix)
    }

    const fn owned(name: &'static str, resource: ResourceType, action: ActionType) -> Self {
        Self::new(name, resource, action, OperationClass::Mutations, Authorization::Instance)
    }
}

pub const CLIP_READ: Endpoint = Endpoint::read("clip.read", ResourceType::Clip);
pub const CLIP_CREATE: Endpoint = Endpoint::create("clip.create", ResourceType::Clip);
pub const CLIP_UPDATE: Endpoint =
    Endpoint::owned("clip.update", ResourceType::Clip, ActionType::Update);
pub const CLIP_DELETE: Endpoint =
    Endpoint::owned("clip.delete", ResourceType::Clip, ActionType::Delete);

pub const ENTITY_READ: Endpoint = Endpoint::read("entity.read", ResourceType::Entity);
pub const ENTITY_CREATE: Endpoint = Endpoint::create("entity.create", ResourceType::Entity);
pub const ENTITY_UPDATE: Endpoint =
    Endpoint::owned("entity.update", ResourceType::Entity, ActionType::Update);
pub const ENTITY_DELETE: Endpoint =
    Endpoint::owned("entity.delete", ResourceType::Entity, ActionType::Delete);

/// A user's own follow list; reading it requires owning it.
pub const FOLLOW_READ: Endpoint = Endpoint::new(
    "follow.read",
    ResourceType::Follow,
    ActionType::Read,
    OperationClass::General,
    Authorization::Instance,
);
pub const FOLLOW_CREATE: Endpoint = Endpoint::create("follow.create", ResourceType::Follow);
pub const FOLLOW_UPDATE: Endpoint =
    Endpoint::owned("follow.update", ResourceType::Follow, ActionType::Update);
pub const FOLLOW_DELETE: Endpoint =
    Endpoint::owned("follow.delete", ResourceType::Follow, ActionType::Delete);

pub const MEMBERSHIP_READ: Endpoint =
    Endpoint::read("membership.read", ResourceType::Membership);
pub const MEMBERSHIP_CREATE: Endpoint =
    Endpoint::create("membership.create", ResourceType::Membership);
pub const MEMBERSHIP_UPDATE: Endpoint =
    Endpoint::owned("membership.update", ResourceType::Membership, ActionType::Update);
pub const MEMBERSHIP_DELETE: Endpoint =
    Endpoint::owned("membership.delete", ResourceType::Membership, ActionType::Delete);

pub const USER_READ: Endpoint = Endpoint::read("user.read", ResourceType::User);
pub const USER_REGISTER: Endpoint = Endpoint::create("user.register", ResourceType::User);
pub const USER_UPDATE: Endpoint =
    Endpoint::owned("user.update", ResourceType::User, ActionType::Update);
pub const USER_DELETE: Endpoint =
    Endpoint::owned("user.delete", ResourceType::User, ActionType::Delete);

/// Entity search.
pub const SEARCH: Endpoint = Endpoint::new(
    "search",
    ResourceType::Entity,
    ActionType::Read,
    OperationClass::Search,
    Authorization::RateOnly,
);

/// Bulk entity import.
pub const BULK_IMPORT: Endpoint = Endpoint::new(
    "entity.bulk_import",
    ResourceType::Entity,
    ActionType::Create,
    OperationClass::Heavy,
    Authorization::Matrix,
);

/// Every catalogued endpoint.
pub const ALL: &[Endpoint] = &[
    CLIP_READ,
    CLIP_CREATE,
    CLIP_UPDATE,
    CLIP_DELETE,
    ENTITY_READ,
    ENTITY_CREATE,
    ENTITY_UPDATE,
    ENTITY_DELETE,
    FOLLOW_READ,
    FOLLOW_CREATE,
    FOLLOW_UPDATE,
    FOLLOW_DELETE,
    MEMBERSHIP_READ,
    MEMBERSHIP_CREATE,
    MEMBERSHIP_UPDATE,
    MEMBERSHIP_DELETE,
    USER_READ,
    USER_REGISTER,
    USER_UPDATE,
    USER_DELETE,
    SEARCH,
    BULK_IMPORT,
];
