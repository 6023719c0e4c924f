//! Data models

pub mod identity;
pub mod location;
pub mod organization;
pub mod permissions;

pub use identity::Identity;
pub use location::{Coordinates, Location, LocationKind, LocationStatus};
pub use organization::{
    CreateOrganizationRequest, MemberOrganization, OrgKind, OrgSettings, OrgStatus, Organization,
};
pub use permissions::{Capability, PermissionSet, Role, UnknownRole};
