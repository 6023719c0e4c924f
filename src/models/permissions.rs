//! Roles and permission resolution
//!
//! `Role` is a closed enum: adding a role is a compile-time-checked change,
//! not a silently-defaulting string lookup. Resolution is a pure function
//! with no I/O.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A named function an identity holds within one organization.
/// Exactly one role per (identity, organization) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Manager,
    FrontDesk,
    Instructor,
    Accountant,
    Marketer,
}

impl Role {
    /// Get all roles
    pub fn all() -> Vec<Role> {
        vec![
            Role::Owner,
            Role::Manager,
            Role::FrontDesk,
            Role::Instructor,
            Role::Accountant,
            Role::Marketer,
        ]
    }

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Manager => "manager",
            Role::FrontDesk => "front_desk",
            Role::Instructor => "instructor",
            Role::Accountant => "accountant",
            Role::Marketer => "marketer",
        }
    }

    /// Default capability set for this role
    pub fn default_permissions(&self) -> PermissionSet {
        match self {
            Role::Owner => PermissionSet::all(),
            Role::Manager => PermissionSet {
                schedule: true,
                customers: true,
                finance: true,
                marketing: true,
                settings: true,
                analytics: true,
                wallet_management: true,
                user_management: true,
            },
            Role::FrontDesk => PermissionSet {
                schedule: true,
                customers: true,
                wallet_management: true,
                ..PermissionSet::none()
            },
            Role::Instructor => PermissionSet {
                schedule: true,
                ..PermissionSet::none()
            },
            Role::Accountant => PermissionSet {
                finance: true,
                analytics: true,
                ..PermissionSet::none()
            },
            Role::Marketer => PermissionSet {
                marketing: true,
                analytics: true,
                customers: true,
                ..PermissionSet::none()
            },
        }
    }
}

/// Error for unrecognized role names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl std::fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "manager" => Ok(Role::Manager),
            "front_desk" => Ok(Role::FrontDesk),
            "instructor" => Ok(Role::Instructor),
            "accountant" => Ok(Role::Accountant),
            "marketer" => Ok(Role::Marketer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Boolean capability map for one membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PermissionSet {
    #[serde(default)]
    pub schedule: bool,
    #[serde(default)]
    pub customers: bool,
    #[serde(default)]
    pub finance: bool,
    #[serde(default)]
    pub marketing: bool,
    #[serde(default)]
    pub settings: bool,
    #[serde(default)]
    pub analytics: bool,
    #[serde(default)]
    pub wallet_management: bool,
    #[serde(default)]
    pub user_management: bool,
}

/// A single capability, for query APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Schedule,
    Customers,
    Finance,
    Marketing,
    Settings,
    Analytics,
    WalletManagement,
    UserManagement,
}

impl PermissionSet {
    /// Every capability granted
    pub fn all() -> Self {
        Self {
            schedule: true,
            customers: true,
            finance: true,
            marketing: true,
            settings: true,
            analytics: true,
            wallet_management: true,
            user_management: true,
        }
    }

    /// Every capability denied
    pub fn none() -> Self {
        Self::default()
    }

    /// Resolve the effective set for a role and optional explicit overrides.
    ///
    /// An explicit override object replaces the role defaults wholesale; it
    /// is not merged key by key. An absent or unrecognized role fails closed.
    pub fn resolve(role: Option<Role>, overrides: Option<PermissionSet>) -> Self {
        if let Some(set) = overrides {
            return set;
        }
        match role {
            Some(role) => role.default_permissions(),
            None => Self::none(),
        }
    }

    /// Check a single capability
    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Schedule => self.schedule,
            Capability::Customers => self.customers,
            Capability::Finance => self.finance,
            Capability::Marketing => self.marketing,
            Capability::Settings => self.settings,
            Capability::Analytics => self.analytics,
            Capability::WalletManagement => self.wallet_management,
            Capability::UserManagement => self.user_management,
        }
    }
}
