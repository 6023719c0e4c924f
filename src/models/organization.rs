//! Organization (tenant) models
//!
//! Organizations are owned by the managed backend; this core observes them
//! and only ever creates new ones through the mutator. Ids are opaque
//! backend-assigned strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::permissions::{PermissionSet, Role};
use crate::utils::validation::validate_slug;

/// Organization kind. A brand is a top-level tenant; a studio is a leaf
/// optionally attached to a brand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgKind {
    Brand,
    Studio,
}

impl OrgKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgKind::Brand => "brand",
            OrgKind::Studio => "studio",
        }
    }
}

/// Organization lifecycle status, owned by the backend and observed
/// read-only here
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgStatus {
    Active,
    SetupIncomplete,
    Suspended,
    Archived,
}

/// Organization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OrgSettings {
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub default_language: Option<String>,
    #[serde(default)]
    pub vat_rate: Option<f64>,
    /// Payment-channel toggles, e.g. {"twint": true, "card": false}
    #[serde(default)]
    pub payment_channels: std::collections::HashMap<String, bool>,
    /// Whether studio settings inherit from the parent brand
    #[serde(default)]
    pub inherit_from_parent: bool,
}

/// An organization as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: OrgKind,
    #[serde(default)]
    pub parent_org_id: Option<String>,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub settings: OrgSettings,
    pub status: OrgStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An organization in the context of a specific identity: carries the
/// resolved role, optional explicit permission overrides and an optional
/// location scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberOrganization {
    #[serde(flatten)]
    pub organization: Organization,
    /// Role name as reported by the backend; unknown values fail closed
    pub role: String,
    /// When present, replaces the role defaults wholesale
    #[serde(default)]
    pub permissions: Option<PermissionSet>,
    /// When present, the member only acts within these locations
    #[serde(default)]
    pub location_scope: Option<Vec<String>>,
}

impl MemberOrganization {
    /// Resolve the effective permission set for this membership
    pub fn effective_permissions(&self) -> PermissionSet {
        let role = self.role.parse::<Role>().ok();
        PermissionSet::resolve(role, self.permissions.clone())
    }
}

/// Request to create a new organization
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrganizationRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(custom(function = "validate_slug"))]
    pub slug: String,
    #[serde(rename = "type")]
    pub kind: OrgKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_org_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<OrgSettings>,
}
