//! JSON payload fixtures matching the backend wire format

use serde_json::{json, Value};

/// A membership entry as returned by `GET /organizations`
pub fn member_org(id: &str, kind: &str, name: &str, role: &str) -> Value {
    json!({
        "id": id,
        "type": kind,
        "name": name,
        "slug": name.to_lowercase().replace(' ', "-"),
        "currency": "CHF",
        "timezone": "Europe/Zurich",
        "status": "active",
        "created_at": "2024-01-15T09:30:00Z",
        "updated_at": "2024-01-15T09:30:00Z",
        "role": role
    })
}

/// The two-studio directory used in most scenarios
pub fn two_studio_directory() -> Value {
    json!([
        member_org("org-1", "studio", "Zen Zürich", "owner"),
        member_org("org-2", "studio", "Flow Basel", "instructor"),
    ])
}

/// Organization detail including its locations, as returned by
/// `GET /organizations/{id}`
pub fn org_detail_with_locations(id: &str, name: &str, locations: Vec<Value>) -> Value {
    json!({
        "id": id,
        "type": "studio",
        "name": name,
        "slug": name.to_lowercase().replace(' ', "-"),
        "status": "active",
        "created_at": "2024-01-15T09:30:00Z",
        "updated_at": "2024-01-15T09:30:00Z",
        "locations": locations
    })
}

pub fn location(id: &str, org_id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "org_id": org_id,
        "name": name,
        "type": "studio",
        "address": "Bahnhofstrasse 1",
        "capacity": 20,
        "status": "active"
    })
}
