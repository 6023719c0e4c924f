//! Factories for test sessions and identities

use chrono::{Duration, Utc};
use uuid::Uuid;

use tenantry_core::services::identity_provider::AuthSession;
use tenantry_core::models::Identity;

/// A valid, non-expired session for the given email
pub fn make_session(email: &str) -> AuthSession {
    AuthSession {
        access_token: format!("test-token-{}", Uuid::new_v4()),
        expires_at: Utc::now() + Duration::hours(1),
        identity: make_identity(email),
    }
}

/// A session whose credential has already expired
pub fn make_expired_session(email: &str) -> AuthSession {
    AuthSession {
        access_token: "stale-token".to_string(),
        expires_at: Utc::now() - Duration::minutes(5),
        identity: make_identity(email),
    }
}

pub fn make_identity(email: &str) -> Identity {
    Identity {
        id: Uuid::new_v4(),
        email: email.to_string(),
        display_name: Some("Test User".to_string()),
        locale: Some("de-CH".to_string()),
        created_at: Utc::now(),
    }
}
