//! Organization directory
//!
//! Loads the set of organizations the current identity belongs to, cached
//! per identity. Absence of organizations is a legitimate state (new users),
//! so load failures degrade to an empty list instead of propagating.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Method;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::DirectoryConfig;
use crate::models::MemberOrganization;
use crate::services::backend::BackendClient;

/// Cache entry with expiration tracking
#[derive(Debug, Clone)]
struct CacheEntry {
    organizations: Vec<MemberOrganization>,
    inserted_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() > ttl
    }
}

/// Organization directory with per-identity caching
pub struct OrganizationDirectory {
    backend: Arc<BackendClient>,
    entries: RwLock<HashMap<Uuid, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl OrganizationDirectory {
    pub fn new(backend: Arc<BackendClient>, config: &DirectoryConfig) -> Self {
        Self {
            backend,
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(config.cache_ttl_secs),
            max_entries: config.cache_max_entries,
        }
    }

    /// Organizations for the given identity, from cache when fresh.
    ///
    /// Network or auth failure yields an empty list; a user with zero
    /// reachable organizations is a visible state, not an error here.
    pub async fn load_for_identity(&self, identity_id: Uuid) -> Vec<MemberOrganization> {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&identity_id) {
                if !entry.is_expired(self.ttl) {
                    debug!(identity = %identity_id, "Directory served from cache");
                    return entry.organizations.clone();
                }
            }
        }
        self.refresh(identity_id).await
    }

    /// Reload from the backend, bypassing the cache
    pub async fn refresh(&self, identity_id: Uuid) -> Vec<MemberOrganization> {
        let cancel = CancellationToken::new();
        match self
            .backend
            .call::<Vec<MemberOrganization>>(Method::GET, "/organizations", None, &cancel)
            .await
        {
            Ok(organizations) => {
                debug!(
                    identity = %identity_id,
                    count = organizations.len(),
                    "Directory loaded"
                );
                self.store(identity_id, organizations.clone()).await;
                organizations
            }
            Err(e) => {
                // Failures are not cached so the next load can recover
                warn!(identity = %identity_id, error = %e, "Directory load failed, treating as empty");
                Vec::new()
            }
        }
    }

    /// Drop the cached list for one identity
    pub async fn invalidate(&self, identity_id: Uuid) {
        self.entries.write().await.remove(&identity_id);
    }

    /// Drop every cached list (sign-out)
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    async fn store(&self, identity_id: Uuid, organizations: Vec<MemberOrganization>) {
        let mut entries = self.entries.write().await;

        if entries.len() >= self.max_entries && !entries.contains_key(&identity_id) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted_at)
                .map(|(k, _)| *k);
            if let Some(key) = oldest {
                entries.remove(&key);
            }
        }

        entries.insert(
            identity_id,
            CacheEntry {
                organizations,
                inserted_at: Instant::now(),
            },
        );
    }
}
