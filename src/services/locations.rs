//! Location loader
//!
//! Loads locations scoped to the active organization. Loads run as spawned
//! background tasks with a cancellation handle: a newer organization switch
//! cancels the previous load, and a failed load degrades to an empty list
//! without ever blocking or failing the switch that triggered it.

use std::sync::Arc;

use reqwest::Method;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::models::{Location, Organization};
use crate::services::backend::BackendClient;

/// Organization detail response: the organization plus its locations
#[derive(Debug, Deserialize)]
struct OrganizationDetail {
    #[serde(flatten)]
    _organization: Organization,
    #[serde(default)]
    locations: Vec<Location>,
}

/// Location loader for the active organization
pub struct LocationLoader {
    backend: Arc<BackendClient>,
    locations: RwLock<Vec<Location>>,
    inflight: Mutex<Option<CancellationToken>>,
}

impl LocationLoader {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        Self {
            backend,
            locations: RwLock::new(Vec::new()),
            inflight: Mutex::new(None),
        }
    }

    /// Locations loaded for the most recently selected organization
    pub async fn current(&self) -> Vec<Location> {
        self.locations.read().await.clone()
    }

    /// Drop loaded locations and cancel any in-flight load (sign-out)
    pub async fn clear(&self) {
        if let Some(token) = self.inflight.lock().await.take() {
            token.cancel();
        }
        self.locations.write().await.clear();
    }

    /// Spawn a background load for the given organization, cancelling any
    /// previous in-flight load. Returns the task handle; callers normally
    /// discard it, tests may await it.
    pub async fn spawn_load(self: &Arc<Self>, org_id: String) -> JoinHandle<()> {
        let token = CancellationToken::new();
        {
            let mut inflight = self.inflight.lock().await;
            if let Some(previous) = inflight.replace(token.clone()) {
                previous.cancel();
            }
        }

        let loader = Arc::clone(self);
        tokio::spawn(async move {
            loader.run_load(org_id, token).await;
        })
    }

    async fn run_load(&self, org_id: String, token: CancellationToken) {
        let path = format!("/organizations/{}", org_id);
        let result = self
            .backend
            .call::<OrganizationDetail>(Method::GET, &path, None, &token)
            .await;

        // The cancellation check must happen under the write lock: `clear`
        // and a newer load both cancel this token before touching the list,
        // so a token still live here cannot be superseded mid-write.
        let mut locations = self.locations.write().await;
        if token.is_cancelled() {
            debug!(org = %org_id, "Location load superseded, discarding result");
            return;
        }

        match result {
            Ok(detail) => {
                debug!(org = %org_id, count = detail.locations.len(), "Locations loaded");
                *locations = detail.locations;
            }
            Err(e) => {
                warn!(org = %org_id, error = %e, "Location load failed, clearing locations");
                locations.clear();
            }
        }
    }
}
