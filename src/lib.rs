//! tenantry-core
//!
//! Session and organization-authorization core for multi-tenant clients.
//! Owns the identity session lifecycle, the per-identity organization
//! directory, the active-organization selection and its persistence, and
//! the propagation of credentials and tenant scope onto backend calls.
//!
//! The crate is wired around three channels: a watch channel for the
//! session phase, a watch channel for the active organization id, and a
//! broadcast channel for session events. `SessionCore` assembles the
//! pieces and owns the listener task that turns session events into
//! directory and location loads.

pub mod config;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::CoreConfig;
use crate::services::backend::BackendClient;
use crate::services::context::OrganizationContext;
use crate::services::directory::OrganizationDirectory;
use crate::services::identity_provider::{HttpIdentityProvider, IdentityProvider};
use crate::services::locations::LocationLoader;
use crate::services::orgs::OrganizationService;
use crate::services::session::SessionStore;
use crate::storage::{FileSelectionStore, SelectionStore};
use crate::utils::error::CoreResult;

pub use crate::models::{Capability, MemberOrganization, Organization, PermissionSet, Role};
pub use crate::services::{SessionEvent, SessionPhase, SwitchOutcome};
pub use crate::utils::error::CoreError;

/// Assembled session and organization core.
///
/// Construct it once per process, call [`SessionCore::start`], then drive
/// it through the service handles. Dropping the core aborts the session
/// event listener.
pub struct SessionCore {
    pub session: Arc<SessionStore>,
    pub backend: Arc<BackendClient>,
    pub directory: Arc<OrganizationDirectory>,
    pub locations: Arc<LocationLoader>,
    pub context: Arc<OrganizationContext>,
    pub organizations: Arc<OrganizationService>,
    listener: Option<JoinHandle<()>>,
}

impl SessionCore {
    /// Build the core against the HTTP identity provider and the file-backed
    /// selection store named by the configuration
    pub fn from_config(config: &CoreConfig) -> CoreResult<Self> {
        let provider = Arc::new(HttpIdentityProvider::new(
            &config.backend.base_url,
            config.backend.request_timeout(),
        )?);

        let selection_path = match config.storage.selection_file.clone() {
            Some(path) => path,
            None => FileSelectionStore::default_path()?,
        };
        let selection_store = Arc::new(FileSelectionStore::new(selection_path));

        Self::assemble(config, provider, selection_store)
    }

    /// Build the core with explicit provider and selection-store
    /// implementations
    pub fn assemble(
        config: &CoreConfig,
        provider: Arc<dyn IdentityProvider>,
        selection_store: Arc<dyn SelectionStore>,
    ) -> CoreResult<Self> {
        let session = Arc::new(SessionStore::new(provider, config.session.init_fallback()));

        // The context writes the active organization id; the backend client
        // reads it when stamping the tenant header.
        let (active_tx, active_rx) = watch::channel(None);

        let backend = Arc::new(BackendClient::new(
            &config.backend,
            Arc::clone(&session),
            active_rx,
        )?);
        let directory = Arc::new(OrganizationDirectory::new(
            Arc::clone(&backend),
            &config.directory,
        ));
        let locations = Arc::new(LocationLoader::new(Arc::clone(&backend)));
        let context = Arc::new(OrganizationContext::new(
            Arc::clone(&directory),
            Arc::clone(&locations),
            selection_store,
            active_tx,
        ));
        let organizations = Arc::new(OrganizationService::new(
            Arc::clone(&backend),
            Arc::clone(&context),
            Arc::clone(&session),
        ));

        Ok(Self {
            session,
            backend,
            directory,
            locations,
            context,
            organizations,
            listener: None,
        })
    }

    /// Spawn the session event listener, then resolve the initial session.
    /// The listener is in place before `initialize` runs, so a restored
    /// session's sign-in event is never missed.
    pub async fn start(&mut self) {
        if self.listener.is_none() {
            self.listener = Some(self.context.spawn_session_listener(Arc::clone(&self.session)));
        }
        self.session.initialize().await;
    }
}

impl Drop for SessionCore {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}
