//! Organization context
//!
//! Owns the "current organization" selection. Reacts to session events:
//! sign-in loads the directory and auto-selects the persisted-or-first
//! organization; sign-out clears everything, including the persisted
//! selection. Switches are serialized by a single in-flight guard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::permissions::{Capability, PermissionSet, Role};
use crate::models::MemberOrganization;
use crate::services::directory::OrganizationDirectory;
use crate::services::locations::LocationLoader;
use crate::services::session::{SessionEvent, SessionStore};
use crate::storage::SelectionStore;
use crate::utils::error::{CoreError, CoreResult};

/// Result of a switch request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The organization is now active
    Switched,
    /// Another switch was already in flight; this one was ignored
    Busy,
}

/// Releases the in-flight switch guard on every exit path
struct SwitchGuard<'a>(&'a AtomicBool);

impl Drop for SwitchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Organization context
pub struct OrganizationContext {
    directory: Arc<OrganizationDirectory>,
    locations: Arc<LocationLoader>,
    selection_store: Arc<dyn SelectionStore>,
    snapshot: RwLock<Vec<MemberOrganization>>,
    active_tx: watch::Sender<Option<String>>,
    switching: AtomicBool,
}

impl OrganizationContext {
    /// Create the context. The watch sender's read side belongs to the
    /// backend client, which stamps the active id onto outbound requests.
    pub fn new(
        directory: Arc<OrganizationDirectory>,
        locations: Arc<LocationLoader>,
        selection_store: Arc<dyn SelectionStore>,
        active_tx: watch::Sender<Option<String>>,
    ) -> Self {
        Self {
            directory,
            locations,
            selection_store,
            snapshot: RwLock::new(Vec::new()),
            active_tx,
            switching: AtomicBool::new(false),
        }
    }

    /// The active organization id, if any
    pub fn active_org_id(&self) -> Option<String> {
        self.active_tx.borrow().clone()
    }

    /// Watch receiver for active-organization changes
    pub fn watch_active(&self) -> watch::Receiver<Option<String>> {
        self.active_tx.subscribe()
    }

    /// Current directory snapshot
    pub async fn organizations(&self) -> Vec<MemberOrganization> {
        self.snapshot.read().await.clone()
    }

    /// Membership record for the active organization
    pub async fn active_membership(&self) -> Option<MemberOrganization> {
        let active = self.active_org_id()?;
        self.snapshot
            .read()
            .await
            .iter()
            .find(|m| m.organization.id == active)
            .cloned()
    }

    /// Effective permissions for the active organization; all-false when no
    /// organization is active
    pub async fn current_permissions(&self) -> PermissionSet {
        match self.active_membership().await {
            Some(member) => member.effective_permissions(),
            None => PermissionSet::none(),
        }
    }

    /// Check one capability against the active organization
    pub async fn has_permission(&self, capability: Capability) -> bool {
        self.current_permissions().await.has(capability)
    }

    /// True when the active membership's role is owner or manager
    pub async fn is_owner_or_manager(&self) -> bool {
        match self.active_membership().await {
            Some(member) => matches!(
                member.role.parse::<Role>(),
                Ok(Role::Owner) | Ok(Role::Manager)
            ),
            None => false,
        }
    }

    /// Switch to another organization from the current directory snapshot.
    ///
    /// A second call while one is in flight is ignored (`Busy`), never
    /// interleaved. Switching to an id the identity no longer has yields
    /// `NotFound` and leaves the active organization unchanged.
    pub async fn switch_organization(&self, org_id: &str) -> CoreResult<SwitchOutcome> {
        if self
            .switching
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            debug!(org = org_id, "Switch already in flight, ignoring");
            return Ok(SwitchOutcome::Busy);
        }
        let _guard = SwitchGuard(&self.switching);

        let known = self
            .snapshot
            .read()
            .await
            .iter()
            .any(|m| m.organization.id == org_id);
        if !known {
            return Err(CoreError::NotFound(format!(
                "organization {} is not in the current directory",
                org_id
            )));
        }

        self.activate(org_id).await;
        Ok(SwitchOutcome::Switched)
    }

    /// Adopt a just-created organization: make it active, persist the
    /// selection and load its locations. Skips the directory-membership
    /// check and the switch guard; the id comes from a creation the caller
    /// completed, not from user navigation racing another switch.
    pub async fn adopt_created(&self, org_id: &str) {
        self.activate(org_id).await;
    }

    /// Reload the directory for the given identity and keep the current
    /// selection when it is still present
    pub async fn refresh_directory(&self, identity_id: Uuid) {
        self.directory.invalidate(identity_id).await;
        let organizations = self.directory.refresh(identity_id).await;
        let previous = self.active_org_id();
        *self.snapshot.write().await = organizations;
        self.select_initial(previous).await;
    }

    /// Spawn the listener translating session events into context changes.
    /// Directory and location loads happen inside this task; the session
    /// phase transition never waits for them.
    pub fn spawn_session_listener(
        self: &Arc<Self>,
        session: Arc<SessionStore>,
    ) -> JoinHandle<()> {
        let context = Arc::clone(self);
        let mut events = session.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SessionEvent::SignedIn(identity)) => {
                        context.handle_signed_in(identity.id).await;
                    }
                    Ok(SessionEvent::Refreshed(identity)) => {
                        context.refresh_directory(identity.id).await;
                    }
                    Ok(SessionEvent::SignedOut) => {
                        context.handle_signed_out().await;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Session event listener lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Load the directory for a freshly signed-in identity and auto-select
    /// the persisted-or-first organization
    pub async fn handle_signed_in(&self, identity_id: Uuid) {
        let organizations = self.directory.load_for_identity(identity_id).await;
        info!(
            identity = %identity_id,
            count = organizations.len(),
            "Directory loaded for session"
        );
        *self.snapshot.write().await = organizations;

        let persisted = match self.selection_store.get().await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Could not read persisted selection");
                None
            }
        };
        self.select_initial(persisted).await;
    }

    /// Clear all organization state; sign-out must be observable locally
    /// regardless of what the backend did
    pub async fn handle_signed_out(&self) {
        self.snapshot.write().await.clear();
        self.active_tx.send_replace(None);
        self.locations.clear().await;
        self.directory.clear().await;
        if let Err(e) = self.selection_store.clear().await {
            warn!(error = %e, "Could not clear persisted selection");
        }
    }

    /// Selection precedence: preferred id when present in the snapshot,
    /// else the first organization, else none
    async fn select_initial(&self, preferred: Option<String>) {
        let snapshot = self.snapshot.read().await;
        let chosen = preferred
            .filter(|id| snapshot.iter().any(|m| &m.organization.id == id))
            .or_else(|| snapshot.first().map(|m| m.organization.id.clone()));
        drop(snapshot);

        match chosen {
            Some(org_id) => {
                debug!(org = %org_id, "Auto-selected organization");
                self.active_tx.send_replace(Some(org_id.clone()));
                self.locations.spawn_load(org_id).await;
            }
            None => {
                // Zero organizations is a legitimate, visible state
                self.active_tx.send_replace(None);
            }
        }
    }

    async fn activate(&self, org_id: &str) {
        info!(org = org_id, "Switching active organization");
        self.active_tx.send_replace(Some(org_id.to_string()));
        if let Err(e) = self.selection_store.set(org_id).await {
            warn!(org = org_id, error = %e, "Could not persist selection");
        }
        self.locations.spawn_load(org_id.to_string()).await;
    }
}
