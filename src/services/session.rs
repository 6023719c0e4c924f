//! Identity session store
//!
//! Owns the current identity and the auth lifecycle. The phase machine is
//! `Uninitialized → Initializing → {Authenticated, Anonymous}` with
//! `Authenticated ↔ Anonymous` on sign-in/sign-out. Phase changes are
//! published on a watch channel, session events on a broadcast channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::Identity;
use crate::services::identity_provider::{
    AuthSession, Credentials, IdentityProvider, SignInOutcome,
};
use crate::utils::error::CoreResult;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Initializing,
    Authenticated,
    Anonymous,
}

/// Session lifecycle events consumed by the organization context
#[derive(Debug, Clone)]
pub enum SessionEvent {
    SignedIn(Identity),
    SignedOut,
    Refreshed(Identity),
}

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Identity session store
pub struct SessionStore {
    provider: Arc<dyn IdentityProvider>,
    session: RwLock<Option<AuthSession>>,
    phase_tx: watch::Sender<SessionPhase>,
    events_tx: broadcast::Sender<SessionEvent>,
    init_fallback: Duration,
}

impl SessionStore {
    pub fn new(provider: Arc<dyn IdentityProvider>, init_fallback: Duration) -> Self {
        let (phase_tx, _) = watch::channel(SessionPhase::Uninitialized);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            provider,
            session: RwLock::new(None),
            phase_tx,
            events_tx,
            init_fallback,
        }
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> SessionPhase {
        *self.phase_tx.borrow()
    }

    /// Watch receiver for phase transitions
    pub fn watch_phase(&self) -> watch::Receiver<SessionPhase> {
        self.phase_tx.subscribe()
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    /// Current identity, when authenticated
    pub async fn current_identity(&self) -> Option<Identity> {
        self.session.read().await.as_ref().map(|s| s.identity.clone())
    }

    /// Current identity id, when authenticated
    pub async fn current_identity_id(&self) -> Option<Uuid> {
        self.session.read().await.as_ref().map(|s| s.identity.id)
    }

    /// The bearer credential, only while non-expired
    pub async fn bearer_token(&self) -> Option<String> {
        let session = self.session.read().await;
        session
            .as_ref()
            .filter(|s| !s.is_expired())
            .map(|s| s.access_token.clone())
    }

    /// Query the provider once for an existing credential.
    ///
    /// The fallback deadline guarantees the phase leaves `Initializing` even
    /// when the provider call never resolves; a caller blocked on the phase
    /// must never hang indefinitely. Directory and location work is not
    /// awaited here.
    pub async fn initialize(&self) {
        self.set_phase(SessionPhase::Initializing);

        match tokio::time::timeout(self.init_fallback, self.provider.get_session()).await {
            Ok(Ok(Some(session))) if !session.is_expired() => {
                info!(identity = %session.identity.id, "Restored existing session");
                let identity = session.identity.clone();
                *self.session.write().await = Some(session);
                self.set_phase(SessionPhase::Authenticated);
                self.emit(SessionEvent::SignedIn(identity));
            }
            Ok(Ok(Some(_))) => {
                warn!("Restored credential is expired, starting anonymous");
                self.set_phase(SessionPhase::Anonymous);
            }
            Ok(Ok(None)) => {
                self.set_phase(SessionPhase::Anonymous);
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Identity provider unavailable during initialization");
                self.set_phase(SessionPhase::Anonymous);
            }
            Err(_) => {
                warn!(
                    deadline_secs = self.init_fallback.as_secs(),
                    "Identity provider did not answer within the fallback deadline"
                );
                self.set_phase(SessionPhase::Anonymous);
            }
        }
    }

    /// Authenticate with credentials
    pub async fn sign_in(&self, credentials: &Credentials) -> CoreResult<SignInOutcome> {
        let outcome = self.provider.sign_in(credentials).await?;
        self.adopt_outcome(&outcome).await;
        Ok(outcome)
    }

    /// Register a new identity
    pub async fn sign_up(
        &self,
        credentials: &Credentials,
        metadata: Option<serde_json::Value>,
    ) -> CoreResult<SignInOutcome> {
        let outcome = self.provider.sign_up(credentials, metadata).await?;
        self.adopt_outcome(&outcome).await;
        Ok(outcome)
    }

    /// Sign out: best-effort revoke with the provider, then an unconditional
    /// local transition to Anonymous. The local effect is observable even
    /// when the remote revoke fails.
    pub async fn sign_out(&self) {
        let token = self.session.read().await.as_ref().map(|s| s.access_token.clone());

        if let Some(token) = token {
            if let Err(e) = self.provider.sign_out(&token).await {
                warn!(error = %e, "Provider sign-out failed, clearing local session anyway");
            }
        }

        self.clear_local().await;
    }

    /// Forced local sign-out after a downstream call reported an invalid or
    /// expired credential. Skips the remote revoke (the credential is
    /// already rejected). Idempotent.
    pub async fn on_credential_invalid(&self) {
        let had_session = self.session.read().await.is_some();
        if !had_session && self.phase() == SessionPhase::Anonymous {
            return;
        }
        warn!("Credential rejected downstream, forcing local sign-out");
        self.clear_local().await;
    }

    /// Exchange the current credential for a fresh one; profile fields are
    /// refreshed from the provider
    pub async fn refresh(&self) -> CoreResult<()> {
        let token = self.session.read().await.as_ref().map(|s| s.access_token.clone());
        let Some(token) = token else {
            return Ok(());
        };

        match self.provider.refresh_session(&token).await? {
            Some(session) => {
                let identity = session.identity.clone();
                *self.session.write().await = Some(session);
                self.set_phase(SessionPhase::Authenticated);
                self.emit(SessionEvent::Refreshed(identity));
            }
            None => {
                self.on_credential_invalid().await;
            }
        }
        Ok(())
    }

    async fn adopt_outcome(&self, outcome: &SignInOutcome) {
        if let SignInOutcome::Authenticated(session) = outcome {
            info!(identity = %session.identity.id, "Signed in");
            let identity = session.identity.clone();
            *self.session.write().await = Some(session.clone());
            self.set_phase(SessionPhase::Authenticated);
            self.emit(SessionEvent::SignedIn(identity));
        }
    }

    async fn clear_local(&self) {
        *self.session.write().await = None;
        self.set_phase(SessionPhase::Anonymous);
        self.emit(SessionEvent::SignedOut);
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.phase_tx.send_if_modified(|current| {
            if *current == phase {
                false
            } else {
                *current = phase;
                true
            }
        });
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine; the context listener may not be running in
        // unit tests
        let _ = self.events_tx.send(event);
    }
}
