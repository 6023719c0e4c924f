//! Test harness wiring the core against a wiremock backend

use std::sync::Arc;
use std::time::Duration;

use wiremock::MockServer;

use tenantry_core::config::CoreConfig;
use tenantry_core::storage::MemorySelectionStore;
use tenantry_core::SessionCore;

use super::mocks::ScriptedProvider;

/// Assembled core with its mock backend and scriptable provider
pub struct TestCore {
    pub server: MockServer,
    pub core: SessionCore,
    pub provider: Arc<ScriptedProvider>,
    pub selection: Arc<MemorySelectionStore>,
}

impl TestCore {
    /// Assemble the core against a fresh mock backend. Does not start it;
    /// mount backend mocks first, then call `start`.
    pub async fn new(provider: ScriptedProvider, persisted_org: Option<&str>) -> Self {
        let server = MockServer::start().await;

        let mut config = CoreConfig::default();
        config.backend.base_url = server.uri();
        config.backend.request_timeout_secs = 2;
        config.session.init_fallback_secs = 1;

        let provider = Arc::new(provider);
        let selection = Arc::new(match persisted_org {
            Some(org_id) => MemorySelectionStore::with_selection(org_id),
            None => MemorySelectionStore::new(),
        });

        let core = SessionCore::assemble(
            &config,
            Arc::clone(&provider) as Arc<dyn tenantry_core::services::IdentityProvider>,
            Arc::clone(&selection) as Arc<dyn tenantry_core::storage::SelectionStore>,
        )
        .expect("assembling test core");

        Self {
            server,
            core,
            provider,
            selection,
        }
    }

    /// Spawn the listener and resolve the initial session
    pub async fn start(&mut self) {
        self.core.start().await;
    }

    /// Wait until the active organization matches, or fail after two seconds
    pub async fn wait_for_active(&self, expected: Option<&str>) {
        let expected = expected.map(str::to_string);
        let mut rx = self.core.context.watch_active();
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|v| v == &expected))
            .await
            .expect("timed out waiting for active organization")
            .expect("active-organization channel closed");
    }

    /// Wait until the persisted selection is gone. The sign-out listener
    /// clears the store after publishing the active-org change, so a direct
    /// assert can race it.
    pub async fn wait_for_selection_cleared(&self) {
        use tenantry_core::storage::SelectionStore;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while self.selection.get().await.expect("selection store").is_some() {
            if tokio::time::Instant::now() >= deadline {
                panic!("timed out waiting for the persisted selection to clear");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Wait until the held locations match the given ids
    pub async fn wait_for_locations(&self, expected_ids: &[&str]) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let ids: Vec<String> = self
                .core
                .locations
                .current()
                .await
                .into_iter()
                .map(|l| l.id)
                .collect();
            if ids == expected_ids {
                return;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("timed out waiting for locations, last saw {:?}", ids);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
