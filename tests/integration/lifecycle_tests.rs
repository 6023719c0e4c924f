//! End-to-end session lifecycle scenarios

use reqwest::Method;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use tenantry_core::services::identity_provider::{Credentials, SignInOutcome};
use tenantry_core::{CoreError, SessionPhase};

use crate::common::*;

async fn wait_for_phase(core: &TestCore, expected: SessionPhase) {
    let mut rx = core.core.session.watch_phase();
    tokio::time::timeout(
        std::time::Duration::from_secs(2),
        rx.wait_for(|p| *p == expected),
    )
    .await
    .expect("timed out waiting for session phase")
    .expect("phase channel closed");
}

#[tokio::test]
async fn test_restored_session_activates_persisted_org_and_loads_its_locations() {
    let mut app = TestCore::new(
        ScriptedProvider::with_restored(make_session("yogi@zen.ch")),
        Some("org-2"),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(two_studio_directory()))
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/organizations/org-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(org_detail_with_locations(
            "org-2",
            "Flow Basel",
            vec![location("loc-21", "org-2", "Rheinufer Studio")],
        )))
        .expect(1)
        .mount(&app.server)
        .await;

    app.start().await;

    assert_eq!(app.core.session.phase(), SessionPhase::Authenticated);
    app.wait_for_active(Some("org-2")).await;
    app.wait_for_locations(&["loc-21"]).await;
}

#[tokio::test]
async fn test_no_stored_session_starts_anonymous_without_backend_calls() {
    let mut app = TestCore::new(ScriptedProvider::new(), None).await;

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.server)
        .await;

    app.start().await;

    assert_eq!(app.core.session.phase(), SessionPhase::Anonymous);
    assert_eq!(app.core.context.active_org_id(), None);
}

#[tokio::test]
async fn test_expired_restored_credential_starts_anonymous() {
    let mut app = TestCore::new(
        ScriptedProvider::with_restored(make_expired_session("yogi@zen.ch")),
        Some("org-2"),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.server)
        .await;

    app.start().await;

    assert_eq!(app.core.session.phase(), SessionPhase::Anonymous);
    assert_eq!(app.core.context.active_org_id(), None);
}

#[tokio::test]
async fn test_unresponsive_provider_falls_back_to_anonymous() {
    let mut app = TestCore::new(ScriptedProvider::hanging(), None).await;

    // start() must return despite the provider never answering
    app.start().await;

    assert_eq!(app.core.session.phase(), SessionPhase::Anonymous);
}

#[tokio::test]
async fn test_sign_in_loads_directory_and_selects_first_org() {
    let mut app = TestCore::new(ScriptedProvider::new(), None).await;

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(two_studio_directory()))
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/organizations/org-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(org_detail_with_locations(
            "org-1",
            "Zen Zürich",
            vec![location("loc-11", "org-1", "Altstadt Studio")],
        )))
        .mount(&app.server)
        .await;

    app.start().await;
    assert_eq!(app.core.session.phase(), SessionPhase::Anonymous);

    app.provider
        .script_sign_in(SignInOutcome::Authenticated(make_session("yogi@zen.ch")));
    let outcome = app
        .core
        .session
        .sign_in(&Credentials {
            email: "yogi@zen.ch".to_string(),
            password: "secret".to_string(),
        })
        .await
        .unwrap();

    assert!(matches!(outcome, SignInOutcome::Authenticated(_)));
    app.wait_for_active(Some("org-1")).await;
    app.wait_for_locations(&["loc-11"]).await;
}

#[tokio::test]
async fn test_sign_out_clears_selection_locations_and_persisted_choice() {
    let mut app = TestCore::new(
        ScriptedProvider::with_restored(make_session("yogi@zen.ch")),
        Some("org-2"),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(two_studio_directory()))
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/organizations/org-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(org_detail_with_locations(
            "org-2",
            "Flow Basel",
            vec![location("loc-21", "org-2", "Rheinufer Studio")],
        )))
        .mount(&app.server)
        .await;

    app.start().await;
    app.wait_for_active(Some("org-2")).await;

    app.core.session.sign_out().await;

    app.wait_for_active(None).await;
    assert_eq!(app.core.session.phase(), SessionPhase::Anonymous);
    app.wait_for_locations(&[]).await;
    app.wait_for_selection_cleared().await;
    assert_eq!(
        app.provider
            .sign_out_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );
}

#[tokio::test]
async fn test_backend_calls_carry_bearer_and_tenant_header() {
    let mut app = TestCore::new(
        ScriptedProvider::with_restored(make_session("yogi@zen.ch")),
        Some("org-2"),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(two_studio_directory()))
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .and(header("X-Org-ID", "org-2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.server)
        .await;

    app.start().await;
    app.wait_for_active(Some("org-2")).await;

    app.core
        .backend
        .call_unit(Method::GET, "/ping", None, &CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rejected_credential_forces_local_sign_out() {
    let mut app = TestCore::new(
        ScriptedProvider::with_restored(make_session("yogi@zen.ch")),
        Some("org-1"),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(two_studio_directory()))
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reports"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": "invalid_token",
            "message": "token has been revoked"
        })))
        .mount(&app.server)
        .await;

    app.start().await;
    app.wait_for_active(Some("org-1")).await;

    let result = app
        .core
        .backend
        .call_unit(Method::GET, "/reports", None, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(CoreError::Credential(_))));
    wait_for_phase(&app, SessionPhase::Anonymous).await;
    app.wait_for_active(None).await;
    app.wait_for_selection_cleared().await;
}
