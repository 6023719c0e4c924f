//! End-to-end organization creation and switching scenarios

use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use tenantry_core::models::{CreateOrganizationRequest, OrgKind};
use tenantry_core::storage::SelectionStore;
use tenantry_core::{CoreError, SwitchOutcome};

use crate::common::*;

fn alps_yoga_request(parent: Option<&str>) -> CreateOrganizationRequest {
    CreateOrganizationRequest {
        name: "Alps Yoga".to_string(),
        slug: "alps-yoga".to_string(),
        kind: OrgKind::Studio,
        parent_org_id: parent.map(str::to_string),
        settings: None,
    }
}

#[tokio::test]
async fn test_created_studio_under_brand_becomes_selectable() {
    let mut app = TestCore::new(
        ScriptedProvider::with_restored(make_session("owner@zen.ch")),
        None,
    )
    .await;

    // First directory load sees only the brand; after creation the refresh
    // returns the new studio as well
    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            member_org("brand-1", "brand", "Zen Group", "owner"),
        ])))
        .up_to_n_times(1)
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            member_org("brand-1", "brand", "Zen Group", "owner"),
            member_org("studio-7", "studio", "Alps Yoga", "owner"),
        ])))
        .mount(&app.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "studio-7",
            "type": "studio",
            "parent_org_id": "brand-1",
            "name": "Alps Yoga",
            "slug": "alps-yoga",
            "status": "setup_incomplete",
            "created_at": "2024-02-01T08:00:00Z",
            "updated_at": "2024-02-01T08:00:00Z"
        })))
        .expect(1)
        .mount(&app.server)
        .await;

    app.start().await;
    app.wait_for_active(Some("brand-1")).await;

    let created = app
        .core
        .organizations
        .create_organization(alps_yoga_request(Some("brand-1")), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(created.id, "studio-7");

    // Creation activates and persists the new organization
    assert_eq!(app.core.context.active_org_id(), Some("studio-7".to_string()));
    assert_eq!(
        app.selection.get().await.unwrap(),
        Some("studio-7".to_string())
    );

    // Both organizations remain switchable
    let outcome = app
        .core
        .context
        .switch_organization("brand-1")
        .await
        .unwrap();
    assert_eq!(outcome, SwitchOutcome::Switched);
}

#[tokio::test]
async fn test_studio_under_studio_is_rejected_before_any_request() {
    let mut app = TestCore::new(
        ScriptedProvider::with_restored(make_session("owner@flow.ch")),
        None,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            member_org("studio-9", "studio", "Flow Basel", "owner"),
        ])))
        .mount(&app.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&app.server)
        .await;

    app.start().await;
    app.wait_for_active(Some("studio-9")).await;

    let result = app
        .core
        .organizations
        .create_organization(alps_yoga_request(Some("studio-9")), &CancellationToken::new())
        .await;

    match result {
        Err(CoreError::Validation(message)) => assert!(message.contains("not a brand")),
        other => panic!("expected validation error, got {:?}", other.map(|o| o.id)),
    }
}

#[tokio::test]
async fn test_invalid_slug_is_rejected_with_the_length_rule() {
    let mut app = TestCore::new(
        ScriptedProvider::with_restored(make_session("owner@zen.ch")),
        None,
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&app.server)
        .await;

    app.start().await;

    let mut request = alps_yoga_request(None);
    request.slug = "ab".to_string();

    let result = app
        .core
        .organizations
        .create_organization(request, &CancellationToken::new())
        .await;

    match result {
        Err(CoreError::Validation(message)) => {
            assert!(message.contains("3-50"), "message was: {}", message)
        }
        other => panic!("expected validation error, got {:?}", other.map(|o| o.id)),
    }
}

#[tokio::test]
async fn test_slug_conflict_suggests_but_never_applies_an_alternative() {
    let mut app = TestCore::new(
        ScriptedProvider::with_restored(make_session("owner@zen.ch")),
        None,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&app.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": "slug_taken",
            "message": "slug alps-yoga is already in use"
        })))
        .expect(1)
        .mount(&app.server)
        .await;

    app.start().await;

    let result = app
        .core
        .organizations
        .create_organization(alps_yoga_request(None), &CancellationToken::new())
        .await;

    match result {
        Err(CoreError::Conflict {
            suggested_slug: Some(suggestion),
            ..
        }) => assert!(suggestion.starts_with("alps-yoga-")),
        other => panic!("expected conflict, got {:?}", other.map(|o| o.id)),
    }
}

#[tokio::test]
async fn test_switching_to_an_org_outside_the_directory_fails() {
    let mut app = TestCore::new(
        ScriptedProvider::with_restored(make_session("yogi@zen.ch")),
        None,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(two_studio_directory()))
        .mount(&app.server)
        .await;

    app.start().await;
    app.wait_for_active(Some("org-1")).await;

    let result = app.core.context.switch_organization("org-999").await;

    assert!(matches!(result, Err(CoreError::NotFound(_))));
    assert_eq!(app.core.context.active_org_id(), Some("org-1".to_string()));
}

#[tokio::test]
async fn test_cleanup_removes_backend_leftovers() {
    let mut app = TestCore::new(
        ScriptedProvider::with_restored(make_session("owner@zen.ch")),
        None,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/organizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&app.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/organizations/cleanup"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&app.server)
        .await;

    app.start().await;

    app.core
        .organizations
        .cleanup(&CancellationToken::new())
        .await
        .unwrap();
}
