mod common;

use axum::http::StatusCode;
use common::{body_json, Auth, TestApp};
use tunnistamo::models::{Application, User};

#[tokio::test]
async fn test_current_user_hides_ad_groups_unless_opted_in() {
    let app = TestApp::new();
    let user = app.user("alice");
    app.store.add_ad_group(user.id, "helsinki1/staff").unwrap();

    let plain = app.application("plain");
    let token = app.token(&user, &plain, "read");
    let response = app.get("/v1/user/", Auth::Bearer(&token)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["username"], "alice");
    assert_eq!(body["uuid"], user.uuid.to_string());
    assert_eq!(body["display_name"], "Test User");
    assert!(body.get("ad_groups").is_none());

    let mut intranet = Application::new("intranet", "intranet-secret", "Intranet");
    intranet.include_ad_groups = true;
    let intranet = app.store.insert_application(intranet).unwrap();
    let token = app.token(&user, &intranet, "read");
    let body = body_json(app.get("/v1/user/", Auth::Bearer(&token)).await).await;

    assert_eq!(body["ad_groups"], serde_json::json!(["helsinki1/staff"]));
}

#[tokio::test]
async fn test_regular_user_sees_only_themselves() {
    let app = TestApp::new();
    let alice = app.user("alice");
    app.user("bob");
    let client = app.application("portal");
    let token = app.token(&alice, &client, "read");

    let response = app.get("/v1/user/alice/", Auth::Bearer(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get("/v1/user/bob/", Auth::Bearer(&token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_superuser_sees_anyone() {
    let app = TestApp::new();
    let mut admin = User::new("admin", "admin@example.com");
    admin.is_superuser = true;
    let admin = app.store.insert_user(admin).unwrap();
    app.user("bob");
    let client = app.application("portal");
    let token = app.token(&admin, &client, "read");

    let response = app.get("/v1/user/bob/", Auth::Bearer(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["username"], "bob");

    let response = app.get("/v1/user/ghost/", Auth::Bearer(&token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_inactive_user_token_is_rejected() {
    let app = TestApp::new();
    let mut user = User::new("gone", "gone@example.com");
    user.is_active = false;
    let user = app.store.insert_user(user).unwrap();
    let client = app.application("portal");
    let token = app.token(&user, &client, "read");

    let response = app.get("/v1/user/", Auth::Bearer(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
