mod common;

use axum::http::{header, StatusCode};
use common::{body_json, location, Auth, TestApp};
use tunnistamo::models::LoginMethod;

/// Returns the GitHub method id.
fn seed_methods(app: &TestApp) -> i64 {
    let mut github = LoginMethod::new("github", "GitHub");
    github.order = Some(2);
    let github = app.store.insert_login_method(github).unwrap();

    let mut google = LoginMethod::new("google", "Google");
    google.order = Some(1);
    app.store.insert_login_method(google).unwrap();

    app.store
        .insert_login_method(LoginMethod::new("saml", "Suomi.fi"))
        .unwrap();
    // Configured in the database but not in LOGIN_PROVIDERS
    app.store
        .insert_login_method(LoginMethod::new("facebook", "Facebook"))
        .unwrap();

    github.id
}

#[tokio::test]
async fn test_login_lists_registered_methods_in_order() {
    let app = TestApp::new();
    seed_methods(&app);

    let response = app.get("/login/?next=/profile", Auth::None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let methods = body["login_methods"].as_array().unwrap();
    assert_eq!(methods.len(), 2);
    assert_eq!(methods[0]["provider_id"], "google");
    assert_eq!(methods[0]["login_url"], "/auth/google/start/?next=%2Fprofile");
    assert_eq!(methods[1]["provider_id"], "github");
    assert_eq!(methods[1]["login_url"], "/accounts/github/login/?next=%2Fprofile");
}

#[tokio::test]
async fn test_login_redirects_when_application_allows_one_method() {
    let app = TestApp::new();
    let github = seed_methods(&app);
    let portal = app.application("portal");
    app.store.allow_login_method(portal.id, github).unwrap();

    let next = "/openid/authorize?client_id=portal&response_type=code";
    let response = app
        .get(
            &format!("/login/?next={}", urlencoding::encode(next)),
            Auth::None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        format!("/accounts/github/login/?next={}", urlencoding::encode(next))
    );
}

#[tokio::test]
async fn test_provider_url_with_query_gets_next_appended() {
    let app = TestApp::new();
    app.store
        .insert_login_method(LoginMethod::new("yletunnus", "Yle Tunnus"))
        .unwrap();

    let response = app.get("/login/?next=/profile", Auth::None).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/auth/yle/?realm=hel&next=%2Fprofile");
}

#[tokio::test]
async fn test_logout_clears_session() {
    let app = TestApp::new();
    let user = app.user("alice");
    let session = app.login(&user, "github").await;

    let response = app.get("/logout/", Auth::Session(&session)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_some());
    assert_eq!(body_json(response).await["detail"], "Logged out");
    assert!(!app.sessions.contains(&session));
}

#[tokio::test]
async fn test_logout_redirects_only_to_absolute_next() {
    let app = TestApp::new();

    let response = app
        .get("/logout/?next=https://www.hel.fi/", Auth::None)
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "https://www.hel.fi/");

    let response = app.get("/logout/?next=javascript:alert(1)", Auth::None).await;
    assert_eq!(response.status(), StatusCode::OK);
}
