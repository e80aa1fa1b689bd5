mod common;

use axum::http::{header, StatusCode};
use common::{body_json, location, Auth, TestApp};
use tunnistamo::{
    models::LoginMethod,
    services::{Session, SessionStore},
};

/// `portal` accepts only GitHub logins.
fn seed_portal(app: &TestApp) {
    let portal = app.application("portal");
    let github = app
        .store
        .insert_login_method(LoginMethod::new("github", "GitHub"))
        .unwrap();
    app.store
        .insert_login_method(LoginMethod::new("google", "Google"))
        .unwrap();
    app.store.allow_login_method(portal.id, github.id).unwrap();
}

#[tokio::test]
async fn test_anonymous_authorize_redirects_to_login() {
    let app = TestApp::new();
    seed_portal(&app);

    let response = app
        .get("/openid/authorize?client_id=portal", Auth::None)
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        "/login/?next=%2Fopenid%2Fauthorize%3Fclient_id%3Dportal"
    );
}

#[tokio::test]
async fn test_allowed_backend_passes_and_refreshes_session() {
    let app = TestApp::new();
    seed_portal(&app);
    let user = app.user("alice");
    let session_id = app.login(&user, "github").await;

    let response = app
        .get("/openid/authorize?client_id=portal", Auth::Session(&session_id))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["client_id"], "portal");
    assert_eq!(body["sub"], user.uuid.to_string());
    assert!(app.sessions.was_touched(&session_id));
}

#[tokio::test]
async fn test_disallowed_backend_ends_session() {
    let app = TestApp::new();
    seed_portal(&app);
    let user = app.user("bob");
    let session_id = app.login(&user, "google").await;

    let response = app
        .get("/openid/authorize?client_id=portal", Auth::Session(&session_id))
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        "/login/?next=%2Fopenid%2Fauthorize%3Fclient_id%3Dportal"
    );
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Session cookie should be cleared")
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("sessionid="));
    assert!(!app.sessions.contains(&session_id));
}

#[tokio::test]
async fn test_denial_keeps_full_authorize_request_in_next() {
    let app = TestApp::new();
    seed_portal(&app);
    let user = app.user("dora");
    let session_id = app.login(&user, "google").await;

    let authorize = "/openid/authorize?client_id=portal&response_type=code\
        &scope=openid%20profile&redirect_uri=https%3A%2F%2Fportal.hel.fi%2Fcallback&state=xyz";
    let response = app.get(authorize, Auth::Session(&session_id)).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        format!("/login/?next={}", urlencoding::encode(authorize))
    );
    assert!(!app.sessions.contains(&session_id));
}

#[tokio::test]
async fn test_session_without_backend_is_denied() {
    let app = TestApp::new();
    seed_portal(&app);
    let user = app.user("carol");
    let session = Session {
        user_id: user.id,
        last_login_backend: None,
    };
    app.sessions.save("legacy-session", &session, 60).await.unwrap();

    let response = app
        .get("/openid/authorize?client_id=portal", Auth::Session("legacy-session"))
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(!app.sessions.contains("legacy-session"));
}

#[tokio::test]
async fn test_no_application_context_allows_any_backend() {
    let app = TestApp::new();
    seed_portal(&app);
    let user = app.user("dave");
    let session_id = app.login(&user, "google").await;

    let response = app
        .get("/openid/authorize", Auth::Session(&session_id))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["client_id"].is_null());

    let response = app
        .get("/openid/authorize?client_id=unknown", Auth::Session(&session_id))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.sessions.contains(&session_id));
}

#[tokio::test]
async fn test_application_without_methods_denies_everyone() {
    let app = TestApp::new();
    app.application("locked");
    let user = app.user("erin");
    let session_id = app.login(&user, "github").await;

    let response = app
        .get("/openid/authorize?client_id=locked", Auth::Session(&session_id))
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(!app.sessions.contains(&session_id));
}
