//! Shared setup for the HTTP integration tests.
//!
//! Everything runs against the in-memory store and session store, so no
//! PostgreSQL or Redis is needed.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHasher,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::Sha256;
use chrono::{Duration, Utc};
use service_core::config::Config as CoreConfig;
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use std::sync::Arc;
use tower::util::ServiceExt;
use tunnistamo::{
    build_router,
    config::{
        DatabaseConfig, Environment, JwtConfig, LoginConfig, RateLimitConfig, RedisConfig,
        SecurityConfig, TunnistamoConfig,
    },
    models::{AccessToken, Application, User},
    services::{
        session::start_session, JwtService, MemoryStore, MockSessionStore, ProviderRegistry,
    },
    AppState,
};

pub const TEST_ISSUER: &str = "https://sso.test";
pub const TEST_PASSWORD: &str = "correct horse battery staple";
pub const SESSION_COOKIE: &str = "sessionid";

/// `pbkdf2_sha256$<iterations>$<salt>$<digest>`, as the identity provider
/// stores it. Low iteration count keeps the suite fast.
pub fn pbkdf2_encoded(password: &str) -> String {
    let (iterations, salt) = (1000, "testsalt");
    let mut digest = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut digest);
    format!("pbkdf2_sha256${}${}${}", iterations, salt, STANDARD.encode(digest))
}

/// `argon2` followed by the PHC string without its leading `$`.
pub fn argon2_encoded(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string();
    format!("argon2{}", phc)
}

pub fn test_config() -> TunnistamoConfig {
    TunnistamoConfig {
        common: CoreConfig::default(),
        environment: Environment::Dev,
        service_name: "tunnistamo-test".to_string(),
        service_version: "0.0.0".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        redis: RedisConfig {
            url: "redis://unused".to_string(),
        },
        jwt: JwtConfig {
            issuer: TEST_ISSUER.to_string(),
        },
        login: LoginConfig {
            login_url: "/login/".to_string(),
            providers: "github,google=/auth/google/start/,helsinki_adfs,yletunnus=/auth/yle/?realm=hel"
                .to_string(),
            session_cookie_name: SESSION_COOKIE.to_string(),
            session_ttl_seconds: 3600,
            secure_cookies: false,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        rate_limit: RateLimitConfig {
            global_ip_limit: 1000,
            global_ip_window_seconds: 60,
            jwt_token_limit: 1000,
            jwt_token_window_seconds: 60,
        },
    }
}

/// Router over in-memory stores; the stores stay reachable for seeding and
/// assertions.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub sessions: Arc<MockSessionStore>,
    pub jwt: JwtService,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: TunnistamoConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let sessions = Arc::new(MockSessionStore::new());
        let jwt = JwtService::new(&config.jwt);

        let state = AppState {
            providers: Arc::new(ProviderRegistry::from_spec(&config.login.providers)),
            ip_rate_limiter: create_ip_rate_limiter(
                config.rate_limit.global_ip_limit,
                config.rate_limit.global_ip_window_seconds,
            ),
            jwt_rate_limiter: create_ip_rate_limiter(
                config.rate_limit.jwt_token_limit,
                config.rate_limit.jwt_token_window_seconds,
            ),
            config,
            store: store.clone(),
            sessions: sessions.clone(),
            jwt: jwt.clone(),
            metrics: None,
        };

        let router = build_router(state).expect("Failed to build router");

        Self {
            store,
            sessions,
            jwt,
            router,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed")
    }

    pub async fn get(&self, uri: &str, auth: Auth<'_>) -> Response<Body> {
        self.send(auth.apply(Request::get(uri)).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_form(&self, uri: &str, auth: Auth<'_>, form: &str) -> Response<Body> {
        self.send(
            auth.apply(Request::post(uri))
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn send_json(
        &self,
        method: &str,
        uri: &str,
        auth: Auth<'_>,
        body: serde_json::Value,
    ) -> Response<Body> {
        self.send(
            auth.apply(Request::builder().method(method).uri(uri))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Active user whose password is [`TEST_PASSWORD`].
    pub fn user(&self, username: &str) -> User {
        self.user_with_password(username, pbkdf2_encoded(TEST_PASSWORD))
    }

    pub fn user_with_password(&self, username: &str, encoded: String) -> User {
        let mut user = User::new(username, format!("{}@example.com", username));
        user.first_name = "Test".to_string();
        user.last_name = "User".to_string();
        user.password = encoded;
        self.store.insert_user(user).unwrap()
    }

    pub fn application(&self, client_id: &str) -> Application {
        self.store
            .insert_application(Application::new(
                client_id,
                format!("{}-secret-0123456789", client_id),
                format!("{} app", client_id),
            ))
            .unwrap()
    }

    /// Bearer token for `user` issued to `app` with the given scope.
    pub fn token(&self, user: &User, app: &Application, scope: &str) -> String {
        let value = format!("tok-{}", uuid::Uuid::new_v4().simple());
        self.store
            .insert_access_token(AccessToken {
                id: 0,
                token: value.clone(),
                user_id: Some(user.id),
                application_id: Some(app.id),
                expires: Utc::now() + Duration::hours(1),
                scope: scope.to_string(),
            })
            .unwrap();
        value
    }

    /// OIDC access token for `user` with the given scope.
    pub fn oidc_token(&self, user: &User, scope: &str) -> String {
        let value = format!("oidc-{}", uuid::Uuid::new_v4().simple());
        self.store
            .insert_oidc_token(AccessToken {
                id: 0,
                token: value.clone(),
                user_id: Some(user.id),
                application_id: None,
                expires: Utc::now() + Duration::hours(1),
                scope: scope.to_string(),
            })
            .unwrap();
        value
    }

    /// Session id of a fresh login through `backend`.
    pub async fn login(&self, user: &User, backend: &str) -> String {
        start_session(self.sessions.as_ref(), user.id, backend, 3600)
            .await
            .unwrap()
    }
}

/// How a request authenticates.
#[derive(Clone, Copy)]
pub enum Auth<'a> {
    None,
    Bearer(&'a str),
    Basic(&'a str, &'a str),
    Session(&'a str),
}

impl Auth<'_> {
    fn apply(self, builder: axum::http::request::Builder) -> axum::http::request::Builder {
        match self {
            Auth::None => builder,
            Auth::Bearer(token) => {
                builder.header(header::AUTHORIZATION, format!("Bearer {}", token))
            }
            Auth::Basic(username, password) => builder.header(
                header::AUTHORIZATION,
                format!(
                    "Basic {}",
                    STANDARD.encode(format!("{}:{}", username, password))
                ),
            ),
            Auth::Session(id) => {
                builder.header(header::COOKIE, format!("{}={}", SESSION_COOKIE, id))
            }
        }
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("Location header missing")
        .to_str()
        .unwrap()
        .to_string()
}
