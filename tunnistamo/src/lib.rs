pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use metrics_exporter_prometheus::PrometheusHandle;
use service_core::axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Json, Router,
};
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::config::TunnistamoConfig;
use crate::services::{JwtService, ProviderRegistry, SessionStore, Store};
use service_core::error::AppError;
use std::sync::Arc;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::login::login,
        handlers::login::logout,
        handlers::login::authorize,
        handlers::user::get_current_user,
        handlers::user::get_user,
        handlers::jwt::get_jwt_token,
        handlers::profile::get_profile,
        handlers::profile::put_profile,
        handlers::profile::patch_profile,
        handlers::profile::interested_get,
        handlers::profile::interested_post,
        handlers::profile::contact_info_get,
        handlers::profile::contact_info_post,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::JwtTokenResponse,
            dtos::InterestForm,
            dtos::ContactForm,
            dtos::LoginMethodsResponse,
            dtos::LogoutResponse,
            dtos::AuthorizeResponse,
            models::UserResponse,
            models::LoginMethodResponse,
            models::ProfileResponse,
            models::ProfileUpdateRequest,
            models::ContactInfo,
            models::Language,
            models::ContactMethod,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Login", description = "Login method selection, logout and the login gate"),
        (name = "User", description = "User information for OAuth2 clients"),
        (name = "Token", description = "App-to-app JWT issuance"),
        (name = "Profile", description = "Own profile and notification lookups"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
            components.add_security_scheme(
                "basic_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Basic).build()),
            );
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("sessionid"))),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: TunnistamoConfig,
    pub store: Arc<dyn Store>,
    pub sessions: Arc<dyn SessionStore>,
    pub jwt: JwtService,
    pub providers: Arc<ProviderRegistry>,
    pub ip_rate_limiter: IpRateLimiter,
    pub jwt_rate_limiter: IpRateLimiter,
    /// `None` when no recorder is installed (tests); `/metrics` then answers 404.
    pub metrics: Option<PrometheusHandle>,
}

pub fn build_router(state: AppState) -> Result<Router, AppError> {
    // OAuth2 bearer token endpoints
    let jwt_limiter = state.jwt_rate_limiter.clone();
    let token_routes = Router::new()
        .route("/v1/user/", get(handlers::user::get_current_user))
        .route("/v1/user/:username/", get(handlers::user::get_user))
        .merge(
            Router::new()
                .route("/v1/jwt-token/", get(handlers::jwt::get_jwt_token))
                .layer(from_fn_with_state(jwt_limiter, ip_rate_limit_middleware)),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::token_auth_middleware,
        ));

    // Notification service lookups: session or Basic
    let lookup_routes = Router::new()
        .route(
            "/v1/profile/interested/",
            get(handlers::profile::interested_get).post(handlers::profile::interested_post),
        )
        .route(
            "/v1/profile/contact_info/",
            get(handlers::profile::contact_info_get).post(handlers::profile::contact_info_post),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::user_auth_middleware,
        ));

    let profile_routes = Router::new()
        .route(
            "/v1/profile/",
            get(handlers::profile::get_profile)
                .put(handlers::profile::put_profile)
                .patch(handlers::profile::patch_profile),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::profile_auth_middleware,
        ));

    let allowed_origins = state
        .config
        .security
        .allowed_origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
            })
        })
        .collect::<Result<Vec<HeaderValue>, AppError>>()?;

    let ip_limiter = state.ip_rate_limiter.clone();

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .route("/login/", get(handlers::login::login))
        .route("/logout/", get(handlers::login::logout))
        .route("/openid/authorize", get(handlers::login::authorize))
        .merge(token_routes)
        .merge(lookup_routes)
        .merge(profile_routes)
        .with_state(state)
        // Global IP rate limiting
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri().path(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        );

    Ok(app)
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "A backing store is unreachable")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    service_core::axum::extract::State(state): service_core::axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Database health check failed");
        e
    })?;

    state.sessions.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Session store health check failed");
        e
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "database": "up",
            "sessions": "up"
        }
    })))
}
