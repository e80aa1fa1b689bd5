//! Request authentication.
//!
//! Three entry points, one per family of endpoints:
//! - [`token_auth_middleware`]: OAuth2 bearer token with read/write scope.
//! - [`user_auth_middleware`]: session cookie or HTTP Basic.
//! - [`profile_auth_middleware`]: session, HTTP Basic, or OIDC bearer with `openid`.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use service_core::error::AppError;

use crate::{
    models::{
        access_token::{OPENID_SCOPE, READ_SCOPE, WRITE_SCOPE},
        AccessToken, Application, User,
    },
    services::Session,
    utils::{verify_password, EncodedPassword, Password},
    AppState,
};

/// The authenticated caller, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    /// Bearer token the request was made with, if any.
    pub access_token: Option<AccessToken>,
    /// Application the bearer token was issued to.
    pub application: Option<Application>,
    /// Session the request was made with, if any.
    pub session: Option<(String, Session)>,
}

impl AuthContext {
    fn for_user(user: User) -> Self {
        Self {
            user,
            access_token: None,
            application: None,
            session: None,
        }
    }
}

/// Extractor to easily get the caller in handlers
pub struct AuthUser(pub AuthContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts.extensions.get::<AuthContext>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Auth context missing from request extensions"
            ))
        })?;

        Ok(AuthUser(ctx.clone()))
    }
}

fn not_authenticated() -> AppError {
    AppError::Unauthorized(anyhow::anyhow!(
        "Authentication credentials were not provided."
    ))
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let encoded = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "))?;

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Resolve the session cookie to an active user. Stale or dangling sessions
/// count as anonymous.
pub(crate) async fn session_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<(String, Session, User)>, AppError> {
    let jar = CookieJar::from_headers(headers);
    let Some(session_id) = jar
        .get(&state.config.login.session_cookie_name)
        .map(|c| c.value().to_string())
    else {
        return Ok(None);
    };

    let Some(session) = state.sessions.load(&session_id).await? else {
        return Ok(None);
    };

    let user = state.store.find_user_by_id(session.user_id).await?;
    Ok(user
        .filter(|u| u.is_active)
        .map(|user| (session_id, session, user)))
}

async fn basic_user(state: &AppState, headers: &HeaderMap) -> Result<Option<User>, AppError> {
    let Some((username, password)) = basic_credentials(headers) else {
        return Ok(None);
    };

    let invalid = || AppError::Unauthorized(anyhow::anyhow!("Invalid username/password."));

    let user = state
        .store
        .find_user_by_username(&username)
        .await?
        .filter(|u| u.is_active && u.has_usable_password())
        .ok_or_else(invalid)?;

    verify_password(
        &Password::new(password),
        &EncodedPassword::new(user.password.clone()),
    )
    .map_err(|_| invalid())?;

    Ok(Some(user))
}

/// Session first, then HTTP Basic.
async fn session_or_basic(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<AuthContext>, AppError> {
    if let Some((session_id, session, user)) = session_user(state, headers).await? {
        let mut ctx = AuthContext::for_user(user);
        ctx.session = Some((session_id, session));
        return Ok(Some(ctx));
    }

    Ok(basic_user(state, headers).await?.map(AuthContext::for_user))
}

/// Middleware for the OAuth2 API: bearer access token, `read` scope for safe
/// methods and `write` scope otherwise.
pub async fn token_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers()).ok_or_else(not_authenticated)?;

    let access_token = state
        .store
        .find_access_token(token)
        .await?
        .filter(|t| !t.has_expired())
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Invalid or expired token")))?;

    let required = match *req.method() {
        Method::GET | Method::HEAD | Method::OPTIONS => READ_SCOPE,
        _ => WRITE_SCOPE,
    };
    if !access_token.has_scope(required) {
        tracing::debug!(scope = %access_token.scope, required, "Token scope insufficient");
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "You do not have permission to perform this action."
        )));
    }

    let user = match access_token.user_id {
        Some(user_id) => state.store.find_user_by_id(user_id).await?,
        None => None,
    }
    .filter(|u| u.is_active)
    .ok_or_else(not_authenticated)?;

    let application = match access_token.application_id {
        Some(id) => state.store.find_application_by_id(id).await?,
        None => None,
    };

    req.extensions_mut().insert(AuthContext {
        user,
        access_token: Some(access_token),
        application,
        session: None,
    });

    Ok(next.run(req).await)
}

/// Middleware for the bulk lookups: session cookie or HTTP Basic.
pub async fn user_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = session_or_basic(&state, req.headers())
        .await?
        .ok_or_else(not_authenticated)?;

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

/// Middleware for the own-profile API: session, HTTP Basic, or an OIDC
/// bearer token carrying the `openid` scope. OAuth2 API tokens are not
/// accepted here.
pub async fn profile_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(ctx) = session_or_basic(&state, req.headers()).await? {
        req.extensions_mut().insert(ctx);
        return Ok(next.run(req).await);
    }

    let token = bearer_token(req.headers()).ok_or_else(not_authenticated)?;

    let access_token = state
        .store
        .find_oidc_token(token)
        .await?
        .ok_or_else(|| {
            tracing::debug!("Bearer token does not exist");
            AppError::Unauthorized(anyhow::anyhow!("invalid_token"))
        })?;

    if access_token.has_expired() {
        tracing::debug!("Bearer token has expired");
        return Err(AppError::Unauthorized(anyhow::anyhow!("invalid_token")));
    }

    if !access_token.has_scope(OPENID_SCOPE) {
        tracing::debug!("Bearer token is missing the openid scope");
        return Err(AppError::Unauthorized(anyhow::anyhow!("insufficient_scope")));
    }

    let user = match access_token.user_id {
        Some(user_id) => state.store.find_user_by_id(user_id).await?,
        None => None,
    }
    .filter(|u| u.is_active)
    .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("invalid_token")))?;

    req.extensions_mut().insert(AuthContext {
        user,
        access_token: Some(access_token),
        application: None,
        session: None,
    });

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_basic_credentials_decoding() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {}", STANDARD.encode("jdoe:pa:ss"))).unwrap(),
        );
        assert_eq!(
            basic_credentials(&headers),
            Some(("jdoe".to_string(), "pa:ss".to_string()))
        );
    }

    #[test]
    fn test_bearer_token_requires_value() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));
    }
}
