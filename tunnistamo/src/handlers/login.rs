use axum::{
    extract::{OriginalUri, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use service_core::error::AppError;
use url::form_urlencoded;

use crate::{
    dtos::{AuthorizeQuery, AuthorizeResponse, LoginMethodsResponse, LogoutResponse, NextQuery},
    middleware::auth::session_user,
    models::{login_method::SAML_PROVIDER_ID, LoginMethodResponse},
    services::login_gate::{check_login, login_redirect, GateOutcome},
    AppState,
};

/// Plain 302, which `Redirect` does not offer.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

fn removal_cookie(state: &AppState) -> Cookie<'static> {
    Cookie::build((state.config.login.session_cookie_name.clone(), ""))
        .path("/")
        .http_only(true)
        .secure(state.config.login.secure_cookies)
        .build()
}

/// `client_id` from the query string of a (possibly relative) URL.
fn client_id_from_next(next: &str) -> Option<String> {
    let (_, query) = next.split_once('?')?;
    let query = query.split('#').next().unwrap_or_default();
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "client_id")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[utoipa::path(
    get,
    path = "/login/",
    params(NextQuery),
    responses(
        (status = 200, description = "Login methods to choose from", body = LoginMethodsResponse),
        (status = 302, description = "Only one method available; redirect to it")
    ),
    tag = "Login"
)]
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
) -> Result<Response, AppError> {
    let next = query.next.filter(|n| !n.is_empty());

    let application = match next.as_deref().and_then(client_id_from_next) {
        Some(client_id) => {
            state
                .store
                .find_application_by_client_id(&client_id)
                .await?
        }
        None => None,
    };

    let methods = match &application {
        Some(app) => state.store.application_login_methods(app.id).await?,
        None => state.store.list_login_methods().await?,
    };

    let mut offered = Vec::with_capacity(methods.len());
    for method in &methods {
        if method.provider_id == SAML_PROVIDER_ID {
            continue;
        }
        let Some(provider) = state.providers.get(&method.provider_id) else {
            tracing::warn!(provider = %method.provider_id, "Login method has no registered provider");
            continue;
        };

        let login_url = match &next {
            Some(next) => login_redirect(&provider.login_url, next),
            None => provider.login_url.clone(),
        };
        offered.push(LoginMethodResponse::new(method, login_url));
    }

    if let [only] = offered.as_slice() {
        return Ok(found(&only.login_url));
    }

    Ok(Json(LoginMethodsResponse {
        login_methods: offered,
    })
    .into_response())
}

#[utoipa::path(
    get,
    path = "/logout/",
    params(NextQuery),
    responses(
        (status = 200, description = "Logged out", body = LogoutResponse),
        (status = 302, description = "Logged out; redirect to an absolute next URL")
    ),
    tag = "Login"
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<NextQuery>,
) -> Result<(CookieJar, Response), AppError> {
    let cookie_name = &state.config.login.session_cookie_name;

    if let Some(session_id) = jar.get(cookie_name).map(|c| c.value().to_string()) {
        state.sessions.delete(&session_id).await?;
        tracing::info!("Session terminated");
    }
    let jar = jar.remove(removal_cookie(&state));

    let response = match query.next.as_deref() {
        Some(next) if next.starts_with("http://") || next.starts_with("https://") => found(next),
        _ => Json(LogoutResponse {
            detail: "Logged out".to_string(),
        })
        .into_response(),
    };

    Ok((jar, response))
}

/// Entry to the OIDC authorization flow. Runs the login gate before handing
/// the user over to the provider layer.
#[utoipa::path(
    get,
    path = "/openid/authorize",
    params(AuthorizeQuery),
    responses(
        (status = 200, description = "Login allowed for the client", body = AuthorizeResponse),
        (status = 302, description = "Not logged in, or login method not allowed; redirect to login")
    ),
    tag = "Login"
)]
pub async fn authorize(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    jar: CookieJar,
    Query(query): Query<AuthorizeQuery>,
) -> Result<(CookieJar, Response), AppError> {
    let full_path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    let login_url = &state.config.login.login_url;

    let Some((session_id, session, user)) = session_user(&state, &headers).await? else {
        return Ok((jar, found(&login_redirect(login_url, &full_path))));
    };

    let application = match query.client_id.as_deref().map(str::trim) {
        Some(client_id) if !client_id.is_empty() => {
            state
                .store
                .find_application_by_client_id(client_id)
                .await?
        }
        _ => None,
    };

    match check_login(state.store.as_ref(), &session, application.as_ref()).await? {
        GateOutcome::Deny(_) => {
            state.sessions.delete(&session_id).await?;
            let jar = jar.remove(removal_cookie(&state));
            Ok((jar, found(&login_redirect(login_url, &full_path))))
        }
        GateOutcome::Allow => {
            state
                .sessions
                .touch(&session_id, state.config.login.session_ttl_seconds)
                .await?;

            let body = AuthorizeResponse {
                client_id: application.map(|a| a.client_id),
                sub: user.uuid,
            };
            Ok((jar, Json(body).into_response()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_from_relative_next() {
        assert_eq!(
            client_id_from_next("/openid/authorize?response_type=code&client_id=abc%20"),
            Some("abc".to_string())
        );
        assert_eq!(client_id_from_next("/openid/authorize"), None);
        assert_eq!(client_id_from_next("/x?client_id="), None);
    }

    #[test]
    fn test_found_is_302() {
        let res = found("/login/");
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/login/");
    }
}
