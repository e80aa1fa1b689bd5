//! Request and response shapes for the HTTP API that are not models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::LoginMethodResponse;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Not found.")]
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct JwtTokenQuery {
    /// Client id of the application the token is for. Defaults to the caller.
    pub target_app: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JwtTokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct InterestQueryParams {
    /// Comma separated OCD division ids.
    pub division: Option<String>,
    /// Comma separated concepts, `prefix:code` or keyword URLs.
    pub yso: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct InterestForm {
    #[serde(default)]
    pub divisions: Vec<String>,
    #[serde(default)]
    pub yso: Vec<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ContactQueryParams {
    /// Comma separated user uuids.
    pub ids: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ContactForm {
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct NextQuery {
    /// Where to continue after login or logout.
    pub next: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginMethodsResponse {
    pub login_methods: Vec<LoginMethodResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub detail: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AuthorizeQuery {
    pub client_id: Option<String>,
}

/// Hand-off to the OIDC provider once the login gate has passed.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthorizeResponse {
    pub client_id: Option<String>,
    pub sub: Uuid,
}
