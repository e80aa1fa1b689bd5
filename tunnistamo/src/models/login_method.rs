use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Provider id that is configured in the data but no longer offered for login.
pub const SAML_PROVIDER_ID: &str = "saml";

/// A federated identity provider an application may allow.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct LoginMethod {
    pub id: i64,
    pub provider_id: String,
    pub name: String,
    pub background_color: Option<String>,
    pub logo_url: Option<String>,
    pub short_description: Option<String>,
    pub order: Option<i32>,
}

impl LoginMethod {
    pub fn new(provider_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: 0,
            provider_id: provider_id.into(),
            name: name.into(),
            background_color: None,
            logo_url: None,
            short_description: None,
            order: None,
        }
    }
}

/// A login method offered on the login page, with the URL that starts its flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct LoginMethodResponse {
    pub provider_id: String,
    pub name: String,
    pub background_color: Option<String>,
    pub logo_url: Option<String>,
    pub short_description: Option<String>,
    pub login_url: String,
}

impl LoginMethodResponse {
    pub fn new(method: &LoginMethod, login_url: String) -> Self {
        Self {
            provider_id: method.provider_id.clone(),
            name: method.name.clone(),
            background_color: method.background_color.clone(),
            logo_url: method.logo_url.clone(),
            short_description: method.short_description.clone(),
            login_url,
        }
    }
}
