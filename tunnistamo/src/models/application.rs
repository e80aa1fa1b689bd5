//! OAuth client applications and the app-to-app permission table.

use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Application {
    pub id: i64,
    pub client_id: String,
    /// Shared secret; also the HS256 key for tokens minted for this application.
    pub client_secret: String,
    pub name: String,
    pub include_ad_groups: bool,
}

impl Application {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            name: name.into(),
            include_ad_groups: false,
        }
    }
}

/// Directed grant: `requester_id` may mint tokens addressed to `target_id`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct AppToAppPermission {
    pub id: i64,
    pub requester_id: i64,
    pub target_id: i64,
}
