//! User model - accounts that log in through a federated backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// User entity.
///
/// `uuid` is the stable identifier exposed to other applications; `id` never
/// leaves the service.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub uuid: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub department_name: Option<String>,
    pub primary_sid: String,
    /// `<algorithm>$...` encoded password used for HTTP Basic. Empty or
    /// `!`-prefixed when unusable.
    pub password: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Create a new active user. The store assigns `id` on insert.
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: 0,
            uuid: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            department_name: None,
            primary_sid: Uuid::new_v4().to_string(),
            password: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            last_login: None,
            date_joined: Utc::now(),
        }
    }

    /// "First Last", only when both names are set.
    pub fn display_name(&self) -> Option<String> {
        if self.first_name.is_empty() || self.last_name.is_empty() {
            return None;
        }
        Some(format!("{} {}", self.first_name, self.last_name))
    }

    pub fn has_usable_password(&self) -> bool {
        !self.password.is_empty() && !self.password.starts_with('!')
    }
}

/// Public representation of a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct UserResponse {
    pub last_login: Option<DateTime<Utc>>,
    pub username: String,
    pub email: String,
    pub date_joined: DateTime<Utc>,
    pub first_name: String,
    pub last_name: String,
    pub uuid: Uuid,
    pub department_name: Option<String>,
    /// AD group display names; omitted unless the calling application may see them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_groups: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl UserResponse {
    pub fn new(user: &User, ad_groups: Option<Vec<String>>) -> Self {
        Self {
            last_login: user.last_login,
            username: user.username.clone(),
            email: user.email.clone(),
            date_joined: user.date_joined,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            uuid: user.uuid,
            department_name: user.department_name.clone(),
            ad_groups,
            display_name: user.display_name(),
        }
    }
}
