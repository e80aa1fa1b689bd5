//! OAuth2 / OIDC bearer access tokens issued by the provider layer.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

pub const READ_SCOPE: &str = "read";
pub const WRITE_SCOPE: &str = "write";
pub const OPENID_SCOPE: &str = "openid";

#[derive(Debug, Clone, FromRow)]
pub struct AccessToken {
    pub id: i64,
    pub token: String,
    /// Absent for client-credential tokens.
    pub user_id: Option<i64>,
    pub application_id: Option<i64>,
    pub expires: DateTime<Utc>,
    /// Space separated scope list.
    pub scope: String,
}

impl AccessToken {
    pub fn has_expired(&self) -> bool {
        Utc::now() >= self.expires
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope.split_whitespace().any(|s| s == scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(scope: &str, expires: DateTime<Utc>) -> AccessToken {
        AccessToken {
            id: 1,
            token: "abc".to_string(),
            user_id: Some(1),
            application_id: Some(1),
            expires,
            scope: scope.to_string(),
        }
    }

    #[test]
    fn test_scope_matching_is_exact() {
        let t = token("openid read", Utc::now() + Duration::hours(1));
        assert!(t.has_scope(OPENID_SCOPE));
        assert!(t.has_scope(READ_SCOPE));
        assert!(!t.has_scope(WRITE_SCOPE));
        assert!(!t.has_scope("open"));
    }

    #[test]
    fn test_expiry() {
        assert!(token("read", Utc::now() - Duration::seconds(1)).has_expired());
        assert!(!token("read", Utc::now() + Duration::minutes(5)).has_expired());
    }
}
