use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::models::{Application, User};

/// Mints app-to-app tokens. Each token is signed with the target
/// application's client secret, so the target can verify it locally.
#[derive(Clone)]
pub struct JwtService {
    issuer: String,
}

/// Claims describing the current user to a target application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppToAppClaims {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub department_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_groups: Option<Vec<String>>,
    /// Issuer
    pub iss: String,
    /// Subject (user uuid)
    pub sub: String,
    /// Audience (target client id)
    pub aud: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            issuer: config.issuer.clone(),
        }
    }

    /// Build the claim set. `ad_groups` is only consulted when the target
    /// application opted into receiving them.
    pub fn claims_for(
        &self,
        user: &User,
        ad_groups: Vec<String>,
        target: &Application,
        expires_at: DateTime<Utc>,
    ) -> AppToAppClaims {
        AppToAppClaims {
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            department_name: user.department_name.clone(),
            display_name: user.display_name(),
            ad_groups: target.include_ad_groups.then_some(ad_groups),
            iss: self.issuer.clone(),
            sub: user.uuid.to_string(),
            aud: target.client_id.clone(),
            exp: expires_at.timestamp(),
        }
    }

    /// Sign claims with HS256 using the target's client secret.
    pub fn sign(
        &self,
        claims: &AppToAppClaims,
        target: &Application,
        expires_at: DateTime<Utc>,
    ) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        let token = encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(target.client_secret.as_bytes()),
        )?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify a token the way a target application would.
    pub fn decode(
        &self,
        token: &str,
        target: &Application,
    ) -> Result<AppToAppClaims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[target.client_id.as_str()]);
        validation.set_issuer(&[self.issuer.as_str()]);

        let data = decode::<AppToAppClaims>(
            token,
            &DecodingKey::from_secret(target.client_secret.as_bytes()),
            &validation,
        )?;

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn service() -> JwtService {
        JwtService::new(&JwtConfig {
            issuer: "https://api.hel.fi/sso".to_string(),
        })
    }

    #[test]
    fn test_claims_hide_groups_unless_enabled() {
        let mut user = User::new("jdoe", "jdoe@example.com");
        user.first_name = "John".to_string();
        user.last_name = "Doe".to_string();
        let mut target = Application::new("target", "secret", "Target");
        let expires = Utc::now() + Duration::hours(1);

        let claims = service().claims_for(&user, vec!["staff".to_string()], &target, expires);
        assert_eq!(claims.ad_groups, None);
        assert_eq!(claims.display_name.as_deref(), Some("John Doe"));
        assert_eq!(claims.sub, user.uuid.to_string());
        assert_eq!(claims.aud, "target");

        target.include_ad_groups = true;
        let claims = service().claims_for(&user, vec!["staff".to_string()], &target, expires);
        assert_eq!(claims.ad_groups, Some(vec!["staff".to_string()]));
    }

    #[test]
    fn test_sign_and_verify_with_target_secret() {
        let user = User::new("jdoe", "jdoe@example.com");
        let target = Application::new("target", "target-secret", "Target");
        let expires = Utc::now() + Duration::minutes(10);
        let jwt = service();

        let claims = jwt.claims_for(&user, Vec::new(), &target, expires);
        let issued = jwt.sign(&claims, &target, expires).unwrap();
        assert_eq!(jwt.decode(&issued.token, &target).unwrap(), claims);

        let other = Application::new("target", "other-secret", "Other");
        assert!(jwt.decode(&issued.token, &other).is_err());
    }
}
