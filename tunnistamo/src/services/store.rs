//! Repository seam over the relational store.

use async_trait::async_trait;
use service_core::error::AppError;
use uuid::Uuid;

use super::interest::InterestQuery;
use crate::models::{
    AccessToken, AppToAppPermission, Application, Concept, ConceptRef, ContactInfo, Division,
    LoginMethod, Profile, User,
};

/// A user together with the contact fields of their profile, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct UserContact {
    pub uuid: Uuid,
    pub profile: Option<ContactInfo>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>, AppError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    /// AD group display names, sorted.
    async fn user_ad_groups(&self, user_id: i64) -> Result<Vec<String>, AppError>;

    /// OAuth2 access token issued to an application.
    async fn find_access_token(&self, token: &str) -> Result<Option<AccessToken>, AppError>;
    /// OIDC access token; these carry no application.
    async fn find_oidc_token(&self, token: &str) -> Result<Option<AccessToken>, AppError>;

    async fn find_application_by_id(&self, id: i64) -> Result<Option<Application>, AppError>;
    async fn find_application_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<Application>, AppError>;
    async fn find_app_permission(
        &self,
        requester_id: i64,
        target_id: i64,
    ) -> Result<Option<AppToAppPermission>, AppError>;

    /// Every login method, by `order` then name.
    async fn list_login_methods(&self) -> Result<Vec<LoginMethod>, AppError>;
    /// Login methods an application allows, by `order` then name.
    async fn application_login_methods(
        &self,
        application_id: i64,
    ) -> Result<Vec<LoginMethod>, AppError>;

    /// Distinct uuids of users whose profile matches the query.
    async fn find_user_ids_by_interest(&self, query: &InterestQuery)
        -> Result<Vec<Uuid>, AppError>;
    /// Known users among `ids`; unknown ids are absent from the result.
    async fn find_contacts_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserContact>, AppError>;

    async fn find_profile(&self, user_id: i64) -> Result<Option<Profile>, AppError>;
    async fn create_profile(&self, user_id: i64) -> Result<Profile, AppError>;
    /// Persist scalar fields and replace both interest sets.
    async fn save_profile(&self, profile: &Profile) -> Result<(), AppError>;

    async fn find_divisions(&self, ocd_ids: &[String]) -> Result<Vec<Division>, AppError>;
    async fn find_concepts(&self, refs: &[ConceptRef]) -> Result<Vec<Concept>, AppError>;
}
