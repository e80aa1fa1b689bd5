//! In-process store used by tests and local runs without PostgreSQL.

use async_trait::async_trait;
use service_core::error::AppError;
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::interest::InterestQuery;
use super::store::{Store, UserContact};
use crate::models::{
    AccessToken, AppToAppPermission, Application, Concept, ConceptRef, Division, LoginMethod,
    Profile, User,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    ad_groups: Vec<(i64, String)>,
    tokens: Vec<AccessToken>,
    oidc_tokens: Vec<AccessToken>,
    applications: Vec<Application>,
    permissions: Vec<AppToAppPermission>,
    login_methods: Vec<LoginMethod>,
    application_login_methods: Vec<(i64, i64)>,
    profiles: Vec<Profile>,
    divisions: Vec<Division>,
    concepts: Vec<Concept>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

fn sorted_methods(mut methods: Vec<LoginMethod>) -> Vec<LoginMethod> {
    methods.sort_by(|a, b| match (a.order, b.order) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.name.cmp(&b.name)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    });
    methods
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Memory store mutex poisoned: {}", e)))
    }

    pub fn insert_user(&self, mut user: User) -> Result<User, AppError> {
        let mut tables = self.lock()?;
        user.id = tables.next_id();
        tables.users.push(user.clone());
        Ok(user)
    }

    pub fn add_ad_group(&self, user_id: i64, display_name: &str) -> Result<(), AppError> {
        self.lock()?.ad_groups.push((user_id, display_name.to_string()));
        Ok(())
    }

    pub fn insert_access_token(&self, mut token: AccessToken) -> Result<AccessToken, AppError> {
        let mut tables = self.lock()?;
        token.id = tables.next_id();
        tables.tokens.push(token.clone());
        Ok(token)
    }

    pub fn insert_oidc_token(&self, mut token: AccessToken) -> Result<AccessToken, AppError> {
        let mut tables = self.lock()?;
        token.id = tables.next_id();
        tables.oidc_tokens.push(token.clone());
        Ok(token)
    }

    pub fn insert_application(&self, mut app: Application) -> Result<Application, AppError> {
        let mut tables = self.lock()?;
        app.id = tables.next_id();
        tables.applications.push(app.clone());
        Ok(app)
    }

    pub fn grant_app_permission(&self, requester_id: i64, target_id: i64) -> Result<(), AppError> {
        let mut tables = self.lock()?;
        let id = tables.next_id();
        tables.permissions.push(AppToAppPermission {
            id,
            requester_id,
            target_id,
        });
        Ok(())
    }

    pub fn insert_login_method(&self, mut method: LoginMethod) -> Result<LoginMethod, AppError> {
        let mut tables = self.lock()?;
        method.id = tables.next_id();
        tables.login_methods.push(method.clone());
        Ok(method)
    }

    pub fn allow_login_method(&self, application_id: i64, method_id: i64) -> Result<(), AppError> {
        self.lock()?
            .application_login_methods
            .push((application_id, method_id));
        Ok(())
    }

    pub fn insert_division(&self, mut division: Division) -> Result<Division, AppError> {
        let mut tables = self.lock()?;
        division.id = tables.next_id();
        tables.divisions.push(division.clone());
        Ok(division)
    }

    pub fn insert_concept(&self, mut concept: Concept) -> Result<Concept, AppError> {
        let mut tables = self.lock()?;
        concept.id = tables.next_id();
        tables.concepts.push(concept.clone());
        Ok(concept)
    }

    /// Insert a profile as is; interest references are not checked.
    pub fn insert_profile(&self, mut profile: Profile) -> Result<Profile, AppError> {
        let mut tables = self.lock()?;
        profile.id = tables.next_id();
        tables.profiles.push(profile.clone());
        Ok(profile)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        self.lock().map(|_| ())
    }

    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>, AppError> {
        Ok(self.lock()?.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn user_ad_groups(&self, user_id: i64) -> Result<Vec<String>, AppError> {
        let mut groups: Vec<String> = self
            .lock()?
            .ad_groups
            .iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, name)| name.clone())
            .collect();
        groups.sort();
        Ok(groups)
    }

    async fn find_access_token(&self, token: &str) -> Result<Option<AccessToken>, AppError> {
        Ok(self
            .lock()?
            .tokens
            .iter()
            .find(|t| t.token == token)
            .cloned())
    }

    async fn find_oidc_token(&self, token: &str) -> Result<Option<AccessToken>, AppError> {
        Ok(self
            .lock()?
            .oidc_tokens
            .iter()
            .find(|t| t.token == token)
            .cloned())
    }

    async fn find_application_by_id(&self, id: i64) -> Result<Option<Application>, AppError> {
        Ok(self
            .lock()?
            .applications
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn find_application_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<Application>, AppError> {
        Ok(self
            .lock()?
            .applications
            .iter()
            .find(|a| a.client_id == client_id)
            .cloned())
    }

    async fn find_app_permission(
        &self,
        requester_id: i64,
        target_id: i64,
    ) -> Result<Option<AppToAppPermission>, AppError> {
        Ok(self
            .lock()?
            .permissions
            .iter()
            .find(|p| p.requester_id == requester_id && p.target_id == target_id)
            .cloned())
    }

    async fn list_login_methods(&self) -> Result<Vec<LoginMethod>, AppError> {
        Ok(sorted_methods(self.lock()?.login_methods.clone()))
    }

    async fn application_login_methods(
        &self,
        application_id: i64,
    ) -> Result<Vec<LoginMethod>, AppError> {
        let tables = self.lock()?;
        let methods = tables
            .login_methods
            .iter()
            .filter(|m| {
                tables
                    .application_login_methods
                    .contains(&(application_id, m.id))
            })
            .cloned()
            .collect();
        Ok(sorted_methods(methods))
    }

    async fn find_user_ids_by_interest(
        &self,
        query: &InterestQuery,
    ) -> Result<Vec<Uuid>, AppError> {
        let tables = self.lock()?;
        let ids: BTreeSet<Uuid> = tables
            .profiles
            .iter()
            .filter(|p| query.matches(p))
            .filter_map(|p| tables.users.iter().find(|u| u.id == p.user_id))
            .map(|u| u.uuid)
            .collect();
        Ok(ids.into_iter().collect())
    }

    async fn find_contacts_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserContact>, AppError> {
        let tables = self.lock()?;
        Ok(tables
            .users
            .iter()
            .filter(|u| ids.contains(&u.uuid))
            .map(|u| UserContact {
                uuid: u.uuid,
                profile: tables
                    .profiles
                    .iter()
                    .find(|p| p.user_id == u.id)
                    .map(Profile::contact_info),
            })
            .collect())
    }

    async fn find_profile(&self, user_id: i64) -> Result<Option<Profile>, AppError> {
        Ok(self
            .lock()?
            .profiles
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    async fn create_profile(&self, user_id: i64) -> Result<Profile, AppError> {
        self.insert_profile(Profile::new(user_id))
    }

    async fn save_profile(&self, profile: &Profile) -> Result<(), AppError> {
        let mut tables = self.lock()?;
        let slot = tables
            .profiles
            .iter_mut()
            .find(|p| p.id == profile.id)
            .ok_or_else(|| {
                AppError::DatabaseError(anyhow::anyhow!("Profile {} does not exist", profile.id))
            })?;
        *slot = profile.clone();
        Ok(())
    }

    async fn find_divisions(&self, ocd_ids: &[String]) -> Result<Vec<Division>, AppError> {
        Ok(self
            .lock()?
            .divisions
            .iter()
            .filter(|d| ocd_ids.contains(&d.ocd_id))
            .cloned()
            .collect())
    }

    async fn find_concepts(&self, refs: &[ConceptRef]) -> Result<Vec<Concept>, AppError> {
        Ok(self
            .lock()?
            .concepts
            .iter()
            .filter(|c| refs.contains(&c.reference()))
            .cloned()
            .collect())
    }
}
