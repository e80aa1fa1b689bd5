//! PostgreSQL store.
//!
//! Reads the schema owned by the identity provider; table and column names
//! follow its conventions. Queries are checked at runtime.
//!
//! Key columns are `integer` or `bigint` depending on the table's age, so
//! every id is selected as `int8`.

use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use super::interest::InterestQuery;
use super::store::{Store, UserContact};
use crate::models::{
    AccessToken, AppToAppPermission, Application, Concept, ConceptRef, ContactInfo, Division,
    LoginMethod, Profile, User,
};

const USER_COLUMNS: &str = "id::int8 AS id, uuid, username, email, first_name, last_name,
    department_name, primary_sid, password, is_active, is_staff, is_superuser, last_login,
    date_joined";

// Choice columns are NOT NULL with '' meaning unset.
const PROFILE_COLUMNS: &str = "id::int8 AS id, user_id::int8 AS user_id, email, phone,
    pushbullet_access_token, firebase_token, NULLIF(language, '') AS language,
    NULLIF(contact_method, '') AS contact_method, preferences";

const APPLICATION_COLUMNS: &str =
    "id::int8 AS id, client_id, client_secret, name, include_ad_groups";

const LOGIN_METHOD_COLUMNS: &str = r#"lm.id::int8 AS id, lm.provider_id, lm.name,
    lm.background_color, lm.logo_url, lm.short_description, lm."order""#;

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct ContactRow {
    uuid: Uuid,
    profile_id: Option<i64>,
    email: Option<String>,
    pushbullet_access_token: Option<String>,
    firebase_token: Option<String>,
    phone: Option<String>,
    language: Option<String>,
    contact_method: Option<String>,
}

impl From<ContactRow> for UserContact {
    fn from(row: ContactRow) -> Self {
        let profile = row.profile_id.map(|_| ContactInfo {
            email: row.email,
            pushbullet: row.pushbullet_access_token,
            firebase: row.firebase_token,
            phone: row.phone,
            language: row.language,
            contact_method: row.contact_method,
        });
        UserContact {
            uuid: row.uuid,
            profile,
        }
    }
}

impl Database {
    /// Create a new database wrapper from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_interests(&self, profile: &mut Profile) -> Result<(), AppError> {
        profile.divisions_of_interest = sqlx::query_scalar::<_, String>(
            r#"
            SELECT d.ocd_id FROM users_profile_divisions_of_interest pd
            JOIN munigeo_administrativedivision d ON d.id = pd.administrativedivision_id
            WHERE pd.profile_id = $1
            ORDER BY d.ocd_id
            "#,
        )
        .bind(profile.id)
        .fetch_all(&self.pool)
        .await?;

        let concepts = sqlx::query_as::<_, Concept>(
            r#"
            SELECT c.id::int8 AS id, v.prefix, c.code, c.label
            FROM users_profile_concepts_of_interest pc
            JOIN thesaurus_concept c ON c.id = pc.concept_id
            JOIN thesaurus_vocabulary v ON v.id = c.vocabulary_id
            WHERE pc.profile_id = $1
            ORDER BY v.prefix, c.code
            "#,
        )
        .bind(profile.id)
        .fetch_all(&self.pool)
        .await?;

        profile.concepts_of_interest = concepts.iter().map(Concept::reference).collect();
        Ok(())
    }
}

fn concept_columns(refs: &[ConceptRef]) -> (Vec<String>, Vec<String>) {
    refs.iter()
        .map(|r| (r.prefix.clone(), r.code.clone()))
        .unzip()
}

#[async_trait]
impl Store for Database {
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!("Database health check failed: {}", e))
            })?;
        Ok(())
    }

    // ==================== User Operations ====================

    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users_user WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users_user WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn user_ad_groups(&self, user_id: i64) -> Result<Vec<String>, AppError> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT g.display_name FROM users_user_ad_groups ug
            JOIN helusers_adgroup g ON g.id = ug.adgroup_id
            WHERE ug.user_id = $1
            ORDER BY g.display_name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    // ==================== Token Operations ====================

    async fn find_access_token(&self, token: &str) -> Result<Option<AccessToken>, AppError> {
        let access_token = sqlx::query_as::<_, AccessToken>(
            r#"
            SELECT id::int8 AS id, token, user_id::int8 AS user_id,
                   application_id::int8 AS application_id, expires, scope
            FROM oauth2_provider_accesstoken WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(access_token)
    }

    async fn find_oidc_token(&self, token: &str) -> Result<Option<AccessToken>, AppError> {
        let access_token = sqlx::query_as::<_, AccessToken>(
            r#"
            SELECT id::int8 AS id, access_token AS token, user_id::int8 AS user_id,
                   NULL::int8 AS application_id, expires_at AS expires, _scope AS scope
            FROM oidc_provider_token WHERE access_token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(access_token)
    }

    // ==================== Application Operations ====================

    async fn find_application_by_id(&self, id: i64) -> Result<Option<Application>, AppError> {
        sqlx::query_as::<_, Application>(&format!(
            "SELECT {} FROM users_application WHERE id = $1",
            APPLICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn find_application_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<Application>, AppError> {
        sqlx::query_as::<_, Application>(&format!(
            "SELECT {} FROM users_application WHERE client_id = $1",
            APPLICATION_COLUMNS
        ))
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn find_app_permission(
        &self,
        requester_id: i64,
        target_id: i64,
    ) -> Result<Option<AppToAppPermission>, AppError> {
        sqlx::query_as::<_, AppToAppPermission>(
            r#"
            SELECT id::int8 AS id, requester_id::int8 AS requester_id, target_id::int8 AS target_id
            FROM hkijwt_apptoapppermission WHERE requester_id = $1 AND target_id = $2
            "#,
        )
        .bind(requester_id)
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    // ==================== Login Method Operations ====================

    async fn list_login_methods(&self) -> Result<Vec<LoginMethod>, AppError> {
        sqlx::query_as::<_, LoginMethod>(&format!(
            r#"SELECT {} FROM users_loginmethod lm ORDER BY lm."order" NULLS LAST, lm.name"#,
            LOGIN_METHOD_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn application_login_methods(
        &self,
        application_id: i64,
    ) -> Result<Vec<LoginMethod>, AppError> {
        sqlx::query_as::<_, LoginMethod>(&format!(
            r#"
            SELECT {} FROM users_loginmethod lm
            JOIN users_application_login_methods alm ON alm.loginmethod_id = lm.id
            WHERE alm.application_id = $1
            ORDER BY lm."order" NULLS LAST, lm.name
            "#,
            LOGIN_METHOD_COLUMNS
        ))
        .bind(application_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    // ==================== Interest / Contact Operations ====================

    async fn find_user_ids_by_interest(
        &self,
        query: &InterestQuery,
    ) -> Result<Vec<Uuid>, AppError> {
        let (prefixes, codes) = query.concept_pairs();

        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT u.uuid FROM users_profile p
            JOIN users_user u ON u.id = p.user_id
            WHERE EXISTS (
                SELECT 1 FROM users_profile_divisions_of_interest pd
                JOIN munigeo_administrativedivision d ON d.id = pd.administrativedivision_id
                WHERE pd.profile_id = p.id AND d.ocd_id = ANY($1)
            )
            OR EXISTS (
                SELECT 1 FROM users_profile_concepts_of_interest pc
                JOIN thesaurus_concept c ON c.id = pc.concept_id
                JOIN thesaurus_vocabulary v ON v.id = c.vocabulary_id
                JOIN UNNEST($2::text[], $3::text[]) AS q(prefix, code)
                    ON q.prefix = v.prefix AND q.code = c.code
                WHERE pc.profile_id = p.id
            )
            ORDER BY u.uuid
            "#,
        )
        .bind(&query.divisions)
        .bind(&prefixes)
        .bind(&codes)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn find_contacts_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserContact>, AppError> {
        let rows = sqlx::query_as::<_, ContactRow>(
            r#"
            SELECT u.uuid, p.id::int8 AS profile_id, p.email, p.pushbullet_access_token,
                   p.firebase_token, p.phone, NULLIF(p.language, '') AS language,
                   NULLIF(p.contact_method, '') AS contact_method
            FROM users_user u
            LEFT JOIN users_profile p ON p.user_id = u.id
            WHERE u.uuid = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(UserContact::from).collect())
    }

    // ==================== Profile Operations ====================

    async fn find_profile(&self, user_id: i64) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {} FROM users_profile WHERE user_id = $1",
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match profile {
            Some(mut profile) => {
                self.load_interests(&mut profile).await?;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }

    async fn create_profile(&self, user_id: i64) -> Result<Profile, AppError> {
        sqlx::query_as::<_, Profile>(&format!(
            "INSERT INTO users_profile (user_id, language, contact_method) VALUES ($1, '', '') RETURNING {}",
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn save_profile(&self, profile: &Profile) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE users_profile
            SET email = $1, phone = $2, pushbullet_access_token = $3, firebase_token = $4,
                language = COALESCE($5, ''), contact_method = COALESCE($6, ''),
                preferences = $7
            WHERE id = $8
            "#,
        )
        .bind(&profile.email)
        .bind(&profile.phone)
        .bind(&profile.pushbullet_access_token)
        .bind(&profile.firebase_token)
        .bind(&profile.language)
        .bind(&profile.contact_method)
        .bind(&profile.preferences)
        .bind(profile.id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM users_profile_divisions_of_interest WHERE profile_id = $1")
            .bind(profile.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO users_profile_divisions_of_interest (profile_id, administrativedivision_id)
            SELECT $1, d.id FROM munigeo_administrativedivision d WHERE d.ocd_id = ANY($2)
            "#,
        )
        .bind(profile.id)
        .bind(&profile.divisions_of_interest)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM users_profile_concepts_of_interest WHERE profile_id = $1")
            .bind(profile.id)
            .execute(&mut *tx)
            .await?;

        let (prefixes, codes) = concept_columns(&profile.concepts_of_interest);
        sqlx::query(
            r#"
            INSERT INTO users_profile_concepts_of_interest (profile_id, concept_id)
            SELECT $1, c.id FROM thesaurus_concept c
            JOIN thesaurus_vocabulary v ON v.id = c.vocabulary_id
            JOIN UNNEST($2::text[], $3::text[]) AS q(prefix, code)
                ON q.prefix = v.prefix AND q.code = c.code
            "#,
        )
        .bind(profile.id)
        .bind(&prefixes)
        .bind(&codes)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    // ==================== Reference Data ====================

    async fn find_divisions(&self, ocd_ids: &[String]) -> Result<Vec<Division>, AppError> {
        sqlx::query_as::<_, Division>(
            "SELECT id::int8 AS id, ocd_id, name FROM munigeo_administrativedivision WHERE ocd_id = ANY($1)",
        )
        .bind(ocd_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    async fn find_concepts(&self, refs: &[ConceptRef]) -> Result<Vec<Concept>, AppError> {
        let (prefixes, codes) = concept_columns(refs);
        sqlx::query_as::<_, Concept>(
            r#"
            SELECT c.id::int8 AS id, v.prefix, c.code, c.label FROM thesaurus_concept c
            JOIN thesaurus_vocabulary v ON v.id = c.vocabulary_id
            JOIN UNNEST($1::text[], $2::text[]) AS q(prefix, code)
                ON q.prefix = v.prefix AND q.code = c.code
            "#,
        )
        .bind(&prefixes)
        .bind(&codes)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }
}
