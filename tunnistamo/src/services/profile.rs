//! Profile reads and updates, plus the bulk interest/contact lookups.

use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;
use validator::Validate;

use super::error::ServiceError;
use super::interest::InterestQuery;
use super::store::Store;
use crate::models::{ConceptRef, ContactInfo, Profile, ProfileUpdateRequest, User};

/// Whether an update replaces the whole profile or only the supplied fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Replace,
    Partial,
}

/// Load the user's profile, creating an empty one on first access.
pub async fn own_profile(store: &dyn Store, user: &User) -> Result<Profile, ServiceError> {
    if let Some(profile) = store.find_profile(user.id).await? {
        return Ok(profile);
    }

    tracing::info!(user = %user.uuid, "Creating profile on first access");
    Ok(store.create_profile(user.id).await?)
}

pub async fn update_profile(
    store: &dyn Store,
    user: &User,
    req: ProfileUpdateRequest,
    mode: UpdateMode,
) -> Result<Profile, ServiceError> {
    req.validate()
        .map_err(|e| ServiceError::Validation(e.to_string()))?;

    if mode == UpdateMode::Replace {
        let missing = req.missing_required_fields();
        if !missing.is_empty() {
            return Err(ServiceError::Validation(format!(
                "{}: This field is required.",
                missing.join(", ")
            )));
        }
    }

    let divisions = match &req.divisions_of_interest {
        Some(values) => Some(resolve_divisions(store, values).await?),
        None => None,
    };
    let concepts = match &req.concepts_of_interest {
        Some(values) => Some(resolve_concepts(store, values).await?),
        None => None,
    };

    let mut profile = own_profile(store, user).await?;

    match mode {
        UpdateMode::Replace => {
            profile.email = req.email;
            profile.phone = req.phone;
            profile.pushbullet_access_token = req.pushbullet_access_token;
            profile.firebase_token = req.firebase_token;
            profile.language = req.language.map(|l| l.as_str().to_string());
            profile.contact_method = req.contact_method.map(|c| c.as_str().to_string());
            profile.preferences = req.preferences;
        }
        UpdateMode::Partial => {
            if req.email.is_some() {
                profile.email = req.email;
            }
            if req.phone.is_some() {
                profile.phone = req.phone;
            }
            if req.pushbullet_access_token.is_some() {
                profile.pushbullet_access_token = req.pushbullet_access_token;
            }
            if req.firebase_token.is_some() {
                profile.firebase_token = req.firebase_token;
            }
            if let Some(language) = req.language {
                profile.language = Some(language.as_str().to_string());
            }
            if let Some(method) = req.contact_method {
                profile.contact_method = Some(method.as_str().to_string());
            }
            if req.preferences.is_some() {
                profile.preferences = req.preferences;
            }
        }
    }

    if let Some(divisions) = divisions {
        profile.divisions_of_interest = divisions;
    }
    if let Some(concepts) = concepts {
        profile.concepts_of_interest = concepts;
    }

    store.save_profile(&profile).await?;
    tracing::info!(user = %user.uuid, mode = ?mode, "Profile updated");
    Ok(profile)
}

async fn resolve_divisions(
    store: &dyn Store,
    values: &[String],
) -> Result<Vec<String>, ServiceError> {
    let found: HashSet<String> = store
        .find_divisions(values)
        .await?
        .into_iter()
        .map(|d| d.ocd_id)
        .collect();

    if let Some(missing) = values.iter().find(|v| !found.contains(*v)) {
        return Err(ServiceError::Validation(format!(
            "Invalid ocd_id \"{}\" - object does not exist.",
            missing
        )));
    }

    let mut divisions = values.to_vec();
    divisions.sort();
    divisions.dedup();
    Ok(divisions)
}

async fn resolve_concepts(
    store: &dyn Store,
    values: &[String],
) -> Result<Vec<ConceptRef>, ServiceError> {
    let refs = values
        .iter()
        .map(|v| {
            ConceptRef::parse(v).ok_or_else(|| {
                ServiceError::Validation(format!(
                    "Incorrect type. Expected concept string in format \"prefix:code\", received \"{}\".",
                    v
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let found: HashSet<ConceptRef> = store
        .find_concepts(&refs)
        .await?
        .iter()
        .map(|c| c.reference())
        .collect();

    if let Some(missing) = refs.iter().find(|r| !found.contains(*r)) {
        return Err(ServiceError::Validation(format!(
            "Invalid prefix and/or code in \"{}\" - object does not exist.",
            missing
        )));
    }

    let mut concepts = refs;
    concepts.sort();
    concepts.dedup();
    Ok(concepts)
}

/// Uuids of users interested in any of the given divisions or concepts.
pub async fn interested_users(
    store: &dyn Store,
    divisions: Vec<String>,
    concepts: Vec<String>,
) -> Result<Vec<Uuid>, ServiceError> {
    let query = InterestQuery::from_raw(divisions, concepts)?;
    let ids = store.find_user_ids_by_interest(&query).await?;
    tracing::debug!(
        divisions = query.divisions.len(),
        concept_prefixes = query.concepts.len(),
        matched = ids.len(),
        "Interest lookup"
    );
    Ok(ids)
}

/// Contact details keyed by user uuid. Unknown and unparsable ids are left
/// out; users without a profile get all-null fields.
pub async fn contact_info(
    store: &dyn Store,
    ids: Vec<String>,
) -> Result<BTreeMap<String, ContactInfo>, ServiceError> {
    let ids: Vec<String> = ids
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();

    if ids.is_empty() {
        return Err(ServiceError::NotFound("Not found.".to_string()));
    }

    let uuids: Vec<Uuid> = ids
        .iter()
        .filter_map(|id| match Uuid::parse_str(id) {
            Ok(uuid) => Some(uuid),
            Err(_) => {
                tracing::debug!(id = %id, "Skipping unparsable user id");
                None
            }
        })
        .collect();

    if uuids.is_empty() {
        return Ok(BTreeMap::new());
    }

    Ok(store
        .find_contacts_by_ids(&uuids)
        .await?
        .into_iter()
        .map(|c| (c.uuid.to_string(), c.profile.unwrap_or_default()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Concept, Division, Language};
    use crate::services::MemoryStore;

    fn seeded() -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = store.insert_user(User::new("jdoe", "jdoe@example.com")).unwrap();
        store
            .insert_division(Division::new("ocd-division/country:fi/kunta:helsinki", "Helsinki"))
            .unwrap();
        store.insert_concept(Concept::new("yso", "p1235")).unwrap();
        (store, user)
    }

    #[tokio::test]
    async fn test_own_profile_created_once() {
        let (store, user) = seeded();
        let first = own_profile(&store, &user).await.unwrap();
        let second = own_profile(&store, &user).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_unknown_division_is_rejected() {
        let (store, user) = seeded();
        let req = ProfileUpdateRequest {
            divisions_of_interest: Some(vec!["ocd-division/nowhere".to_string()]),
            ..Default::default()
        };

        let err = update_profile(&store, &user, req, UpdateMode::Partial)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid ocd_id \"ocd-division/nowhere\" - object does not exist."
        );
    }

    #[tokio::test]
    async fn test_unknown_concept_is_rejected() {
        let (store, user) = seeded();
        let req = ProfileUpdateRequest {
            concepts_of_interest: Some(vec!["yso:p9".to_string()]),
            ..Default::default()
        };

        let err = update_profile(&store, &user, req, UpdateMode::Partial)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid prefix and/or code in \"yso:p9\" - object does not exist."
        );
    }

    #[tokio::test]
    async fn test_replace_requires_choice_fields() {
        let (store, user) = seeded();
        let err = update_profile(&store, &user, ProfileUpdateRequest::default(), UpdateMode::Replace)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let (store, user) = seeded();
        let req = ProfileUpdateRequest {
            phone: Some("+358401234567".to_string()),
            concepts_of_interest: Some(vec!["yso:p1235".to_string()]),
            ..Default::default()
        };
        update_profile(&store, &user, req, UpdateMode::Partial)
            .await
            .unwrap();

        let req = ProfileUpdateRequest {
            language: Some(Language::Sv),
            ..Default::default()
        };
        let profile = update_profile(&store, &user, req, UpdateMode::Partial)
            .await
            .unwrap();

        assert_eq!(profile.phone.as_deref(), Some("+358401234567"));
        assert_eq!(profile.language.as_deref(), Some("sv"));
        assert_eq!(profile.concepts_of_interest, vec![ConceptRef::new("yso", "p1235")]);
    }

    #[tokio::test]
    async fn test_contact_info_requires_ids() {
        let (store, _) = seeded();
        let err = contact_info(&store, vec![" ".to_string()]).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_contact_info_skips_unknown_ids() {
        let (store, user) = seeded();
        let result = contact_info(
            &store,
            vec![
                user.uuid.to_string(),
                "not-a-uuid".to_string(),
                Uuid::new_v4().to_string(),
            ],
        )
        .await
        .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[&user.uuid.to_string()], ContactInfo::default());
    }
}
