//! User profile - contact details and subscribed interests.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::interest::ConceptRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Fi,
    En,
    Sv,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Fi => "fi",
            Language::En => "en",
            Language::Sv => "sv",
        }
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fi" => Ok(Language::Fi),
            "en" => Ok(Language::En),
            "sv" => Ok(Language::Sv),
            _ => Err(format!("\"{}\" is not a valid choice.", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContactMethod {
    Email,
    Pushbullet,
    Sms,
}

impl ContactMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactMethod::Email => "email",
            ContactMethod::Pushbullet => "pushbullet",
            ContactMethod::Sms => "sms",
        }
    }
}

impl std::str::FromStr for ContactMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(ContactMethod::Email),
            "pushbullet" => Ok(ContactMethod::Pushbullet),
            "sms" => Ok(ContactMethod::Sms),
            _ => Err(format!("\"{}\" is not a valid choice.", s)),
        }
    }
}

/// Profile row. Interest sets live in join tables and are loaded separately.
#[derive(Debug, Clone, Default, FromRow)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub pushbullet_access_token: Option<String>,
    pub firebase_token: Option<String>,
    pub language: Option<String>,
    pub contact_method: Option<String>,
    pub preferences: Option<serde_json::Value>,
    #[sqlx(skip)]
    pub divisions_of_interest: Vec<String>,
    #[sqlx(skip)]
    pub concepts_of_interest: Vec<ConceptRef>,
}

impl Profile {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }

    pub fn contact_info(&self) -> ContactInfo {
        ContactInfo {
            email: self.email.clone(),
            pushbullet: self.pushbullet_access_token.clone(),
            firebase: self.firebase_token.clone(),
            phone: self.phone.clone(),
            language: self.language.clone(),
            contact_method: self.contact_method.clone(),
        }
    }
}

/// Contact fields handed to notification senders. Every field is null for
/// users that never created a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub pushbullet: Option<String>,
    pub firebase: Option<String>,
    pub phone: Option<String>,
    pub language: Option<String>,
    pub contact_method: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ProfileResponse {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub pushbullet_access_token: Option<String>,
    pub firebase_token: Option<String>,
    pub language: Option<String>,
    pub contact_method: Option<String>,
    pub divisions_of_interest: Vec<String>,
    #[schema(value_type = Vec<String>)]
    pub concepts_of_interest: Vec<ConceptRef>,
    #[schema(value_type = Option<Object>)]
    pub preferences: Option<serde_json::Value>,
}

impl From<&Profile> for ProfileResponse {
    fn from(profile: &Profile) -> Self {
        let mut divisions = profile.divisions_of_interest.clone();
        divisions.sort();
        let mut concepts = profile.concepts_of_interest.clone();
        concepts.sort();

        Self {
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            pushbullet_access_token: profile.pushbullet_access_token.clone(),
            firebase_token: profile.firebase_token.clone(),
            language: profile.language.clone(),
            contact_method: profile.contact_method.clone(),
            divisions_of_interest: divisions,
            concepts_of_interest: concepts,
            preferences: profile.preferences.clone(),
        }
    }
}

/// Body of `PUT` and `PATCH /v1/profile/`.
///
/// Concepts stay as raw strings so each malformed entry can be reported
/// back verbatim.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct ProfileUpdateRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    #[validate(length(max = 255))]
    pub phone: Option<String>,
    #[validate(length(max = 255))]
    pub pushbullet_access_token: Option<String>,
    #[validate(length(max = 255))]
    pub firebase_token: Option<String>,
    pub language: Option<Language>,
    pub contact_method: Option<ContactMethod>,
    pub divisions_of_interest: Option<Vec<String>>,
    pub concepts_of_interest: Option<Vec<String>>,
    #[schema(value_type = Option<Object>)]
    pub preferences: Option<serde_json::Value>,
}

impl ProfileUpdateRequest {
    /// Fields a full replacement must carry.
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.language.is_none() {
            missing.push("language");
        }
        if self.contact_method.is_none() {
            missing.push("contact_method");
        }
        if self.divisions_of_interest.is_none() {
            missing.push("divisions_of_interest");
        }
        if self.concepts_of_interest.is_none() {
            missing.push("concepts_of_interest");
        }
        missing
    }
}
