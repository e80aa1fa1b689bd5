//! Reference data users can subscribe to: administrative divisions and
//! thesaurus concepts.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Administrative division identified by its OCD id.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Division {
    pub id: i64,
    pub ocd_id: String,
    pub name: String,
}

impl Division {
    pub fn new(ocd_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: 0,
            ocd_id: ocd_id.into(),
            name: name.into(),
        }
    }
}

/// Thesaurus concept, addressed by vocabulary prefix and code.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Concept {
    pub id: i64,
    pub prefix: String,
    pub code: String,
    pub label: Option<String>,
}

impl Concept {
    pub fn new(prefix: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: 0,
            prefix: prefix.into(),
            code: code.into(),
            label: None,
        }
    }

    pub fn reference(&self) -> ConceptRef {
        ConceptRef {
            prefix: self.prefix.clone(),
            code: self.code.clone(),
        }
    }
}

/// `prefix:code` form of a concept, e.g. `yso:p1235`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConceptRef {
    pub prefix: String,
    pub code: String,
}

impl ConceptRef {
    pub fn new(prefix: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            code: code.into(),
        }
    }

    /// Split on `:` into exactly two parts.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split(':');
        let prefix = parts.next()?;
        let code = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(prefix, code))
    }
}

impl fmt::Display for ConceptRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.prefix, self.code)
    }
}

impl TryFrom<String> for ConceptRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ConceptRef::parse(&value).ok_or_else(|| {
            format!(
                "Incorrect type. Expected concept string in format \"prefix:code\", received \"{}\".",
                value
            )
        })
    }
}

impl From<ConceptRef> for String {
    fn from(value: ConceptRef) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_requires_single_separator() {
        assert_eq!(
            ConceptRef::parse("yso:p1235"),
            Some(ConceptRef::new("yso", "p1235"))
        );
        assert_eq!(ConceptRef::parse("yso"), None);
        assert_eq!(ConceptRef::parse("a:b:c"), None);
    }

    #[test]
    fn test_serde_uses_string_form() {
        let value: ConceptRef = serde_json::from_str("\"yso:p1\"").unwrap();
        assert_eq!(value, ConceptRef::new("yso", "p1"));
        assert_eq!(serde_json::to_string(&value).unwrap(), "\"yso:p1\"");
        assert!(serde_json::from_str::<ConceptRef>("\"nocolon\"").is_err());
    }
}
