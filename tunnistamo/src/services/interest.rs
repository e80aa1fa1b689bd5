//! Interest lookup: which users subscribed to a division or a concept.

use std::collections::BTreeMap;
use url::Url;

use super::error::ServiceError;
use crate::models::{ConceptRef, Profile};

/// Normalized interest filter.
///
/// A profile matches when it has any of `divisions` or any `(prefix, code)`
/// pair in `concepts`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterestQuery {
    pub divisions: Vec<String>,
    /// Codes grouped by vocabulary prefix.
    pub concepts: BTreeMap<String, Vec<String>>,
}

impl InterestQuery {
    /// Build a query from raw request values.
    ///
    /// Fails with not-found only when both lists are empty. Concept values
    /// that do not reduce to `prefix:code` are dropped silently, so such a
    /// query can still match nobody.
    pub fn from_raw<D, C>(divisions: D, concepts: C) -> Result<Self, ServiceError>
    where
        D: IntoIterator<Item = String>,
        C: IntoIterator<Item = String>,
    {
        let divisions: Vec<String> = non_empty(divisions);
        let raw_concepts: Vec<String> = non_empty(concepts);

        if divisions.is_empty() && raw_concepts.is_empty() {
            return Err(ServiceError::NotFound("Not found.".to_string()));
        }

        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for raw in &raw_concepts {
            match ConceptRef::parse(&concept_key(raw)) {
                Some(concept) => grouped.entry(concept.prefix).or_default().push(concept.code),
                None => tracing::debug!(value = %raw, "Skipping malformed concept"),
            }
        }

        Ok(Self {
            divisions,
            concepts: grouped,
        })
    }

    /// Flattened `(prefixes, codes)` columns, suitable for `UNNEST`.
    pub fn concept_pairs(&self) -> (Vec<String>, Vec<String>) {
        self.concepts
            .iter()
            .flat_map(|(prefix, codes)| codes.iter().map(move |code| (prefix.clone(), code.clone())))
            .unzip()
    }

    pub fn matches(&self, profile: &Profile) -> bool {
        let division_hit = profile
            .divisions_of_interest
            .iter()
            .any(|d| self.divisions.contains(d));

        let concept_hit = profile.concepts_of_interest.iter().any(|c| {
            self.concepts
                .get(&c.prefix)
                .is_some_and(|codes| codes.contains(&c.code))
        });

        division_hit || concept_hit
    }
}

/// Reduce a concept reference to its last path segment.
///
/// `https://api.hel.fi/linkedevents/v1/keyword/yso:p1235/?format=json`
/// becomes `yso:p1235`; a bare `yso:p1235` is returned unchanged.
pub fn concept_key(raw: &str) -> String {
    let path = match Url::parse(raw) {
        Ok(url) if url.has_host() => url.path().to_string(),
        _ => strip_query(raw).to_string(),
    };

    path.trim_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn strip_query(raw: &str) -> &str {
    raw.split(['?', '#']).next().unwrap_or_default()
}

/// Split a comma separated query value, trimming blanks away.
pub fn split_csv(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
        .unwrap_or_default()
}

fn non_empty<I: IntoIterator<Item = String>>(values: I) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concept_key_from_url() {
        assert_eq!(
            concept_key("https://api.hel.fi/linkedevents/v1/keyword/yso:p1235/?format=json"),
            "yso:p1235"
        );
        assert_eq!(concept_key("yso:p1235"), "yso:p1235");
        assert_eq!(concept_key("/keyword/yso:p1/"), "yso:p1");
        assert_eq!(concept_key("yso:p9?x=1"), "yso:p9");
    }

    #[test]
    fn test_empty_query_is_not_found() {
        let result = InterestQuery::from_raw(vec![" ".to_string()], Vec::new());
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn test_malformed_concepts_are_skipped() {
        let query = InterestQuery::from_raw(
            Vec::new(),
            vec!["garbage".to_string(), "yso:p1".to_string(), "yso:p2".to_string()],
        )
        .unwrap();

        assert!(query.divisions.is_empty());
        assert_eq!(
            query.concepts.get("yso"),
            Some(&vec!["p1".to_string(), "p2".to_string()])
        );
        assert_eq!(
            query.concept_pairs(),
            (
                vec!["yso".to_string(), "yso".to_string()],
                vec!["p1".to_string(), "p2".to_string()]
            )
        );
    }

    #[test]
    fn test_only_malformed_concepts_yields_empty_query() {
        let query = InterestQuery::from_raw(Vec::new(), vec!["garbage".to_string()]).unwrap();
        assert!(query.concepts.is_empty());
        assert!(!query.matches(&Profile::new(1)));
    }

    #[test]
    fn test_matches_division_or_concept() {
        let query = InterestQuery::from_raw(
            vec!["ocd-division/country:fi/kunta:helsinki".to_string()],
            vec!["yso:p1".to_string()],
        )
        .unwrap();

        let mut by_division = Profile::new(1);
        by_division
            .divisions_of_interest
            .push("ocd-division/country:fi/kunta:helsinki".to_string());
        assert!(query.matches(&by_division));

        let mut by_concept = Profile::new(2);
        by_concept.concepts_of_interest.push(ConceptRef::new("yso", "p1"));
        assert!(query.matches(&by_concept));

        let mut other_vocabulary = Profile::new(3);
        other_vocabulary
            .concepts_of_interest
            .push(ConceptRef::new("hel", "p1"));
        assert!(!query.matches(&other_vocabulary));
    }

    #[test]
    fn test_split_csv() {
        assert_eq!(split_csv(Some("a, b,")), vec!["a", "b", ""]);
        assert!(split_csv(None).is_empty());
    }
}
