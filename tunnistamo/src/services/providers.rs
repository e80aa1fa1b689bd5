use std::collections::HashMap;

/// A configured social auth backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub id: String,
    /// URL that starts this provider's login flow.
    pub login_url: String,
}

/// Provider id -> descriptor, filled once at start-up.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, ProviderDescriptor>,
}

impl ProviderRegistry {
    /// Parse `id` or `id=login_url` entries separated by commas. Entries
    /// without a URL get `/accounts/<id>/login/`.
    pub fn from_spec(spec: &str) -> Self {
        let providers = spec
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| match entry.split_once('=') {
                Some((id, url)) => ProviderDescriptor {
                    id: id.trim().to_string(),
                    login_url: url.trim().to_string(),
                },
                None => ProviderDescriptor {
                    id: entry.to_string(),
                    login_url: format!("/accounts/{}/login/", entry),
                },
            })
            .map(|p| (p.id.clone(), p))
            .collect();

        Self { providers }
    }

    pub fn get(&self, provider_id: &str) -> Option<&ProviderDescriptor> {
        self.providers.get(provider_id)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
