//! File-backed source-item resolver.
//!
//! The real source library lives outside this service; deployments point
//! `SOURCE_ITEMS_PATH` at a JSON map of item keys to bindings. Tenant-aware
//! resolvers can replace this by implementing [`SourceItemResolver`].

use std::collections::HashMap;

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use resource_pool::error::Result;
use resource_pool::{ItemBinding, SourceItemResolver};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
struct BindingSpec {
    site_entries: Vec<String>,
    #[serde(default)]
    expected_entry_type: Option<resource_pool::EntryType>,
}

/// Resolves item keys from a JSON file loaded at startup.
///
/// Keys are looked up as `{tenant}:{item_key}` first, then bare
/// `{item_key}`, so a tenant can shadow a shared binding.
pub struct FileItemResolver {
    bindings: HashMap<String, BindingSpec>,
}

impl FileItemResolver {
    pub fn load(path: &str) -> AnyResult<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read source items file: {path}"))?;
        let bindings: HashMap<String, BindingSpec> =
            serde_json::from_str(&raw).context("failed to parse source items file")?;
        Ok(Self { bindings })
    }

    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }
}

#[async_trait]
impl SourceItemResolver for FileItemResolver {
    async fn resolve(&self, item_key: &str, tenant: Option<&str>) -> Result<Option<ItemBinding>> {
        let spec = tenant
            .and_then(|t| self.bindings.get(&format!("{t}:{item_key}")))
            .or_else(|| self.bindings.get(item_key));

        Ok(spec.map(|spec| ItemBinding {
            site_entries: spec.site_entries.clone(),
            expected_entry_type: spec.expected_entry_type,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tenant_key_shadows_shared_key() {
        let raw = r#"{
            "news": { "site_entries": ["https://example.com/feed"] },
            "acme:news": { "site_entries": ["https://acme.example.com/feed"], "expected_entry_type": "rss" }
        }"#;
        let resolver = FileItemResolver {
            bindings: serde_json::from_str(raw).unwrap(),
        };

        let shared = resolver.resolve("news", None).await.unwrap().unwrap();
        assert_eq!(shared.site_entries, vec!["https://example.com/feed"]);

        let scoped = resolver.resolve("news", Some("acme")).await.unwrap().unwrap();
        assert_eq!(scoped.site_entries, vec!["https://acme.example.com/feed"]);
        assert_eq!(
            scoped.expected_entry_type,
            Some(resource_pool::EntryType::Rss)
        );

        assert!(resolver.resolve("gone", None).await.unwrap().is_none());
    }
}
