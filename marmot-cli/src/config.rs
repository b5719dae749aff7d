//! Configuration file loading
//!
//! `marmot.json` declares the provider settings and the resources to manage:
//!
//! ```json
//! {
//!   "provider": { "host": "catalog.example.com", "api_key": "..." },
//!   "resources": [
//!     { "type": "marmot_asset", "name": "orders", "attributes": { ... } }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use marmot_core::resource::{Attributes, Resource};
use marmot_provider::ProviderConfig;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

/// A single declared resource
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceConfig {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub attributes: Attributes,
}

impl ConfigFile {
    pub fn parse(content: &str) -> Result<Self, String> {
        serde_json::from_str(content).map_err(|e| format!("Failed to parse configuration: {}", e))
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::parse(&content)
    }

    /// Declared resources in declaration order
    ///
    /// Fails on an empty name or a name declared twice for the same type.
    pub fn resources(&self) -> Result<Vec<Resource>, String> {
        let mut seen = HashSet::new();
        let mut resources = Vec::with_capacity(self.resources.len());

        for declared in &self.resources {
            if declared.name.is_empty() {
                return Err(format!(
                    "Resource of type {} has an empty name",
                    declared.resource_type
                ));
            }
            let mut resource = Resource::new(&declared.resource_type, &declared.name);
            if !seen.insert(resource.id.clone()) {
                return Err(format!("Duplicate resource: {}", resource.id));
            }
            resource.attributes = declared.attributes.clone();
            resources.push(resource);
        }

        Ok(resources)
    }

    /// Provider settings with unset values taken from the environment
    pub fn provider_config(&self) -> ProviderConfig {
        self.provider
            .clone()
            .with_env_fallback(|key| std::env::var(key).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_full_configuration() {
        let config = ConfigFile::parse(
            r#"{
                "provider": { "host": "catalog.example.com", "api_key": "k", "timeout_secs": 5 },
                "resources": [
                    { "type": "marmot_asset", "name": "orders",
                      "attributes": { "name": "orders", "type": "Topic", "services": ["Kafka"] } },
                    { "type": "marmot_glossary_term", "name": "revenue",
                      "attributes": { "name": "Revenue", "definition": "Money in" } }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.provider.host.as_deref(), Some("catalog.example.com"));
        assert_eq!(config.provider.timeout_secs, Some(5));

        let resources = config.resources().unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].id.to_string(), "marmot_asset.orders");
        assert_eq!(resources[0].attributes["services"], json!(["Kafka"]));
        assert_eq!(resources[1].id.resource_type, "marmot_glossary_term");
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let config = ConfigFile::parse("{}").unwrap();
        assert!(config.provider.host.is_none());
        assert!(config.resources().unwrap().is_empty());
    }

    #[test]
    fn duplicate_resources_are_rejected() {
        let config = ConfigFile::parse(
            r#"{ "resources": [
                { "type": "marmot_asset", "name": "orders" },
                { "type": "marmot_asset", "name": "orders" }
            ] }"#,
        )
        .unwrap();

        assert_eq!(
            config.resources().unwrap_err(),
            "Duplicate resource: marmot_asset.orders"
        );
    }

    #[test]
    fn same_name_with_different_types_is_allowed() {
        let config = ConfigFile::parse(
            r#"{ "resources": [
                { "type": "marmot_asset", "name": "orders" },
                { "type": "marmot_lineage", "name": "orders" }
            ] }"#,
        )
        .unwrap();

        assert_eq!(config.resources().unwrap().len(), 2);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = ConfigFile::parse(r#"{ "resource": [] }"#).unwrap_err();
        assert!(err.starts_with("Failed to parse configuration"));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigFile::load(&dir.path().join("marmot.json")).unwrap_err();
        assert!(err.starts_with("Failed to read"));
    }
}
