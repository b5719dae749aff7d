//! Wire model of the catalog REST API
//!
//! Request types omit absent fields entirely. Response types accept both a
//! missing key and an explicit `null` for every field, falling back to the
//! empty value.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Weakly-typed mapping sent to and received from the catalog
pub type Dictionary = serde_json::Map<String, Value>;

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssetCreateRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub asset_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Services the asset belongs to
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Dictionary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_links: Option<Vec<ExternalLink>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<AssetSource>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environments: Option<BTreeMap<String, AssetEnvironment>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssetUpdateRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub asset_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Dictionary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_links: Option<Vec<ExternalLink>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<AssetSource>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environments: Option<BTreeMap<String, AssetEnvironment>>,
}

/// Asset as returned by the catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Asset {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub asset_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub user_description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub providers: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    pub metadata: Value,
    #[serde(deserialize_with = "null_as_default")]
    pub schema: BTreeMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    pub external_links: Vec<ExternalLink>,
    #[serde(deserialize_with = "null_as_default")]
    pub sources: Vec<AssetSource>,
    #[serde(deserialize_with = "null_as_default")]
    pub environments: BTreeMap<String, AssetEnvironment>,
    #[serde(deserialize_with = "null_as_default")]
    pub mrn: String,
    #[serde(deserialize_with = "null_as_default")]
    pub parent_mrn: String,
    #[serde(deserialize_with = "null_as_default")]
    pub query: String,
    #[serde(deserialize_with = "null_as_default")]
    pub query_language: String,
    #[serde(deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(deserialize_with = "null_as_default")]
    pub created_by: String,
    #[serde(deserialize_with = "null_as_default")]
    pub updated_at: String,
    #[serde(deserialize_with = "null_as_default")]
    pub last_sync_at: String,
    #[serde(deserialize_with = "null_as_default")]
    pub has_run_history: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub is_stub: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalLink {
    #[serde(deserialize_with = "null_as_default")]
    pub icon: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSource {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub priority: i64,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub properties: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetEnvironment {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

// ---------------------------------------------------------------------------
// Glossary
// ---------------------------------------------------------------------------

/// Body of both create and update glossary term requests
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlossaryTermRequest {
    pub name: String,
    pub definition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_term_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owners: Option<Vec<Owner>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Dictionary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlossaryTerm {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub definition: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub parent_term_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub owners: Vec<Owner>,
    pub metadata: Value,
    #[serde(deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(deserialize_with = "null_as_default")]
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Owner {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub owner_type: String,
}

// ---------------------------------------------------------------------------
// Lineage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LineageEdgeRequest {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineageEdge {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(deserialize_with = "null_as_default")]
    pub target: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub edge_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn asset_response_tolerates_nulls_and_missing_fields() {
        let asset: Asset = serde_json::from_value(json!({
            "id": "a-1",
            "name": "orders",
            "type": "Topic",
            "description": null,
            "providers": null,
            "schema": null,
            "has_run_history": true,
        }))
        .unwrap();

        assert_eq!(asset.id, "a-1");
        assert_eq!(asset.asset_type, "Topic");
        assert_eq!(asset.description, "");
        assert!(asset.providers.is_empty());
        assert!(asset.schema.is_empty());
        assert!(asset.metadata.is_null());
        assert!(asset.has_run_history);
        assert!(!asset.is_stub);
    }

    #[test]
    fn create_request_omits_absent_fields() {
        let request = AssetCreateRequest {
            name: "orders".to_string(),
            asset_type: "Topic".to_string(),
            providers: vec!["kafka".to_string()],
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"name": "orders", "type": "Topic", "providers": ["kafka"]})
        );
    }

    #[test]
    fn source_without_properties_omits_key() {
        let source = AssetSource {
            name: "ingest".to_string(),
            priority: 0,
            properties: Value::Null,
        };
        assert_eq!(
            serde_json::to_value(&source).unwrap(),
            json!({"name": "ingest", "priority": 0})
        );
    }

    #[test]
    fn glossary_request_sends_description_only_when_set() {
        let request = GlossaryTermRequest {
            name: "Revenue".to_string(),
            definition: "Money in".to_string(),
            description: None,
            parent_term_id: Some("t-0".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"name": "Revenue", "definition": "Money in", "parent_term_id": "t-0"})
        );
    }
}
