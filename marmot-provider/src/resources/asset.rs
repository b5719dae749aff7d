//! marmot_asset - Data assets in the catalog

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use marmot_core::attr::{Attr, StringMap, StringSet};
use marmot_core::provider::{ProviderError, ProviderResult};
use marmot_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{ResourceHandler, stored_identifier};
use crate::client::CatalogApi;
use crate::client::models::{
    Asset, AssetCreateRequest, AssetEnvironment, AssetSource, AssetUpdateRequest, ExternalLink,
};
use crate::convert::{
    dictionary_to_strings, map_to_dictionary, map_to_string_map, normalize_timestamp,
    optional_string, require, require_set, sorted_strings, strings_to_map, strings_to_map_or_null,
    strings_to_set,
};

pub const ASSET: &str = "marmot_asset";

/// Declarative model of an asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetModel {
    pub name: Attr<String>,
    #[serde(rename = "type")]
    pub asset_type: Attr<String>,
    pub description: Attr<String>,
    pub user_description: Attr<String>,
    pub services: Attr<StringSet>,
    pub tags: Attr<StringSet>,
    pub metadata: Attr<StringMap>,
    pub schema: Attr<StringMap>,
    pub external_links: Attr<Vec<ExternalLinkModel>>,
    pub sources: Attr<Vec<AssetSourceModel>>,
    pub environments: Attr<BTreeMap<String, AssetEnvironmentModel>>,

    // Computed
    pub id: Attr<String>,
    pub created_at: Attr<String>,
    pub created_by: Attr<String>,
    pub updated_at: Attr<String>,
    pub last_sync_at: Attr<String>,
    pub mrn: Attr<String>,
    pub parent_mrn: Attr<String>,
    pub query: Attr<String>,
    pub query_language: Attr<String>,
    pub has_run_history: Attr<bool>,
    pub is_stub: Attr<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalLinkModel {
    pub icon: Attr<String>,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSourceModel {
    pub name: String,
    pub priority: Attr<i64>,
    pub properties: Attr<StringMap>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetEnvironmentModel {
    pub name: String,
    pub path: String,
    pub metadata: Attr<StringMap>,
}

pub fn asset_schema() -> ResourceSchema {
    let computed = |name: &str| AttributeSchema::new(name, AttributeType::String).computed();

    ResourceSchema::new(ASSET)
        .with_description("Data asset (topic, table, bucket, service) in the Marmot catalog")
        .attribute(
            AttributeSchema::new("name", AttributeType::length_between(1, 255))
                .required()
                .with_description("Name of the asset"),
        )
        .attribute(
            AttributeSchema::new("type", AttributeType::length_between(1, 100))
                .required()
                .with_description("Type of the asset, e.g. Topic or Table"),
        )
        .attribute(AttributeSchema::new(
            "description",
            AttributeType::length_at_most(1000),
        ))
        .attribute(
            AttributeSchema::new("user_description", AttributeType::length_at_most(2000))
                .with_description("User-provided description, sent on update"),
        )
        .attribute(
            AttributeSchema::new(
                "services",
                AttributeType::set_of(AttributeType::length_between(1, 100)),
            )
            .required()
            .with_min_items(1)
            .with_description("Services the asset belongs to"),
        )
        .attribute(AttributeSchema::new(
            "tags",
            AttributeType::set_of(AttributeType::length_between(1, 100)),
        ))
        .attribute(AttributeSchema::new(
            "metadata",
            AttributeType::map_of(AttributeType::String),
        ))
        .attribute(AttributeSchema::new(
            "schema",
            AttributeType::map_of(AttributeType::String),
        ))
        .attribute(AttributeSchema::new(
            "external_links",
            AttributeType::list_of(AttributeType::Object(vec![
                AttributeSchema::new("icon", AttributeType::String),
                AttributeSchema::new("name", AttributeType::length_between(1, 255)).required(),
                AttributeSchema::new("url", AttributeType::length_between(1, 2048)).required(),
            ])),
        ))
        .attribute(AttributeSchema::new(
            "sources",
            AttributeType::list_of(AttributeType::Object(vec![
                AttributeSchema::new("name", AttributeType::length_between(1, 255)).required(),
                AttributeSchema::new("priority", AttributeType::Int).with_default(json!(0)),
                AttributeSchema::new("properties", AttributeType::map_of(AttributeType::String)),
            ])),
        ))
        .attribute(AttributeSchema::new(
            "environments",
            AttributeType::map_of(AttributeType::Object(vec![
                AttributeSchema::new("name", AttributeType::length_between(1, 255)).required(),
                AttributeSchema::new("path", AttributeType::length_between(1, 500)).required(),
                AttributeSchema::new("metadata", AttributeType::map_of(AttributeType::String)),
            ])),
        ))
        .attribute(computed("id"))
        .attribute(computed("created_at"))
        .attribute(computed("created_by"))
        .attribute(computed("updated_at"))
        .attribute(computed("last_sync_at"))
        .attribute(computed("mrn").with_description("Marmot Resource Name"))
        .attribute(computed("parent_mrn"))
        .attribute(computed("query"))
        .attribute(computed("query_language"))
        .attribute(AttributeSchema::new("has_run_history", AttributeType::Bool).computed())
        .attribute(AttributeSchema::new("is_stub", AttributeType::Bool).computed())
}

fn external_links_to_wire(links: &Attr<Vec<ExternalLinkModel>>) -> Option<Vec<ExternalLink>> {
    let links = links.as_value().filter(|l| !l.is_empty())?;
    Some(
        links
            .iter()
            .map(|link| ExternalLink {
                icon: link.icon.as_str().unwrap_or_default().to_string(),
                name: link.name.clone(),
                url: link.url.clone(),
            })
            .collect(),
    )
}

fn sources_to_wire(sources: &Attr<Vec<AssetSourceModel>>) -> Option<Vec<AssetSource>> {
    let sources = sources.as_value().filter(|s| !s.is_empty())?;
    Some(
        sources
            .iter()
            .map(|source| AssetSource {
                name: source.name.clone(),
                priority: source.priority.as_value().copied().unwrap_or(0),
                properties: map_to_dictionary(&source.properties)
                    .map(Value::Object)
                    .unwrap_or(Value::Null),
            })
            .collect(),
    )
}

fn environments_to_wire(
    environments: &Attr<BTreeMap<String, AssetEnvironmentModel>>,
) -> Option<BTreeMap<String, AssetEnvironment>> {
    let environments = environments.as_value().filter(|e| !e.is_empty())?;
    Some(
        environments
            .iter()
            .map(|(key, env)| {
                let env = AssetEnvironment {
                    name: env.name.clone(),
                    path: env.path.clone(),
                    metadata: map_to_dictionary(&env.metadata)
                        .map(Value::Object)
                        .unwrap_or(Value::Null),
                };
                (key.clone(), env)
            })
            .collect(),
    )
}

/// Build the create request for a planned asset
pub fn to_create_request(model: &AssetModel) -> ProviderResult<AssetCreateRequest> {
    Ok(AssetCreateRequest {
        name: require(&model.name, "name")?.to_string(),
        asset_type: require(&model.asset_type, "type")?.to_string(),
        description: optional_string(&model.description),
        providers: require_set(&model.services, "services")?,
        tags: sorted_strings(&model.tags),
        metadata: map_to_dictionary(&model.metadata),
        schema: map_to_string_map(&model.schema),
        external_links: external_links_to_wire(&model.external_links),
        sources: sources_to_wire(&model.sources),
        environments: environments_to_wire(&model.environments),
    })
}

/// Build the update request for a planned asset
pub fn to_update_request(model: &AssetModel) -> ProviderResult<AssetUpdateRequest> {
    let request = to_create_request(model)?;
    Ok(AssetUpdateRequest {
        name: request.name,
        asset_type: request.asset_type,
        description: request.description,
        user_description: model.user_description.as_str().unwrap_or_default().to_string(),
        providers: request.providers,
        tags: request.tags,
        metadata: request.metadata,
        schema: request.schema,
        external_links: request.external_links,
        sources: request.sources,
        environments: request.environments,
    })
}

/// Overwrite every attribute of `model` from a catalog response
pub fn apply_response(model: &mut AssetModel, asset: &Asset) -> ProviderResult<()> {
    model.id = Attr::Value(asset.id.clone());
    model.name = Attr::Value(asset.name.clone());
    model.asset_type = Attr::Value(asset.asset_type.clone());
    model.description = Attr::from_non_empty(asset.description.as_str());
    model.user_description = Attr::from_non_empty(asset.user_description.as_str());

    model.services = strings_to_set(&asset.providers);
    model.tags = strings_to_set(&asset.tags);
    model.metadata = strings_to_map(dictionary_to_strings(&asset.metadata)?);
    model.schema = strings_to_map(asset.schema.clone());

    model.external_links = if asset.external_links.is_empty() {
        Attr::Null
    } else {
        Attr::Value(
            asset
                .external_links
                .iter()
                .map(|link| ExternalLinkModel {
                    icon: Attr::from_non_empty(link.icon.as_str()),
                    name: link.name.clone(),
                    url: link.url.clone(),
                })
                .collect(),
        )
    };

    model.sources = if asset.sources.is_empty() {
        Attr::Null
    } else {
        let mut sources = Vec::with_capacity(asset.sources.len());
        for source in &asset.sources {
            sources.push(AssetSourceModel {
                name: source.name.clone(),
                priority: Attr::Value(source.priority),
                properties: strings_to_map_or_null(dictionary_to_strings(&source.properties)?),
            });
        }
        Attr::Value(sources)
    };

    let mut environments = BTreeMap::new();
    for (key, env) in &asset.environments {
        environments.insert(
            key.clone(),
            AssetEnvironmentModel {
                name: env.name.clone(),
                path: env.path.clone(),
                metadata: strings_to_map_or_null(dictionary_to_strings(&env.metadata)?),
            },
        );
    }
    model.environments = Attr::Value(environments);

    model.mrn = Attr::Value(asset.mrn.clone());
    model.parent_mrn = Attr::from_non_empty(asset.parent_mrn.as_str());
    model.query = Attr::from_non_empty(asset.query.as_str());
    model.query_language = Attr::from_non_empty(asset.query_language.as_str());
    model.created_by = Attr::Value(asset.created_by.clone());
    model.created_at = Attr::Value(normalize_timestamp(&asset.created_at));
    model.updated_at = Attr::Value(normalize_timestamp(&asset.updated_at));
    model.last_sync_at = Attr::from_non_empty(normalize_timestamp(&asset.last_sync_at));
    model.has_run_history = Attr::Value(asset.has_run_history);
    model.is_stub = Attr::Value(asset.is_stub);

    Ok(())
}

/// Orchestrator for `marmot_asset`
pub struct AssetResource {
    client: Arc<dyn CatalogApi>,
}

impl AssetResource {
    pub fn new(client: Arc<dyn CatalogApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceHandler for AssetResource {
    type Model = AssetModel;

    fn type_name(&self) -> &'static str {
        ASSET
    }

    fn schema(&self) -> ResourceSchema {
        asset_schema()
    }

    fn identifier(model: &AssetModel) -> Option<&str> {
        model.id.as_str().filter(|id| !id.is_empty())
    }

    fn from_identifier(identifier: &str) -> AssetModel {
        AssetModel {
            id: Attr::Value(identifier.to_string()),
            ..Default::default()
        }
    }

    async fn create(&self, mut plan: AssetModel) -> ProviderResult<AssetModel> {
        let request = to_create_request(&plan)?;
        let asset = self
            .client
            .create_asset(&request)
            .await
            .map_err(|e| ProviderError::client("Unable to create asset", e))?;

        if asset.id.is_empty() {
            return Err(ProviderError::api_contract("Asset created but no ID returned"));
        }

        apply_response(&mut plan, &asset)?;
        info!("Created asset: id={} name={}", asset.id, asset.name);
        Ok(plan)
    }

    async fn read(&self, mut state: AssetModel) -> ProviderResult<Option<AssetModel>> {
        let id = stored_identifier(&state.id, "read")?;
        match self.client.get_asset(&id).await {
            Ok(asset) => {
                apply_response(&mut state, &asset)?;
                Ok(Some(state))
            }
            Err(e) if e.is_not_found() => {
                warn!("Asset {} no longer exists", id);
                Ok(None)
            }
            Err(e) => Err(ProviderError::client("Unable to read asset", e)),
        }
    }

    async fn update(&self, mut plan: AssetModel, state: AssetModel) -> ProviderResult<AssetModel> {
        let id = stored_identifier(&state.id, "update")?;
        let request = to_update_request(&plan)?;
        let asset = self
            .client
            .update_asset(&id, &request)
            .await
            .map_err(|e| ProviderError::client("Unable to update asset", e))?;

        apply_response(&mut plan, &asset)?;
        info!("Updated asset: id={} name={}", id, asset.name);
        Ok(plan)
    }

    async fn delete(&self, state: AssetModel) -> ProviderResult<()> {
        let id = stored_identifier(&state.id, "delete")?;
        match self.client.delete_asset(&id).await {
            Ok(()) => {
                info!("Deleted asset: id={}", id);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                warn!("Asset {} was already deleted", id);
                Ok(())
            }
            Err(e) => Err(ProviderError::client("Unable to delete asset", e)),
        }
    }
}
