//! Resource types managed by the Marmot provider
//!
//! Each resource type pairs a typed declarative model with an orchestrator
//! implementing [`ResourceHandler`]. The provider decodes dynamic attribute
//! maps into the model, runs the handler and encodes the result back.

pub mod asset;
pub mod glossary;
pub mod lineage;

use std::collections::HashMap;

use async_trait::async_trait;
use marmot_core::attr::Attr;
use marmot_core::provider::{ProviderError, ProviderResult, ResourceType};
use marmot_core::resource::{Attributes, ResourceId, State};
use marmot_core::schema::ResourceSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use asset::AssetResource;
pub use glossary::GlossaryResource;
pub use lineage::LineageResource;

/// Typed CRUD orchestrator for one resource type
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Declarative model, as stored in state
    type Model: Serialize + DeserializeOwned + Send + Sync + 'static;

    fn type_name(&self) -> &'static str;

    fn schema(&self) -> ResourceSchema;

    /// Server-assigned identifier held by a model
    fn identifier(model: &Self::Model) -> Option<&str>;

    /// Model holding only an identifier, used by import
    fn from_identifier(identifier: &str) -> Self::Model;

    async fn create(&self, plan: Self::Model) -> ProviderResult<Self::Model>;

    /// Refresh the model; `None` when the entity no longer exists
    async fn read(&self, state: Self::Model) -> ProviderResult<Option<Self::Model>>;

    async fn update(&self, plan: Self::Model, state: Self::Model) -> ProviderResult<Self::Model>;

    async fn delete(&self, state: Self::Model) -> ProviderResult<()>;
}

/// Identifier recorded in state; every operation but create needs one
pub(crate) fn stored_identifier(id: &Attr<String>, operation: &str) -> ProviderResult<String> {
    id.as_str()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            ProviderError::configuration(format!("id is required for {} operation", operation))
        })
}

/// Decode a dynamic attribute map into a typed model
pub fn decode<M: DeserializeOwned>(resource_type: &str, attributes: &Attributes) -> ProviderResult<M> {
    serde_json::from_value(Value::Object(attributes.clone())).map_err(|e| {
        ProviderError::conversion(format!(
            "Unable to decode {} attributes: {}",
            resource_type, e
        ))
    })
}

/// Encode a typed model into a dynamic attribute map
pub fn encode<M: Serialize>(resource_type: &str, model: &M) -> ProviderResult<Attributes> {
    match serde_json::to_value(model) {
        Ok(Value::Object(attributes)) => Ok(attributes),
        Ok(other) => Err(ProviderError::conversion(format!(
            "Unable to encode {} attributes: expected an object, got {}",
            resource_type, other
        ))),
        Err(e) => Err(ProviderError::conversion(format!(
            "Unable to encode {} attributes: {}",
            resource_type, e
        ))),
    }
}

/// Stored state for a model returned by a handler
pub fn into_state<H: ResourceHandler>(id: ResourceId, model: &H::Model) -> ProviderResult<State> {
    let attributes = encode(&id.resource_type, model)?;
    let state = State::existing(id, attributes);
    Ok(match H::identifier(model) {
        Some(identifier) => state.with_identifier(identifier),
        None => state,
    })
}

/// Schema descriptor exposed through the dynamic provider contract
struct Descriptor {
    name: &'static str,
    schema: ResourceSchema,
}

impl ResourceType for Descriptor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn schema(&self) -> ResourceSchema {
        self.schema.clone()
    }
}

pub(crate) fn descriptor<H: ResourceHandler>(handler: &H) -> Box<dyn ResourceType> {
    Box::new(Descriptor {
        name: handler.type_name(),
        schema: handler.schema(),
    })
}

/// Schemas of every resource type, keyed by type name
///
/// Available without a configured client, for offline validation.
pub fn schemas() -> HashMap<String, ResourceSchema> {
    [
        asset::asset_schema(),
        glossary::glossary_term_schema(),
        lineage::lineage_schema(),
    ]
    .into_iter()
    .map(|schema| (schema.resource_type.clone(), schema))
    .collect()
}
