//! marmot_glossary_term - Business glossary terms

use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use marmot_core::attr::{Attr, StringMap};
use marmot_core::provider::{ProviderError, ProviderResult};
use marmot_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use serde::{Deserialize, Serialize};

use super::{ResourceHandler, stored_identifier};
use crate::client::CatalogApi;
use crate::client::models::{GlossaryTerm, GlossaryTermRequest, Owner};
use crate::convert::{
    dictionary_to_strings, map_to_dictionary, normalize_timestamp, optional_string, require,
    strings_to_map_or_null,
};

pub const GLOSSARY_TERM: &str = "marmot_glossary_term";

pub const OWNER_TYPES: [&str; 2] = ["user", "team"];

/// Declarative model of a glossary term
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlossaryTermModel {
    pub name: Attr<String>,
    pub definition: Attr<String>,
    pub description: Attr<String>,
    pub parent_term_id: Attr<String>,
    pub owners: Attr<Vec<OwnerModel>>,
    pub metadata: Attr<StringMap>,

    // Computed
    pub id: Attr<String>,
    pub created_at: Attr<String>,
    pub updated_at: Attr<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnerModel {
    pub id: String,
    #[serde(rename = "type")]
    pub owner_type: String,
}

pub fn glossary_term_schema() -> ResourceSchema {
    ResourceSchema::new(GLOSSARY_TERM)
        .with_description("Business glossary term in the Marmot catalog")
        .attribute(
            AttributeSchema::new("name", AttributeType::length_between(1, 255))
                .required()
                .with_description("Name of the glossary term"),
        )
        .attribute(
            AttributeSchema::new("definition", AttributeType::length_at_least(1))
                .required()
                .with_description("Definition of the glossary term"),
        )
        .attribute(AttributeSchema::new("description", AttributeType::String))
        .attribute(
            AttributeSchema::new("parent_term_id", AttributeType::String)
                .with_description("ID of the parent term"),
        )
        .attribute(AttributeSchema::new(
            "owners",
            AttributeType::list_of(AttributeType::Object(vec![
                AttributeSchema::new("id", AttributeType::String).required(),
                AttributeSchema::new("type", AttributeType::one_of(&OWNER_TYPES)).required(),
            ])),
        ))
        .attribute(AttributeSchema::new(
            "metadata",
            AttributeType::map_of(AttributeType::String),
        ))
        .attribute(AttributeSchema::new("id", AttributeType::String).computed())
        .attribute(AttributeSchema::new("created_at", AttributeType::String).computed())
        .attribute(AttributeSchema::new("updated_at", AttributeType::String).computed())
}

/// Build the request body shared by create and update
pub fn to_request(model: &GlossaryTermModel) -> ProviderResult<GlossaryTermRequest> {
    let owners = model
        .owners
        .as_value()
        .filter(|owners| !owners.is_empty())
        .map(|owners| {
            owners
                .iter()
                .map(|owner| Owner {
                    id: owner.id.clone(),
                    owner_type: owner.owner_type.clone(),
                })
                .collect()
        });

    Ok(GlossaryTermRequest {
        name: require(&model.name, "name")?.to_string(),
        definition: require(&model.definition, "definition")?.to_string(),
        description: optional_string(&model.description),
        parent_term_id: optional_string(&model.parent_term_id),
        owners,
        metadata: map_to_dictionary(&model.metadata),
    })
}

/// Overwrite every attribute of `model` from a catalog response
pub fn apply_response(model: &mut GlossaryTermModel, term: &GlossaryTerm) -> ProviderResult<()> {
    model.id = Attr::Value(term.id.clone());
    model.name = Attr::Value(term.name.clone());
    model.definition = Attr::Value(term.definition.clone());
    model.description = Attr::from_non_empty(term.description.as_str());
    model.parent_term_id = Attr::from_non_empty(term.parent_term_id.as_str());
    model.owners = if term.owners.is_empty() {
        Attr::Null
    } else {
        Attr::Value(
            term.owners
                .iter()
                .map(|owner| OwnerModel {
                    id: owner.id.clone(),
                    owner_type: owner.owner_type.clone(),
                })
                .collect(),
        )
    };
    model.metadata = strings_to_map_or_null(dictionary_to_strings(&term.metadata)?);
    model.created_at = Attr::Value(normalize_timestamp(&term.created_at));
    model.updated_at = Attr::Value(normalize_timestamp(&term.updated_at));
    Ok(())
}

/// Orchestrator for `marmot_glossary_term`
pub struct GlossaryResource {
    client: Arc<dyn CatalogApi>,
}

impl GlossaryResource {
    pub fn new(client: Arc<dyn CatalogApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceHandler for GlossaryResource {
    type Model = GlossaryTermModel;

    fn type_name(&self) -> &'static str {
        GLOSSARY_TERM
    }

    fn schema(&self) -> ResourceSchema {
        glossary_term_schema()
    }

    fn identifier(model: &GlossaryTermModel) -> Option<&str> {
        model.id.as_str().filter(|id| !id.is_empty())
    }

    fn from_identifier(identifier: &str) -> GlossaryTermModel {
        GlossaryTermModel {
            id: Attr::Value(identifier.to_string()),
            ..Default::default()
        }
    }

    async fn create(&self, mut plan: GlossaryTermModel) -> ProviderResult<GlossaryTermModel> {
        let request = to_request(&plan)?;
        let term = self
            .client
            .create_glossary_term(&request)
            .await
            .map_err(|e| ProviderError::client("Unable to create glossary term", e))?;

        if term.id.is_empty() {
            return Err(ProviderError::api_contract(
                "Glossary term created but no ID returned",
            ));
        }

        apply_response(&mut plan, &term)?;
        info!("Created glossary term: id={} name={}", term.id, term.name);
        Ok(plan)
    }

    async fn read(&self, mut state: GlossaryTermModel) -> ProviderResult<Option<GlossaryTermModel>> {
        let id = stored_identifier(&state.id, "read")?;
        match self.client.get_glossary_term(&id).await {
            Ok(term) => {
                apply_response(&mut state, &term)?;
                Ok(Some(state))
            }
            Err(e) if e.is_not_found() => {
                warn!("Glossary term {} no longer exists", id);
                Ok(None)
            }
            Err(e) => Err(ProviderError::client("Unable to read glossary term", e)),
        }
    }

    async fn update(
        &self,
        mut plan: GlossaryTermModel,
        state: GlossaryTermModel,
    ) -> ProviderResult<GlossaryTermModel> {
        let id = stored_identifier(&state.id, "update")?;
        let request = to_request(&plan)?;
        let term = self
            .client
            .update_glossary_term(&id, &request)
            .await
            .map_err(|e| ProviderError::client("Unable to update glossary term", e))?;

        apply_response(&mut plan, &term)?;
        info!("Updated glossary term: id={} name={}", id, term.name);
        Ok(plan)
    }

    async fn delete(&self, state: GlossaryTermModel) -> ProviderResult<()> {
        let id = stored_identifier(&state.id, "delete")?;
        match self.client.delete_glossary_term(&id).await {
            Ok(()) => {
                info!("Deleted glossary term: id={}", id);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                warn!("Glossary term {} was already deleted", id);
                Ok(())
            }
            Err(e) => Err(ProviderError::client("Unable to delete glossary term", e)),
        }
    }
}
