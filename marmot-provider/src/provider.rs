//! Marmot Provider implementation
//!
//! Routes dynamic resources to the typed orchestrator of their resource
//! type. Declared attributes are validated against the resource schema
//! before any request is built.

use std::sync::Arc;

use log::info;
use marmot_core::provider::{Diagnostic, ProviderError, ProviderResult, ResourceType};
use marmot_core::resource::{Resource, ResourceId, State};

use crate::client::{CatalogApi, HttpCatalogClient};
use crate::config::ProviderConfig;
use crate::resources::asset::ASSET;
use crate::resources::glossary::GLOSSARY_TERM;
use crate::resources::lineage::LINEAGE;
use crate::resources::{
    AssetResource, GlossaryResource, LineageResource, ResourceHandler, decode, descriptor,
    into_state,
};

/// Marmot catalog provider
pub struct MarmotProvider {
    asset: AssetResource,
    glossary: GlossaryResource,
    lineage: LineageResource,
}

impl MarmotProvider {
    /// Create a provider over an existing catalog client
    pub fn new(client: Arc<dyn CatalogApi>) -> Self {
        Self {
            asset: AssetResource::new(client.clone()),
            glossary: GlossaryResource::new(client.clone()),
            lineage: LineageResource::new(client),
        }
    }

    /// Validate the configuration and build an HTTP-backed provider
    pub fn from_config(config: &ProviderConfig) -> Result<Self, Vec<Diagnostic>> {
        let settings = config.validate()?;
        let client = HttpCatalogClient::new(&settings).map_err(|e| {
            vec![Diagnostic::error(
                "Unable to Create Marmot API Client",
                e.to_string(),
            )]
        })?;
        info!("Configured Marmot client: host={}", settings.host);
        Ok(Self::new(Arc::new(client)))
    }

    pub(crate) fn resource_type_descriptors(&self) -> Vec<Box<dyn ResourceType>> {
        vec![
            descriptor(&self.asset),
            descriptor(&self.glossary),
            descriptor(&self.lineage),
        ]
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    pub async fn create_resource(&self, resource: Resource) -> ProviderResult<State> {
        match resource.id.resource_type.as_str() {
            ASSET => create_with(&self.asset, resource).await,
            GLOSSARY_TERM => create_with(&self.glossary, resource).await,
            LINEAGE => create_with(&self.lineage, resource).await,
            other => Err(unsupported(other)),
        }
    }

    pub async fn read_resource(&self, current: State) -> ProviderResult<State> {
        match current.id.resource_type.as_str() {
            ASSET => read_with(&self.asset, current).await,
            GLOSSARY_TERM => read_with(&self.glossary, current).await,
            LINEAGE => read_with(&self.lineage, current).await,
            other => Err(unsupported(other)),
        }
    }

    pub async fn update_resource(&self, from: State, to: Resource) -> ProviderResult<State> {
        match to.id.resource_type.as_str() {
            ASSET => update_with(&self.asset, from, to).await,
            GLOSSARY_TERM => update_with(&self.glossary, from, to).await,
            LINEAGE => update_with(&self.lineage, from, to).await,
            other => Err(unsupported(other)),
        }
    }

    pub async fn delete_resource(&self, current: State) -> ProviderResult<()> {
        match current.id.resource_type.as_str() {
            ASSET => delete_with(&self.asset, current).await,
            GLOSSARY_TERM => delete_with(&self.glossary, current).await,
            LINEAGE => delete_with(&self.lineage, current).await,
            other => Err(unsupported(other)),
        }
    }

    pub async fn import_resource(&self, id: ResourceId, identifier: &str) -> ProviderResult<State> {
        match id.resource_type.as_str() {
            ASSET => import_with(&self.asset, id, identifier).await,
            GLOSSARY_TERM => import_with(&self.glossary, id, identifier).await,
            LINEAGE => import_with(&self.lineage, id, identifier).await,
            other => Err(unsupported(other)),
        }
    }
}

fn unsupported(resource_type: &str) -> ProviderError {
    ProviderError::usage(format!("Unsupported resource type: {}", resource_type))
}

fn validate<H: ResourceHandler>(handler: &H, resource: &Resource) -> ProviderResult<()> {
    handler
        .schema()
        .validate(&resource.attributes)
        .map_err(ProviderError::Validation)
}

async fn create_with<H: ResourceHandler>(handler: &H, resource: Resource) -> ProviderResult<State> {
    validate(handler, &resource)?;
    let plan: H::Model = decode(&resource.id.resource_type, &resource.attributes)?;
    let created = handler.create(plan).await?;
    into_state::<H>(resource.id, &created)
}

async fn read_with<H: ResourceHandler>(handler: &H, current: State) -> ProviderResult<State> {
    let stored: H::Model = decode(&current.id.resource_type, &current.attributes)?;
    match handler.read(stored).await? {
        Some(model) => into_state::<H>(current.id, &model),
        None => Ok(State::not_found(current.id)),
    }
}

async fn update_with<H: ResourceHandler>(
    handler: &H,
    from: State,
    to: Resource,
) -> ProviderResult<State> {
    validate(handler, &to)?;
    let plan: H::Model = decode(&to.id.resource_type, &to.attributes)?;
    let stored: H::Model = decode(&from.id.resource_type, &from.attributes)?;
    let updated = handler.update(plan, stored).await?;
    into_state::<H>(to.id, &updated)
}

async fn delete_with<H: ResourceHandler>(handler: &H, current: State) -> ProviderResult<()> {
    let stored: H::Model = decode(&current.id.resource_type, &current.attributes)?;
    handler.delete(stored).await
}

async fn import_with<H: ResourceHandler>(
    handler: &H,
    id: ResourceId,
    identifier: &str,
) -> ProviderResult<State> {
    match handler.read(H::from_identifier(identifier)).await? {
        Some(model) => into_state::<H>(id, &model),
        None => Err(ProviderError::configuration(format!(
            "Cannot import {}: no entity with id {} exists",
            id, identifier
        ))),
    }
}
