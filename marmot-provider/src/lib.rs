//! Marmot Provider
//!
//! Manages assets, glossary terms and lineage edges of a Marmot metadata
//! catalog through its REST API.
//!
//! ## Module Structure
//!
//! - `config` - Provider configuration and base URL derivation
//! - `client` - Wire model, `CatalogApi` trait and HTTP client
//! - `convert` - Normalization helpers shared by the converters
//! - `resources` - Declarative models, converters and orchestrators
//! - `provider` - MarmotProvider implementation

pub mod client;
pub mod config;
pub mod convert;
pub mod provider;
pub mod resources;

#[cfg(test)]
mod testing;

// Re-export main types
pub use client::{ApiError, CatalogApi, HttpCatalogClient};
pub use config::ProviderConfig;
pub use provider::MarmotProvider;

use marmot_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use marmot_core::resource::{Resource, ResourceId, State};

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for MarmotProvider {
    fn name(&self) -> &'static str {
        "marmot"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        self.resource_type_descriptors()
    }

    fn read(&self, current: &State) -> BoxFuture<'_, ProviderResult<State>> {
        let current = current.clone();
        Box::pin(async move { self.read_resource(current).await })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(resource).await })
    }

    fn update(&self, from: &State, to: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(from, to).await })
    }

    fn delete(&self, current: &State) -> BoxFuture<'_, ProviderResult<()>> {
        let current = current.clone();
        Box::pin(async move { self.delete_resource(current).await })
    }

    fn import(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.import_resource(id, &identifier).await })
    }
}
