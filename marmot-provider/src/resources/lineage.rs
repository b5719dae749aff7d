//! marmot_lineage - Direct lineage edges between assets
//!
//! Edges are immutable: changing `source` or `target` replaces the edge, and
//! an in-place update is rejected without contacting the catalog.

use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use marmot_core::attr::Attr;
use marmot_core::provider::{ProviderError, ProviderResult};
use marmot_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use serde::{Deserialize, Serialize};

use super::{ResourceHandler, stored_identifier};
use crate::client::CatalogApi;
use crate::client::models::{LineageEdge, LineageEdgeRequest};
use crate::convert::require;

pub const LINEAGE: &str = "marmot_lineage";

/// Declarative model of a lineage edge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineageModel {
    /// MRN of the upstream asset
    pub source: Attr<String>,
    /// MRN of the downstream asset
    pub target: Attr<String>,
    pub resource_id: Attr<String>,
    #[serde(rename = "type")]
    pub edge_type: Attr<String>,
}

pub fn lineage_schema() -> ResourceSchema {
    ResourceSchema::new(LINEAGE)
        .with_description("Direct lineage edge between two assets")
        .attribute(
            AttributeSchema::new("source", AttributeType::String)
                .required()
                .force_new()
                .with_description("MRN of the source asset"),
        )
        .attribute(
            AttributeSchema::new("target", AttributeType::String)
                .required()
                .force_new()
                .with_description("MRN of the target asset"),
        )
        .attribute(AttributeSchema::new("resource_id", AttributeType::String).computed())
        .attribute(AttributeSchema::new("type", AttributeType::String).computed())
}

pub fn to_request(model: &LineageModel) -> ProviderResult<LineageEdgeRequest> {
    Ok(LineageEdgeRequest {
        source: require(&model.source, "source")?.to_string(),
        target: require(&model.target, "target")?.to_string(),
    })
}

/// Merge a catalog response into `model`
///
/// Endpoints the response leaves empty keep their prior values.
pub fn apply_response(model: &mut LineageModel, edge: &LineageEdge) {
    model.resource_id = Attr::Value(edge.id.clone());
    model.edge_type = Attr::Value(edge.edge_type.clone());
    if !edge.source.is_empty() {
        model.source = Attr::Value(edge.source.clone());
    }
    if !edge.target.is_empty() {
        model.target = Attr::Value(edge.target.clone());
    }
}

/// Orchestrator for `marmot_lineage`
pub struct LineageResource {
    client: Arc<dyn CatalogApi>,
}

impl LineageResource {
    pub fn new(client: Arc<dyn CatalogApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceHandler for LineageResource {
    type Model = LineageModel;

    fn type_name(&self) -> &'static str {
        LINEAGE
    }

    fn schema(&self) -> ResourceSchema {
        lineage_schema()
    }

    fn identifier(model: &LineageModel) -> Option<&str> {
        model.resource_id.as_str().filter(|id| !id.is_empty())
    }

    fn from_identifier(identifier: &str) -> LineageModel {
        LineageModel {
            resource_id: Attr::Value(identifier.to_string()),
            ..Default::default()
        }
    }

    async fn create(&self, mut plan: LineageModel) -> ProviderResult<LineageModel> {
        let request = to_request(&plan)?;
        let edge = self
            .client
            .create_lineage(&request)
            .await
            .map_err(|e| ProviderError::client("Unable to create lineage edge", e))?;

        if edge.id.is_empty() {
            return Err(ProviderError::api_contract(
                "Lineage edge created but no ID returned",
            ));
        }

        apply_response(&mut plan, &edge);
        info!(
            "Created lineage edge: id={} {} -> {}",
            edge.id, request.source, request.target
        );
        Ok(plan)
    }

    async fn read(&self, mut state: LineageModel) -> ProviderResult<Option<LineageModel>> {
        let id = stored_identifier(&state.resource_id, "read")?;
        match self.client.get_lineage(&id).await {
            Ok(edge) => {
                apply_response(&mut state, &edge);
                Ok(Some(state))
            }
            Err(e) if e.is_not_found() => {
                warn!("Lineage edge {} no longer exists", id);
                Ok(None)
            }
            Err(e) => Err(ProviderError::client("Unable to read lineage edge", e)),
        }
    }

    async fn update(&self, _plan: LineageModel, _state: LineageModel) -> ProviderResult<LineageModel> {
        Err(ProviderError::usage(
            "Lineage edges cannot be updated in place; changing source or target replaces the edge",
        ))
    }

    async fn delete(&self, state: LineageModel) -> ProviderResult<()> {
        let id = stored_identifier(&state.resource_id, "delete")?;
        match self.client.delete_lineage(&id).await {
            Ok(()) => {
                info!("Deleted lineage edge: id={}", id);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                warn!("Lineage edge {} was already deleted", id);
                Ok(())
            }
            Err(e) => Err(ProviderError::client("Unable to delete lineage edge", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCatalog;

    fn edge(source: &str, target: &str) -> LineageModel {
        LineageModel {
            source: Attr::Value(source.to_string()),
            target: Attr::Value(target.to_string()),
            ..Default::default()
        }
    }

    fn setup() -> (Arc<FakeCatalog>, LineageResource) {
        let catalog = Arc::new(FakeCatalog::new());
        let resource = LineageResource::new(catalog.clone());
        (catalog, resource)
    }

    #[tokio::test]
    async fn create_returns_identifier_and_type() {
        let (_, resource) = setup();
        let created = resource
            .create(edge("mrn://topic/kafka/a", "mrn://table/postgres/b"))
            .await
            .unwrap();

        assert_eq!(created.resource_id.as_str(), Some("edge-1"));
        assert_eq!(created.edge_type.as_str(), Some("DIRECT"));
        assert_eq!(created.source.as_str(), Some("mrn://topic/kafka/a"));
    }

    #[tokio::test]
    async fn create_with_unknown_target_fails_without_call() {
        let (catalog, resource) = setup();
        let mut plan = edge("mrn://a", "mrn://b");
        plan.target = Attr::Unknown;

        let err = resource.create(plan).await.unwrap_err();
        assert_eq!(err.summary(), "Configuration Error");
        assert!(catalog.calls().is_empty());
    }

    #[tokio::test]
    async fn update_is_rejected_without_api_call() {
        let (catalog, resource) = setup();
        let created = resource.create(edge("mrn://a", "mrn://b")).await.unwrap();

        let err = resource
            .update(edge("mrn://a", "mrn://c"), created)
            .await
            .unwrap_err();
        assert_eq!(err.summary(), "Usage Error");
        assert_eq!(catalog.calls(), vec!["create_lineage"]);
    }

    #[tokio::test]
    async fn read_keeps_prior_endpoints_when_response_omits_them() {
        let (catalog, resource) = setup();
        catalog.insert_edge(LineageEdge {
            id: "l-1".to_string(),
            edge_type: "DIRECT".to_string(),
            ..Default::default()
        });

        let mut state = edge("mrn://a", "mrn://b");
        state.resource_id = Attr::Value("l-1".to_string());
        let refreshed = resource.read(state).await.unwrap().unwrap();

        assert_eq!(refreshed.source.as_str(), Some("mrn://a"));
        assert_eq!(refreshed.target.as_str(), Some("mrn://b"));
        assert_eq!(refreshed.edge_type.as_str(), Some("DIRECT"));
    }

    #[tokio::test]
    async fn import_then_read_fills_endpoints() {
        let (catalog, resource) = setup();
        catalog.insert_edge(LineageEdge {
            id: "l-2".to_string(),
            source: "mrn://x".to_string(),
            target: "mrn://y".to_string(),
            edge_type: "DIRECT".to_string(),
        });

        let state = resource
            .read(LineageResource::from_identifier("l-2"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state, {
            let mut expected = edge("mrn://x", "mrn://y");
            expected.resource_id = Attr::Value("l-2".to_string());
            expected.edge_type = Attr::Value("DIRECT".to_string());
            expected
        });
    }

    #[tokio::test]
    async fn delete_of_missing_edge_succeeds() {
        let (_, resource) = setup();
        resource
            .delete(LineageResource::from_identifier("l-404"))
            .await
            .unwrap();
    }
}
