//! In-memory catalog used by the orchestrator and provider tests

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::client::models::{
    Asset, AssetCreateRequest, AssetUpdateRequest, GlossaryTerm, GlossaryTermRequest, LineageEdge,
    LineageEdgeRequest,
};
use crate::client::{ApiError, ApiResult, CatalogApi};

pub const CREATED_AT: &str = "2024-01-02T03:04:05.123456789Z";
pub const UPDATED_AT: &str = "2024-02-03T04:05:06.5+01:00";

#[derive(Default)]
struct Inner {
    next_id: u64,
    calls: Vec<String>,
    requests: Vec<Value>,
    blank_ids: bool,
    failure: Option<(u16, String)>,
    assets: BTreeMap<String, Asset>,
    terms: BTreeMap<String, GlossaryTerm>,
    edges: BTreeMap<String, LineageEdge>,
}

/// Fake catalog recording every call and request body
#[derive(Default)]
pub struct FakeCatalog {
    inner: Mutex<Inner>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return entities without an identifier on create
    pub fn with_blank_ids(self) -> Self {
        self.inner.lock().unwrap().blank_ids = true;
        self
    }

    /// Fail the next call with the given HTTP status
    pub fn fail_next(&self, status: u16, body: &str) {
        self.inner.lock().unwrap().failure = Some((status, body.to_string()));
    }

    pub fn insert_asset(&self, asset: Asset) {
        self.inner
            .lock()
            .unwrap()
            .assets
            .insert(asset.id.clone(), asset);
    }

    pub fn insert_term(&self, term: GlossaryTerm) {
        self.inner.lock().unwrap().terms.insert(term.id.clone(), term);
    }

    pub fn insert_edge(&self, edge: LineageEdge) {
        self.inner.lock().unwrap().edges.insert(edge.id.clone(), edge);
    }

    pub fn remove_asset(&self, id: &str) {
        self.inner.lock().unwrap().assets.remove(id);
    }

    pub fn asset(&self, id: &str) -> Option<Asset> {
        self.inner.lock().unwrap().assets.get(id).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Body of the most recent create or update request
    pub fn last_request(&self) -> Option<Value> {
        self.inner.lock().unwrap().requests.last().cloned()
    }

    fn begin(&self, call: String, body: Option<Value>) -> ApiResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);
        if let Some(body) = body {
            inner.requests.push(body);
        }
        match inner.failure.take() {
            Some((status, body)) => Err(ApiError::Status { status, body }),
            None => Ok(()),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut inner = self.inner.lock().unwrap();
        if inner.blank_ids {
            return String::new();
        }
        inner.next_id += 1;
        format!("{}-{}", prefix, inner.next_id)
    }
}

fn body<T: Serialize>(request: &T) -> Option<Value> {
    serde_json::to_value(request).ok()
}

fn object_or_null(map: Option<serde_json::Map<String, Value>>) -> Value {
    map.map(Value::Object).unwrap_or(Value::Null)
}

fn mrn(asset_type: &str, providers: &[String], name: &str) -> String {
    let service = providers.first().map(String::as_str).unwrap_or("unknown");
    format!(
        "mrn://{}/{}/{}",
        asset_type.to_lowercase(),
        service.to_lowercase(),
        name
    )
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn create_asset(&self, request: &AssetCreateRequest) -> ApiResult<Asset> {
        self.begin("create_asset".to_string(), body(request))?;
        let asset = Asset {
            id: self.next_id("asset"),
            name: request.name.clone(),
            asset_type: request.asset_type.clone(),
            description: request.description.clone().unwrap_or_default(),
            providers: request.providers.clone(),
            tags: request.tags.clone(),
            metadata: object_or_null(request.metadata.clone()),
            schema: request.schema.clone().unwrap_or_default(),
            external_links: request.external_links.clone().unwrap_or_default(),
            sources: request.sources.clone().unwrap_or_default(),
            environments: request.environments.clone().unwrap_or_default(),
            mrn: mrn(&request.asset_type, &request.providers, &request.name),
            created_at: CREATED_AT.to_string(),
            created_by: "fake".to_string(),
            updated_at: CREATED_AT.to_string(),
            ..Default::default()
        };
        self.insert_asset(asset.clone());
        Ok(asset)
    }

    async fn get_asset(&self, id: &str) -> ApiResult<Asset> {
        self.begin(format!("get_asset:{}", id), None)?;
        self.asset(id)
            .ok_or_else(|| ApiError::NotFound(format!("asset {}", id)))
    }

    async fn update_asset(&self, id: &str, request: &AssetUpdateRequest) -> ApiResult<Asset> {
        self.begin(format!("update_asset:{}", id), body(request))?;
        let mut asset = self
            .asset(id)
            .ok_or_else(|| ApiError::NotFound(format!("asset {}", id)))?;
        asset.name = request.name.clone();
        asset.asset_type = request.asset_type.clone();
        asset.description = request.description.clone().unwrap_or_default();
        asset.user_description = request.user_description.clone();
        asset.providers = request.providers.clone();
        asset.tags = request.tags.clone();
        asset.metadata = object_or_null(request.metadata.clone());
        asset.schema = request.schema.clone().unwrap_or_default();
        asset.external_links = request.external_links.clone().unwrap_or_default();
        asset.sources = request.sources.clone().unwrap_or_default();
        asset.environments = request.environments.clone().unwrap_or_default();
        asset.updated_at = UPDATED_AT.to_string();
        self.insert_asset(asset.clone());
        Ok(asset)
    }

    async fn delete_asset(&self, id: &str) -> ApiResult<()> {
        self.begin(format!("delete_asset:{}", id), None)?;
        match self.inner.lock().unwrap().assets.remove(id) {
            Some(_) => Ok(()),
            None => Err(ApiError::NotFound(format!("asset {}", id))),
        }
    }

    async fn create_glossary_term(
        &self,
        request: &GlossaryTermRequest,
    ) -> ApiResult<GlossaryTerm> {
        self.begin("create_glossary_term".to_string(), body(request))?;
        let term = GlossaryTerm {
            id: self.next_id("term"),
            name: request.name.clone(),
            definition: request.definition.clone(),
            description: request.description.clone().unwrap_or_default(),
            parent_term_id: request.parent_term_id.clone().unwrap_or_default(),
            owners: request.owners.clone().unwrap_or_default(),
            metadata: object_or_null(request.metadata.clone()),
            created_at: CREATED_AT.to_string(),
            updated_at: CREATED_AT.to_string(),
        };
        self.insert_term(term.clone());
        Ok(term)
    }

    async fn get_glossary_term(&self, id: &str) -> ApiResult<GlossaryTerm> {
        self.begin(format!("get_glossary_term:{}", id), None)?;
        self.inner
            .lock()
            .unwrap()
            .terms
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("glossary term {}", id)))
    }

    async fn update_glossary_term(
        &self,
        id: &str,
        request: &GlossaryTermRequest,
    ) -> ApiResult<GlossaryTerm> {
        self.begin(format!("update_glossary_term:{}", id), body(request))?;
        let mut inner = self.inner.lock().unwrap();
        let term = inner
            .terms
            .get_mut(id)
            .ok_or_else(|| ApiError::NotFound(format!("glossary term {}", id)))?;
        term.name = request.name.clone();
        term.definition = request.definition.clone();
        term.description = request.description.clone().unwrap_or_default();
        term.parent_term_id = request.parent_term_id.clone().unwrap_or_default();
        term.owners = request.owners.clone().unwrap_or_default();
        term.metadata = object_or_null(request.metadata.clone());
        term.updated_at = UPDATED_AT.to_string();
        Ok(term.clone())
    }

    async fn delete_glossary_term(&self, id: &str) -> ApiResult<()> {
        self.begin(format!("delete_glossary_term:{}", id), None)?;
        match self.inner.lock().unwrap().terms.remove(id) {
            Some(_) => Ok(()),
            None => Err(ApiError::NotFound(format!("glossary term {}", id))),
        }
    }

    async fn create_lineage(&self, request: &LineageEdgeRequest) -> ApiResult<LineageEdge> {
        self.begin("create_lineage".to_string(), body(request))?;
        let edge = LineageEdge {
            id: self.next_id("edge"),
            source: request.source.clone(),
            target: request.target.clone(),
            edge_type: "DIRECT".to_string(),
        };
        self.insert_edge(edge.clone());
        Ok(edge)
    }

    async fn get_lineage(&self, id: &str) -> ApiResult<LineageEdge> {
        self.begin(format!("get_lineage:{}", id), None)?;
        self.inner
            .lock()
            .unwrap()
            .edges
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("lineage edge {}", id)))
    }

    async fn delete_lineage(&self, id: &str) -> ApiResult<()> {
        self.begin(format!("delete_lineage:{}", id), None)?;
        match self.inner.lock().unwrap().edges.remove(id) {
            Some(_) => Ok(()),
            None => Err(ApiError::NotFound(format!("lineage edge {}", id))),
        }
    }
}
