//! Catalog API client
//!
//! [`CatalogApi`] is the seam between the resource orchestrators and the
//! catalog service. [`HttpCatalogClient`] implements it over REST; tests
//! substitute an in-memory fake.

pub mod http;
pub mod models;

use async_trait::async_trait;

pub use http::HttpCatalogClient;
use models::{
    Asset, AssetCreateRequest, AssetUpdateRequest, GlossaryTerm, GlossaryTermRequest, LineageEdge,
    LineageEdgeRequest,
};

/// Error returned by catalog API calls
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("API key is not a valid header value")]
    InvalidApiKey,

    #[error("invalid catalog URL {0}")]
    InvalidBaseUrl(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Operations of the catalog REST API used by the provider
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn create_asset(&self, request: &AssetCreateRequest) -> ApiResult<Asset>;
    async fn get_asset(&self, id: &str) -> ApiResult<Asset>;
    async fn update_asset(&self, id: &str, request: &AssetUpdateRequest) -> ApiResult<Asset>;
    async fn delete_asset(&self, id: &str) -> ApiResult<()>;

    async fn create_glossary_term(&self, request: &GlossaryTermRequest)
    -> ApiResult<GlossaryTerm>;
    async fn get_glossary_term(&self, id: &str) -> ApiResult<GlossaryTerm>;
    async fn update_glossary_term(
        &self,
        id: &str,
        request: &GlossaryTermRequest,
    ) -> ApiResult<GlossaryTerm>;
    async fn delete_glossary_term(&self, id: &str) -> ApiResult<()>;

    /// Lineage edges are immutable; there is no update call.
    async fn create_lineage(&self, request: &LineageEdgeRequest) -> ApiResult<LineageEdge>;
    async fn get_lineage(&self, id: &str) -> ApiResult<LineageEdge>;
    async fn delete_lineage(&self, id: &str) -> ApiResult<()>;
}
