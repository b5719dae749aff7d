//! REST implementation of [`CatalogApi`]

use std::fmt;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::models::{
    Asset, AssetCreateRequest, AssetUpdateRequest, GlossaryTerm, GlossaryTermRequest, LineageEdge,
    LineageEdgeRequest,
};
use super::{ApiError, ApiResult, CatalogApi};
use crate::config::{API_KEY_HEADER, ClientSettings};

/// Catalog client over HTTP
#[derive(Clone)]
pub struct HttpCatalogClient {
    base_url: Url,
    client: reqwest::Client,
}

impl fmt::Debug for HttpCatalogClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpCatalogClient")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl HttpCatalogClient {
    /// Build a client that sends the API key with every request
    pub fn new(settings: &ClientSettings) -> ApiResult<Self> {
        let mut api_key = HeaderValue::from_str(&settings.api_key)
            .map_err(|_| ApiError::InvalidApiKey)?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, api_key);

        let base_url = Url::parse(&settings.base_url)
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{}: {}", settings.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(settings.base_url.clone()));
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends path segments to the API base; each segment is percent-encoded,
    /// so an id can never escape its collection
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> ApiResult<T> {
        let response = check_status(request.send().await?, what).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn send_empty(&self, request: RequestBuilder, what: &str) -> ApiResult<()> {
        check_status(request.send().await?, what).await?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &[&str], what: &str) -> ApiResult<T> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);
        self.send(self.client.get(url), what).await
    }

    async fn post<B, T>(&self, path: &[&str], body: &B, what: &str) -> ApiResult<T>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);
        self.send(self.client.post(url).json(body), what).await
    }

    async fn put<B, T>(&self, path: &[&str], body: &B, what: &str) -> ApiResult<T>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!("PUT {}", url);
        self.send(self.client.put(url).json(body), what).await
    }

    async fn delete(&self, path: &[&str], what: &str) -> ApiResult<()> {
        let url = self.endpoint(path)?;
        debug!("DELETE {}", url);
        self.send_empty(self.client.delete(url), what).await
    }
}

async fn check_status(response: Response, what: &str) -> ApiResult<Response> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(what.to_string()));
    }
    if !status.is_success() {
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!("Failed to read error body for {}: {}", what, e);
                String::new()
            }
        };
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

#[async_trait]
impl CatalogApi for HttpCatalogClient {
    async fn create_asset(&self, request: &AssetCreateRequest) -> ApiResult<Asset> {
        self.post(&["assets"], request, "asset").await
    }

    async fn get_asset(&self, id: &str) -> ApiResult<Asset> {
        self.get(&["assets", id], &format!("asset {}", id)).await
    }

    async fn update_asset(&self, id: &str, request: &AssetUpdateRequest) -> ApiResult<Asset> {
        self.put(&["assets", id], request, &format!("asset {}", id))
            .await
    }

    async fn delete_asset(&self, id: &str) -> ApiResult<()> {
        self.delete(&["assets", id], &format!("asset {}", id)).await
    }

    async fn create_glossary_term(
        &self,
        request: &GlossaryTermRequest,
    ) -> ApiResult<GlossaryTerm> {
        self.post(&["glossary"], request, "glossary term").await
    }

    async fn get_glossary_term(&self, id: &str) -> ApiResult<GlossaryTerm> {
        self.get(&["glossary", id], &format!("glossary term {}", id))
            .await
    }

    async fn update_glossary_term(
        &self,
        id: &str,
        request: &GlossaryTermRequest,
    ) -> ApiResult<GlossaryTerm> {
        self.put(
            &["glossary", id],
            request,
            &format!("glossary term {}", id),
        )
        .await
    }

    async fn delete_glossary_term(&self, id: &str) -> ApiResult<()> {
        self.delete(&["glossary", id], &format!("glossary term {}", id))
            .await
    }

    async fn create_lineage(&self, request: &LineageEdgeRequest) -> ApiResult<LineageEdge> {
        self.post(&["lineage", "direct"], request, "lineage edge")
            .await
    }

    async fn get_lineage(&self, id: &str) -> ApiResult<LineageEdge> {
        // Assumed endpoint: the catalog documents POST and DELETE on
        // /lineage/direct but no read by id; a 404 here reads as "gone"
        self.get(&["lineage", "direct", id], &format!("lineage edge {}", id))
            .await
    }

    async fn delete_lineage(&self, id: &str) -> ApiResult<()> {
        self.delete(&["lineage", "direct", id], &format!("lineage edge {}", id))
            .await
    }
}
