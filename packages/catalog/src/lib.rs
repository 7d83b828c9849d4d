#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Data catalog downloads.
//!
//! Scenarios can take their road network (or POIs) from a dataset published
//! on a CKAN catalog such as the World Bank's. The scenario stores the
//! catalog resource id; downloading is a two-step affair: `resource_show`
//! resolves the id to the resource's file URL, then the file itself is
//! fetched.

use ram_http::{HttpError, RetryPolicy};
use serde::{Deserialize, Serialize};

/// CKAN instance used when none is configured.
pub const DEFAULT_CATALOG_URL: &str = "https://energydata.info";

/// Errors that can occur while downloading from the catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// HTTP failure after retries.
    #[error("Catalog request failed: {0}")]
    Http(#[from] HttpError),

    /// The catalog answered but did not return a usable resource.
    #[error("Catalog resource {resource_id} unavailable: {message}")]
    Resource {
        /// Resource that was requested.
        resource_id: String,
        /// What was wrong with the response.
        message: String,
    },
}

/// Scenario-specific parameters identifying a catalog resource.
///
/// Persisted as the JSON `data` of a `wbcatalog` source row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogParams {
    /// CKAN resource id.
    pub resource_id: String,
}

/// Downloads catalog resources.
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    /// Downloads the file behind a catalog resource.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the resource cannot be resolved or
    /// downloaded.
    async fn download(&self, params: &CatalogParams) -> Result<Vec<u8>, CatalogError>;
}

#[derive(Debug, Deserialize)]
struct ActionResponse {
    success: bool,
    result: Option<Resource>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    url: Option<String>,
}

/// [`CatalogClient`] for a CKAN action API.
#[derive(Debug, Clone)]
pub struct CkanClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl CkanClient {
    /// Creates a client for the CKAN instance at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        }
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Resolves a resource id to the URL of its file.
    async fn resource_url(&self, resource_id: &str) -> Result<String, CatalogError> {
        let api_url = format!("{}/api/3/action/resource_show", self.base_url);

        let response: ActionResponse = ram_http::send_json(
            || self.client.get(&api_url).query(&[("id", resource_id)]),
            &self.retry,
        )
        .await?;

        if !response.success {
            return Err(CatalogError::Resource {
                resource_id: resource_id.to_string(),
                message: response
                    .error
                    .map_or_else(|| "request unsuccessful".to_string(), |e| e.to_string()),
            });
        }

        response
            .result
            .and_then(|r| r.url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| CatalogError::Resource {
                resource_id: resource_id.to_string(),
                message: "resource has no file URL".to_string(),
            })
    }
}

impl Default for CkanClient {
    fn default() -> Self {
        Self::new(DEFAULT_CATALOG_URL)
    }
}

#[async_trait::async_trait]
impl CatalogClient for CkanClient {
    async fn download(&self, params: &CatalogParams) -> Result<Vec<u8>, CatalogError> {
        let url = self.resource_url(&params.resource_id).await?;
        log::info!(
            "Downloading catalog resource {} from {url}",
            params.resource_id
        );

        let bytes = ram_http::send_bytes(|| self.client.get(&url), &self.retry).await?;

        log::info!(
            "Downloaded catalog resource {} ({} bytes)",
            params.resource_id,
            bytes.len()
        );

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use ram_http::testing::{MockResponse, MockServer};

    use super::*;

    fn params() -> CatalogParams {
        CatalogParams {
            resource_id: "abc-123".to_string(),
        }
    }

    #[test]
    fn params_use_camel_case() {
        let params: CatalogParams = serde_json::from_str(r#"{"resourceId":"abc-123"}"#).unwrap();
        assert_eq!(params.resource_id, "abc-123");
    }

    #[tokio::test]
    async fn resolves_then_downloads() {
        let files = MockServer::start(vec![MockResponse::ok(b"<osm/>".to_vec())])
            .await
            .unwrap();
        let show = format!(
            r#"{{"success": true, "result": {{"id": "abc-123", "url": "{}"}}}}"#,
            files.url("/download/roads.osm")
        );
        let api = MockServer::start(vec![MockResponse::ok(show.into_bytes())])
            .await
            .unwrap();

        let client = CkanClient::new(api.url("/")).with_retry(RetryPolicy::immediate(0));
        let bytes = client.download(&params()).await.unwrap();
        assert_eq!(bytes, b"<osm/>");

        let api_requests = api.requests().await;
        assert_eq!(
            api_requests[0].target,
            "/api/3/action/resource_show?id=abc-123"
        );
        assert_eq!(files.requests().await[0].target, "/download/roads.osm");
    }

    #[tokio::test]
    async fn unsuccessful_action_is_a_resource_error() {
        let api = MockServer::start(vec![MockResponse::ok(
            br#"{"success": false, "error": {"message": "Not found"}}"#.to_vec(),
        )])
        .await
        .unwrap();

        let client = CkanClient::new(api.url("")).with_retry(RetryPolicy::immediate(0));
        let err = client.download(&params()).await.unwrap_err();
        assert!(matches!(err, CatalogError::Resource { .. }));
    }

    #[tokio::test]
    async fn missing_url_is_a_resource_error() {
        let api = MockServer::start(vec![MockResponse::ok(
            br#"{"success": true, "result": {"id": "abc-123"}}"#.to_vec(),
        )])
        .await
        .unwrap();

        let client = CkanClient::new(api.url("")).with_retry(RetryPolicy::immediate(0));
        let err = client.download(&params()).await.unwrap_err();
        assert!(matches!(err, CatalogError::Resource { .. }));
    }
}
