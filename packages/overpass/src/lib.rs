#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Road network extraction from the `OpenStreetMap` Overpass API.
//!
//! The scenario setup asks for "every routable way inside the study area"
//! and stores the raw OSM XML the API returns. The study area is the
//! bounding box of the project's admin boundaries, see [`fc_bbox`].

mod bbox;
mod query;

use ram_database_models::BoundingBox;
use ram_http::{HttpError, RetryPolicy};

pub use bbox::fc_bbox;
pub use query::{HIGHWAY_TYPES, road_network_query};

/// Public Overpass endpoint used when none is configured.
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Server-side timeout requested in the query, in seconds.
const QUERY_TIMEOUT_SECS: u32 = 900;

/// Errors that can occur while talking to Overpass.
#[derive(Debug, thiserror::Error)]
pub enum OverpassError {
    /// HTTP failure after retries.
    #[error("Overpass request failed: {0}")]
    Http(#[from] HttpError),

    /// The query ran but Overpass aborted it (timeout, out of memory).
    /// Overpass reports this as a `<remark>` in an otherwise successful
    /// response.
    #[error("Overpass aborted the query: {message}")]
    Aborted {
        /// Text of the remark.
        message: String,
    },

    /// The boundary feature collection has no usable geometry.
    #[error("Feature collection has no geometry to derive a bounding box from")]
    EmptyBounds,
}

/// Source of raw road network data for a bounding box.
#[async_trait::async_trait]
pub trait MapDataClient: Send + Sync {
    /// Fetches every routable way (and its nodes) inside `bbox` as OSM XML.
    ///
    /// # Errors
    ///
    /// Returns [`OverpassError`] if the upstream service fails.
    async fn fetch_road_network(&self, bbox: &BoundingBox) -> Result<Vec<u8>, OverpassError>;
}

/// [`MapDataClient`] backed by an Overpass API interpreter endpoint.
#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: reqwest::Client,
    url: String,
    retry: RetryPolicy,
}

impl OverpassClient {
    /// Creates a client for the interpreter at `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for OverpassClient {
    fn default() -> Self {
        Self::new(DEFAULT_OVERPASS_URL)
    }
}

#[async_trait::async_trait]
impl MapDataClient for OverpassClient {
    async fn fetch_road_network(&self, bbox: &BoundingBox) -> Result<Vec<u8>, OverpassError> {
        let query = road_network_query(bbox, QUERY_TIMEOUT_SECS);
        log::info!("Querying Overpass for road network in {bbox}");
        log::debug!("Overpass query:\n{query}");

        let body = ram_http::send_bytes(
            || self.client.post(&self.url).body(query.clone()),
            &self.retry,
        )
        .await?;

        if let Some(message) = runtime_remark(&body) {
            return Err(OverpassError::Aborted { message });
        }

        #[allow(clippy::cast_precision_loss)]
        let mb = body.len() as f64 / 1_048_576.0;
        log::info!("Overpass returned {mb:.1} MB for {bbox}");

        Ok(body)
    }
}

/// Extracts an Overpass runtime error remark, if any.
///
/// Only the tail of the document is scanned; Overpass appends the remark
/// after whatever partial output it produced.
fn runtime_remark(body: &[u8]) -> Option<String> {
    let tail_start = body.len().saturating_sub(4096);
    let tail = String::from_utf8_lossy(&body[tail_start..]);

    let start = tail.find("<remark>")? + "<remark>".len();
    let end = start + tail[start..].find("</remark>")?;
    let message = tail[start..end].trim();

    message
        .contains("runtime error")
        .then(|| message.to_string())
}
