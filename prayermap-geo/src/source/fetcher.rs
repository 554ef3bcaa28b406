//! Executes a single source query against its provider.

use std::sync::Arc;
use tracing::debug;

use super::error::FetchError;
use super::http::AsyncHttpClient;
use super::query::{QueryRequest, SourceQuery};
use super::validate::{apply_scope, validate_geojson, validate_overpass};
use crate::boundary::RawFeature;

/// Fetches and validates provider payloads.
///
/// Cheap to clone; the HTTP client is shared.
pub struct SourceFetcher<C: AsyncHttpClient> {
    client: Arc<C>,
    overpass_url: String,
}

impl<C: AsyncHttpClient> Clone for SourceFetcher<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            overpass_url: self.overpass_url.clone(),
        }
    }
}

impl<C: AsyncHttpClient> SourceFetcher<C> {
    pub fn new(client: Arc<C>, overpass_url: impl Into<String>) -> Self {
        Self {
            client,
            overpass_url: overpass_url.into(),
        }
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Runs the query and validates the response shape.
    ///
    /// Dataset responses are filtered by the query scope here, since static
    /// files cannot be narrowed server-side.
    pub async fn fetch(&self, query: &SourceQuery) -> Result<Vec<RawFeature>, FetchError> {
        match &query.request {
            QueryRequest::Overpass(ql) => {
                debug!(source = %query.label, "POST Overpass query");
                let body = self
                    .client
                    .post_form(&self.overpass_url, &[("data", ql.as_str())])
                    .await?;
                validate_overpass(&body)
            }
            QueryRequest::Dataset { url } => {
                debug!(source = %query.label, "GET dataset");
                let body = self.client.get(url).await?;
                let features = validate_geojson(&body)?;
                Ok(apply_scope(features, &query.scope))
            }
        }
    }
}
