//! Direct HTTP resolution (feature `http`)

use super::{ResolveError, ResolveResult, ResourceDocumentResolver};
use crate::config::ImportConfig;
use crate::document::UriResourceDocument;
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::debug;

/// Resolver fetching http and https URIs with a blocking client
pub struct HttpResolver {
    client: Client,
}

impl HttpResolver {
    pub fn new(timeout: Duration) -> Result<Self, ResolveError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResolveError::Http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Create a resolver using the configured download timeout
    pub fn from_config(config: &ImportConfig) -> Result<Self, ResolveError> {
        Self::new(Duration::from_secs(config.download.timeout_secs))
    }
}

impl ResourceDocumentResolver for HttpResolver {
    fn resolve_by_uri(&self, uri: &str) -> ResolveResult {
        if !(uri.starts_with("http://") || uri.starts_with("https://")) {
            return Ok(None);
        }

        debug!("Fetching {}", uri);
        let response = self
            .client
            .get(uri)
            .send()
            .map_err(|e| ResolveError::Http(format!("Request to '{}' failed: {}", uri, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Http(format!(
                "Request to '{}' failed with status {}",
                uri, status
            )));
        }

        let content = response
            .text()
            .map_err(|e| ResolveError::Http(format!("Failed to read '{}': {}", uri, e)))?;
        Ok(Some(UriResourceDocument::shared(uri, Some(content), None)))
    }
}
