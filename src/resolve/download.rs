//! Resolvers fetching resources by URI
//!
//! - [`DownloadingResolver`] downloads through the registry server
//! - [`FileResolver`] reads `file:` URIs from the local file system

use super::{ResolveError, ResolveResult, ResourceDocumentResolver};
use crate::document::UriResourceDocument;
use crate::registry::ResourceRegistry;
use std::io::ErrorKind;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Schemes downloaded when none are configured
pub const DEFAULT_SCHEMES: &[&str] = &["http", "https"];

fn scheme_of(uri: &str) -> Result<String, ResolveError> {
    Url::parse(uri)
        .map(|url| url.scheme().to_string())
        .map_err(|e| ResolveError::InvalidUri(format!("{}: {}", uri, e)))
}

/// Resolver downloading remote resources through the registry
pub struct DownloadingResolver {
    registry: Arc<dyn ResourceRegistry>,
    schemes: Vec<String>,
}

impl DownloadingResolver {
    pub fn new(registry: Arc<dyn ResourceRegistry>) -> Self {
        Self {
            registry,
            schemes: DEFAULT_SCHEMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the URI schemes that are downloaded
    pub fn with_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schemes = schemes
            .into_iter()
            .map(|s| s.into().to_ascii_lowercase())
            .collect();
        self
    }
}

impl ResourceDocumentResolver for DownloadingResolver {
    fn resolve_by_uri(&self, uri: &str) -> ResolveResult {
        let scheme = scheme_of(uri)?;
        if !self.schemes.contains(&scheme) {
            return Ok(None);
        }
        debug!("Downloading resource {}", uri);
        let content = self.registry.resolve_resource(uri)?;
        Ok(Some(UriResourceDocument::shared(uri, Some(content), None)))
    }
}

/// Resolver for local files
#[derive(Debug, Default, Clone, Copy)]
pub struct FileResolver;

impl ResourceDocumentResolver for FileResolver {
    fn resolve_by_uri(&self, uri: &str) -> ResolveResult {
        let url = Url::parse(uri).map_err(|e| ResolveError::InvalidUri(format!("{}: {}", uri, e)))?;
        if url.scheme() != "file" {
            return Ok(None);
        }
        let path = url
            .to_file_path()
            .map_err(|_| ResolveError::InvalidUri(format!("Not a file path: {}", uri)))?;

        match std::fs::read_to_string(&path) {
            Ok(content) => {
                debug!("Read resource file {}", path.display());
                Ok(Some(UriResourceDocument::shared(uri, Some(content), None)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ResolveError::Io(format!(
                "Error reading '{}': {}",
                path.display(),
                e
            ))),
        }
    }
}
