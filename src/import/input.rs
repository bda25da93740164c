//! Resource input sources

use crate::document::{DocumentRef, UriResourceDocument, absolute_uri};
use crate::models::ResourceType;
use crate::resolve::{ResolveError, ResourceDocumentResolver};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Where an input comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InputLocation {
    File(PathBuf),
    Uri(String),
}

/// A candidate resource for import, not yet fetched or processed
#[derive(Clone)]
pub struct ResourceInputSource {
    file: Option<PathBuf>,
    uri: String,
    content: Option<String>,
    resource_type: Option<ResourceType>,
    resolver: Option<Arc<dyn ResourceDocumentResolver>>,
}

impl ResourceInputSource {
    /// Create an input source.
    ///
    /// Exactly one of content or a resolver to fetch the content is required.
    pub fn new(
        location: InputLocation,
        content: Option<String>,
        resource_type: Option<ResourceType>,
        resolver: Option<Arc<dyn ResourceDocumentResolver>>,
    ) -> Result<Self, ResolveError> {
        match (&content, &resolver) {
            (None, None) => {
                return Err(ResolveError::InvalidResource(
                    "content or resolver is required.".to_string(),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(ResolveError::InvalidResource(
                    "content and resolver are exclusive.".to_string(),
                ));
            }
            _ => {}
        }

        let (file, uri) = match location {
            InputLocation::File(path) => {
                let path = std::path::absolute(&path).map_err(|e| {
                    ResolveError::Io(format!("Invalid path '{}': {}", path.display(), e))
                })?;
                let uri = Url::from_file_path(&path).map_err(|_| {
                    ResolveError::InvalidUri(format!("Invalid path '{}'", path.display()))
                })?;
                (Some(path), uri.to_string())
            }
            InputLocation::Uri(uri) => (None, absolute_uri(&uri)?),
        };

        Ok(Self {
            file,
            uri,
            content,
            resource_type,
            resolver,
        })
    }

    /// Input for a local file, read through the resolver
    pub fn from_file(
        path: impl AsRef<Path>,
        resolver: Arc<dyn ResourceDocumentResolver>,
    ) -> Result<Self, ResolveError> {
        Self::new(
            InputLocation::File(path.as_ref().to_path_buf()),
            None,
            None,
            Some(resolver),
        )
    }

    /// Input for a URI, fetched through the resolver
    pub fn from_uri(
        uri: impl Into<String>,
        resource_type: Option<ResourceType>,
        resolver: Arc<dyn ResourceDocumentResolver>,
    ) -> Result<Self, ResolveError> {
        Self::new(
            InputLocation::Uri(uri.into()),
            None,
            resource_type,
            Some(resolver),
        )
    }

    /// Input with known content
    pub fn with_content(
        uri: impl Into<String>,
        content: impl Into<String>,
        resource_type: Option<ResourceType>,
    ) -> Result<Self, ResolveError> {
        Self::new(
            InputLocation::Uri(uri.into()),
            Some(content.into()),
            resource_type,
            None,
        )
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn uri_string(&self) -> String {
        self.uri.clone()
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// The resource type, if known
    pub fn resource_type(&self) -> Option<ResourceType> {
        self.resource_type
    }

    /// Length in bytes, known only for files
    pub fn length(&self) -> Option<u64> {
        self.file
            .as_ref()
            .and_then(|path| std::fs::metadata(path).ok())
            .map(|metadata| metadata.len())
    }

    /// Get the document for this input, resolving it if there is no content
    pub fn as_resource_document(&self) -> Result<DocumentRef, ResolveError> {
        match (&self.content, &self.resolver) {
            (Some(content), _) => Ok(UriResourceDocument::shared(
                self.uri.clone(),
                Some(content.clone()),
                None,
            )),
            (None, Some(resolver)) => resolver
                .resolve_by_uri(&self.uri)?
                .ok_or_else(|| ResolveError::NotFound(self.uri.clone())),
            (None, None) => Err(ResolveError::ContentUnavailable(self.uri.clone())),
        }
    }
}

impl PartialEq for ResourceInputSource {
    fn eq(&self, other: &Self) -> bool {
        self.file == other.file && self.uri == other.uri
    }
}

impl Eq for ResourceInputSource {}

impl Hash for ResourceInputSource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.file.hash(state);
        self.uri.hash(state);
    }
}

impl std::fmt::Debug for ResourceInputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceInputSource")
            .field("file", &self.file)
            .field("uri", &self.uri)
            .field("resource_type", &self.resource_type)
            .field("has_content", &self.content.is_some())
            .finish()
    }
}
