//! Resource documents
//!
//! A resource document is a URI addressed schema or DTD whose content may
//! already be in memory or be fetched on first access.

pub mod registry;

pub use registry::RegistryResourceDocument;

use crate::resolve::{ResolveError, ResourceDocumentResolver};
use std::sync::Arc;
use url::Url;

/// Shared handle to a resource document
pub type DocumentRef = Arc<dyn ResourceDocument>;

/// A URI addressed document with (possibly lazy) text content
pub trait ResourceDocument: Send + Sync + std::fmt::Debug {
    fn uri(&self) -> String;

    /// Get the content, fetching it if required
    fn content(&self) -> Result<String, ResolveError>;

    /// Is the content available without fetching
    fn available(&self) -> bool;

    fn exists(&self) -> bool {
        true
    }

    /// Resolve a path relative to this document
    fn relative(
        &self,
        path: &str,
        resolver: Option<&dyn ResourceDocumentResolver>,
    ) -> Result<DocumentRef, ResolveError> {
        let resolver = resolver.ok_or_else(|| {
            ResolveError::Io(format!(
                "Unable to resolve path '{}', no resolver available.",
                path
            ))
        })?;
        resolve_relative(&self.uri(), path, resolver)
    }

    /// Access the registry backed form of this document, if it is one
    fn as_registry(&self) -> Option<&RegistryResourceDocument> {
        None
    }
}

fn resolve_relative(
    base: &str,
    path: &str,
    resolver: &dyn ResourceDocumentResolver,
) -> Result<DocumentRef, ResolveError> {
    let resolved_uri = resolve_uri(Some(base), path)?;
    resolver
        .resolve_by_uri(&resolved_uri)?
        .ok_or(ResolveError::NotFound(resolved_uri))
}

/// Resolve a (possibly relative) URI reference against an optional base
///
/// # Example
///
/// ```rust
/// use xml_resource_import::document::resolve_uri;
///
/// let uri = resolve_uri(Some("http://host/schemas/a.xsd"), "../b.xsd").unwrap();
/// assert_eq!(uri, "http://host/b.xsd");
/// assert!(resolve_uri(None, "b.xsd").is_err());
/// ```
pub fn resolve_uri(base: Option<&str>, reference: &str) -> Result<String, ResolveError> {
    let error = || {
        ResolveError::InvalidUri(format!(
            "Error resolving uri '{}' against '{}'",
            reference,
            base.unwrap_or("")
        ))
    };
    match base {
        Some(base) => {
            let base = Url::parse(base).map_err(|_| error())?;
            if reference.is_empty() {
                Ok(base.to_string())
            } else {
                base.join(reference).map(String::from).map_err(|_| error())
            }
        }
        None => Url::parse(reference).map(String::from).map_err(|_| error()),
    }
}

/// Express a URI relative to a base.
///
/// Only URIs in the directory of the base (or below it) are made relative,
/// anything else is returned unchanged.
///
/// # Example
///
/// ```rust
/// use xml_resource_import::document::relative_uri;
///
/// assert_eq!(relative_uri("http://host/a/x.xsd", "http://host/a/types/y.xsd"), "types/y.xsd");
/// assert_eq!(relative_uri("http://host/a/x.xsd", "http://host/y.xsd"), "http://host/y.xsd");
/// ```
pub fn relative_uri(base: &str, uri: &str) -> String {
    let relative = match (Url::parse(base), Url::parse(uri)) {
        (Ok(base), Ok(target)) => base.make_relative(&target),
        _ => None,
    };
    match relative {
        Some(relative) if !relative.is_empty() && !relative.starts_with("../") => relative,
        _ => uri.to_string(),
    }
}

/// Check that a string is an absolute URI and return its normal form
pub fn absolute_uri(uri: &str) -> Result<String, ResolveError> {
    Url::parse(uri)
        .map(String::from)
        .map_err(|e| ResolveError::InvalidUri(format!("{}: {}", uri, e)))
}

/// Document identified by URI, with inline content or none
pub struct UriResourceDocument {
    uri: String,
    content: Option<String>,
    resolver: Option<Arc<dyn ResourceDocumentResolver>>,
}

impl UriResourceDocument {
    /// Create a document, the resolver (if any) is used for relative references
    pub fn new(
        uri: impl Into<String>,
        content: Option<String>,
        resolver: Option<Arc<dyn ResourceDocumentResolver>>,
    ) -> Self {
        Self {
            uri: uri.into(),
            content,
            resolver,
        }
    }

    pub fn shared(
        uri: impl Into<String>,
        content: Option<String>,
        resolver: Option<Arc<dyn ResourceDocumentResolver>>,
    ) -> DocumentRef {
        Arc::new(Self::new(uri, content, resolver))
    }
}

impl std::fmt::Debug for UriResourceDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UriResourceDocument")
            .field("uri", &self.uri)
            .field("available", &self.content.is_some())
            .finish()
    }
}

impl ResourceDocument for UriResourceDocument {
    fn uri(&self) -> String {
        self.uri.clone()
    }

    fn content(&self) -> Result<String, ResolveError> {
        self.content
            .clone()
            .ok_or_else(|| ResolveError::ContentUnavailable(self.uri.clone()))
    }

    fn available(&self) -> bool {
        self.content.is_some()
    }

    fn relative(
        &self,
        path: &str,
        resolver: Option<&dyn ResourceDocumentResolver>,
    ) -> Result<DocumentRef, ResolveError> {
        match resolver.or(self.resolver.as_deref()) {
            Some(resolver) => resolve_relative(&self.uri, path, resolver),
            None => Err(ResolveError::Io(format!(
                "Unable to resolve path '{}', no resolver available.",
                path
            ))),
        }
    }
}
