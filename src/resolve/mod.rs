//! Resource document resolution
//!
//! Provides resolvers that locate schema and DTD documents:
//! - Composite resolution over an ordered chain (first match wins)
//! - Registry resolution (existing global resources)
//! - Download through the registry server, local files and (optionally) HTTP
//! - Manual resolution of missing resources
//! - Conflict aware resolution between registry and external documents

pub mod composite;
pub mod conflict;
pub mod download;
#[cfg(feature = "http")]
pub mod http;
pub mod manual;
pub mod registry;

pub use composite::{CompositeResolver, compose};
pub use conflict::{
    ChoiceRequest, ChoiceSelector, ConflictAwareResolver, DefaultChoiceSelector, ResourceTherapist,
};
pub use download::{DownloadingResolver, FileResolver};
#[cfg(feature = "http")]
pub use http::HttpResolver;
pub use manual::ManualResolver;
pub use registry::{EntrySelector, RegistryResolver, choice_entry_selector};

use crate::document::DocumentRef;
use crate::models::{ImportChoice, ImportOption};
use crate::registry::RegistryError;

/// Result of a resolver query, `Ok(None)` when nothing matched
pub type ResolveResult = Result<Option<DocumentRef>, ResolveError>;

/// Error during resource resolution or processing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Resource not found for URI '{0}'")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Content not available for '{0}'")]
    ContentUnavailable(String),
    #[error("Invalid URI: {0}")]
    InvalidUri(String),
    #[error("Invalid resource: {0}")]
    InvalidResource(String),
    #[error("Conflicting resource skipped.")]
    ConflictSkipped,
    #[error("Invalid resource skipped ({0})")]
    InvalidResourceSkipped(String),
    #[error("Missing resource skipped.")]
    MissingResourceSkipped,
    #[error("Ambiguous resource skipped.")]
    AmbiguousResourceSkipped,
    #[error("Resource not found for dependency {0}")]
    MissingDependency(String),
    #[error("Multiple schemas found for target namespace, system identifiers are {0:?}")]
    AmbiguousMatch(Vec<String>),
    #[error("Choice '{choice}' is not allowed for option '{option}'")]
    IllegalChoice {
        option: ImportOption,
        choice: ImportChoice,
    },
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("HTTP error: {0}")]
    Http(String),
}

impl ResolveError {
    /// Whether this error is a policy decision to skip rather than a failure
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            ResolveError::ConflictSkipped
                | ResolveError::InvalidResourceSkipped(_)
                | ResolveError::MissingResourceSkipped
                | ResolveError::AmbiguousResourceSkipped
        )
    }
}

/// Locates resource documents.
///
/// Every query returns `Ok(None)` when the resolver has no match; errors are
/// reserved for failures. Resolvers must not fall back to other resolvers
/// themselves, chaining is done with [`compose`].
pub trait ResourceDocumentResolver: Send + Sync {
    fn resolve_by_uri(&self, _uri: &str) -> ResolveResult {
        Ok(None)
    }

    /// Resolve a DTD by public identifier (`uri` is the system identifier if known)
    fn resolve_by_public_id(&self, _uri: Option<&str>, _public_id: &str) -> ResolveResult {
        Ok(None)
    }

    /// Resolve a schema by target namespace (`None` for a no-namespace schema)
    fn resolve_by_target_namespace(
        &self,
        _uri: Option<&str>,
        _target_namespace: Option<&str>,
    ) -> ResolveResult {
        Ok(None)
    }
}

/// Resolver that never finds anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullResolver;

impl ResourceDocumentResolver for NullResolver {}

/// Shorten text longer than `max` characters by replacing its middle with "..."
pub(crate) fn truncate_middle(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max || max < 5 {
        return text.to_string();
    }
    let keep = max - 3;
    let head = keep.div_ceil(2);
    let tail = keep - head;
    let start: String = text.chars().take(head).collect();
    let end: String = text.chars().skip(count - tail).collect();
    format!("{}...{}", start, end)
}
