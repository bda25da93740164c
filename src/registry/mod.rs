//! Resource registry abstraction
//!
//! The registry is the server-side store of global resources. The import core
//! only needs header lookups, entry loading, server-side download of remote
//! resources and a bulk save.

pub mod memory;

pub use memory::InMemoryRegistry;

use crate::models::{ResourceEntry, ResourceEntryHeader};
use uuid::Uuid;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Lookup failed
    #[error("Find failed: {0}")]
    FindFailed(String),

    /// Server-side resolution of a remote resource failed
    #[error("Resolve failed: {0}")]
    ResolveFailed(String),

    /// Saving entries failed
    #[error("Save failed: {0}")]
    SaveFailed(String),
}

/// Store of global resources
pub trait ResourceRegistry: Send + Sync {
    /// Find the header for the resource with the given URI (URIs are unique)
    fn find_header_by_uri(&self, uri: &str) -> Result<Option<ResourceEntryHeader>, RegistryError>;

    /// Find headers of DTDs with the given public identifier
    fn find_headers_by_public_id(
        &self,
        public_id: &str,
    ) -> Result<Vec<ResourceEntryHeader>, RegistryError>;

    /// Find headers of schemas with the given target namespace (`None` for no namespace)
    fn find_headers_by_target_namespace(
        &self,
        target_namespace: Option<&str>,
    ) -> Result<Vec<ResourceEntryHeader>, RegistryError>;

    /// Load a full entry
    fn find_entry(&self, id: Uuid) -> Result<Option<ResourceEntry>, RegistryError>;

    /// Download a remote resource through the registry server
    fn resolve_resource(&self, uri: &str) -> Result<String, RegistryError>;

    /// Create or update the given entries
    fn save_entries(&self, entries: Vec<ResourceEntry>) -> Result<(), RegistryError>;
}
