//! XML Resource Import - global schema and DTD import for a resource registry
//!
//! Provides unified interfaces for:
//! - Resource documents (in memory, lazily fetched, registry backed)
//! - Resolution of schemas and DTDs by URI, public identifier and namespace
//! - Conflict handling between registry resources and external ones
//! - Import sessions: processing inputs and their dependencies
//! - Dependency and dependant reports
//! - Configuration via `.resource-import.toml`

pub mod config;
pub mod document;
pub mod import;
pub mod models;
pub mod registry;
pub mod resolve;

// Re-export commonly used types
pub use config::{ConfigError, ImportConfig};
pub use document::{DocumentRef, RegistryResourceDocument, ResourceDocument, UriResourceDocument};
pub use import::{
    DependencyImport, DependencyImportOutcome, DependencyProcessing, HolderAction, ImportContext,
    ImportOptions, ResourceHolder, ResourceInputSource, SharedOptions, get_dependants,
    get_dependencies, import_dependencies, process_resources, resolve_dependencies,
    save_resources,
};
pub use registry::{InMemoryRegistry, RegistryError, ResourceRegistry};
pub use resolve::{
    ChoiceRequest, ChoiceSelector, CompositeResolver, ConflictAwareResolver, ResolveError,
    ResolveResult, ResourceDocumentResolver, ResourceTherapist,
};

// Re-export models
pub use models::enums::*;
pub use models::{DependencySummary, ResourceEntry, ResourceEntryHeader};
