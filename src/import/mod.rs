//! Global resource import
//!
//! Provides the import session and its processing:
//! - Input sources (files, URIs, inline content)
//! - Import options (configured conflict choices)
//! - Resource processing (fetch, classify, scan and resolve references)
//! - Dependency and dependant reports
//! - Saving processed resources to the registry
//! - Headless workflows importing or resolving dependencies

pub mod context;
pub mod dependencies;
pub mod dtd;
pub mod holder;
pub mod input;
pub mod options;
pub mod processor;
pub mod schema;
pub mod workflow;

pub use context::ImportContext;
pub use dependencies::{DependencyGraph, get_dependants, get_dependencies};
pub use holder::{HolderAction, ResourceHolder};
pub use input::{InputLocation, ResourceInputSource};
pub use options::{ImportOptions, SharedOptions};
pub use processor::{DependencyProcessing, ResourceProcessor, process_resources, save_resources};
pub use schema::{SchemaInfo, SchemaReference, inspect_schema};
pub use workflow::{
    DependencyImport, DependencyImportOutcome, import_dependencies, resolve_dependencies,
};
