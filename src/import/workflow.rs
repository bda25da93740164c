//! Headless import workflows
//!
//! Wires resolvers, processing and saving together for importing the
//! dependencies of a resource into the registry, and for resolving resources
//! against what the registry already holds.

use super::context::ImportContext;
use super::holder::ResourceHolder;
use super::processor::{process_resources, save_resources};
use crate::config::ImportConfig;
use crate::document::{DocumentRef, UriResourceDocument};
use crate::models::ResourceType;
use crate::registry::ResourceRegistry;
use crate::resolve::{
    ChoiceSelector, DefaultChoiceSelector, EntrySelector, FileResolver, ResolveError,
    ResourceDocumentResolver, ResourceTherapist,
};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Collaborators used when importing dependencies
pub struct DependencyImport {
    registry: Arc<dyn ResourceRegistry>,
    additional_resolvers: Vec<Arc<dyn ResourceDocumentResolver>>,
    config: ImportConfig,
    selector: Arc<dyn ChoiceSelector>,
    entry_selector: Option<Arc<dyn EntrySelector>>,
    therapist: Option<Arc<dyn ResourceTherapist>>,
}

impl DependencyImport {
    /// Import into the registry, taking default choices
    pub fn new(registry: Arc<dyn ResourceRegistry>) -> Self {
        Self {
            registry,
            additional_resolvers: Vec::new(),
            config: ImportConfig::default(),
            selector: Arc::new(DefaultChoiceSelector),
            entry_selector: None,
            therapist: None,
        }
    }

    /// Resolvers tried before local files and downloads
    pub fn with_resolvers(mut self, resolvers: Vec<Arc<dyn ResourceDocumentResolver>>) -> Self {
        self.additional_resolvers = resolvers;
        self
    }

    /// Configuration for downloads
    pub fn with_config(mut self, config: ImportConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_selector(mut self, selector: Arc<dyn ChoiceSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_entry_selector(mut self, entry_selector: Arc<dyn EntrySelector>) -> Self {
        self.entry_selector = Some(entry_selector);
        self
    }

    pub fn with_therapist(mut self, therapist: Arc<dyn ResourceTherapist>) -> Self {
        self.therapist = Some(therapist);
        self
    }

    /// External resolvers in the order they are tried
    fn external_resolvers(&self) -> Vec<Arc<dyn ResourceDocumentResolver>> {
        let therapist: Arc<dyn ResourceTherapist> = match &self.therapist {
            Some(therapist) => therapist.clone(),
            None => Arc::new(
                |_: Option<ResourceType>,
                 _: &str,
                 _: Option<&DocumentRef>,
                 _: Option<&str>|
                 -> Option<DocumentRef> { None },
            ),
        };

        let mut resolvers = self.additional_resolvers.clone();
        resolvers.push(Arc::new(FileResolver));
        resolvers.push(ImportContext::build_downloading_resolver(
            self.registry.clone(),
            &self.config,
        ));
        resolvers.push(ImportContext::build_manual_resolver(
            therapist,
            self.selector.clone(),
        ));
        resolvers
    }
}

/// Result of importing the dependencies of a resource
#[derive(Debug)]
pub struct DependencyImportOutcome {
    /// The imported resource, references point at the resolved dependencies
    pub resource: Option<ResourceHolder>,
    /// The dependencies, in processing order
    pub dependencies: Vec<ResourceHolder>,
    /// Number of registry entries created or updated
    pub saved: usize,
}

/// Import the dependencies of a resource into the registry.
///
/// Schemas and DTDs are resolved through conflict aware resolvers over the
/// registry and the external resolvers, using the context options. Nothing is
/// saved if any resource fails, and the resource itself is never saved.
pub fn import_dependencies(
    context: &mut ImportContext,
    uri: &str,
    content: &str,
    resource_type: Option<ResourceType>,
    import: &DependencyImport,
) -> Result<DependencyImportOutcome, ResolveError> {
    let external = import.external_resolvers();
    for resource_type in ResourceType::ALL {
        let resolver = context.build_smart_resource_entry_resolver(
            resource_type,
            import.registry.clone(),
            external.clone(),
            import.selector.clone(),
            import.entry_selector.clone(),
            import.therapist.clone(),
        );
        context.set_resolver_for_type(Some(resource_type), resolver);
    }

    let source = context.new_content_input_source(uri, content, resource_type)?;
    let mut processed = process_resources(context, std::slice::from_ref(&source));
    context.set_input_sources([source.clone()]);

    if let Some(error) = processed.values().find_map(ResourceHolder::error).cloned() {
        warn!("Import of dependencies for '{}' failed: {}", uri, error);
        context.set_processed_resources(processed);
        return Err(error);
    }

    let resource = processed.shift_remove(source.uri());
    let saved = save_resources(import.registry.as_ref(), processed.values())?;
    info!("Imported {} dependencies of '{}'", processed.len(), uri);

    let dependencies = processed.values().cloned().collect();
    context.set_processed_resources(processed);
    Ok(DependencyImportOutcome {
        resource,
        dependencies,
        saved,
    })
}

/// Resolve resources and their dependencies from the registry alone.
///
/// A namespace matching several registry resources fails the resource that
/// references it. Invalid URIs are returned as failed resources.
pub fn resolve_dependencies<'u>(
    registry: Arc<dyn ResourceRegistry>,
    uris: impl IntoIterator<Item = &'u str>,
) -> IndexMap<String, ResourceHolder> {
    let mut context = ImportContext::new();
    context.set_resolver_for_type(
        None,
        ImportContext::build_resource_entry_resolver(registry, true, None),
    );

    let mut sources = Vec::new();
    let mut invalid = IndexMap::new();
    for uri in uris {
        match context.new_uri_input_source(uri, None) {
            Ok(source) => sources.push(source),
            Err(error) => {
                warn!("Error processing resource '{}': {}", uri, error);
                let document = UriResourceDocument::shared(uri, None, None);
                let holder = match ResourceType::from_path_suffix(uri) {
                    Some(ResourceType::Dtd) => ResourceHolder::dtd(document, None, Some(error)),
                    _ => ResourceHolder::schema(document, None, Some(error)),
                };
                invalid.insert(uri.to_string(), holder);
            }
        }
    }

    let mut processed = process_resources(&context, &sources);
    processed.extend(invalid);
    processed
}
