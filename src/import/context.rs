//! Import session state and resolver construction

use super::holder::ResourceHolder;
use super::input::ResourceInputSource;
use super::options::{ImportOptions, SharedOptions};
use crate::config::{ConfigError, ImportConfig};
use crate::models::ResourceType;
use crate::registry::ResourceRegistry;
use crate::resolve::{
    ChoiceSelector, ConflictAwareResolver, DownloadingResolver, EntrySelector, ManualResolver,
    NullResolver, RegistryResolver, ResolveError, ResourceDocumentResolver, ResourceTherapist,
    compose,
};
use indexmap::IndexMap;
use std::sync::Arc;

/// State of one import session.
///
/// Holds the inputs, the processed resources (by URI, in processing order),
/// the import options and the resolvers used for schemas and DTDs. Each step of
/// an import replaces these values wholesale. The options are shared with the
/// conflict aware resolvers built from the context.
pub struct ImportContext {
    input_sources: Vec<ResourceInputSource>,
    processed_resources: IndexMap<String, ResourceHolder>,
    options: SharedOptions,
    schema_resolver: Arc<dyn ResourceDocumentResolver>,
    dtd_resolver: Arc<dyn ResourceDocumentResolver>,
}

impl Default for ImportContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportContext {
    pub fn new() -> Self {
        Self {
            input_sources: Vec::new(),
            processed_resources: IndexMap::new(),
            options: SharedOptions::default(),
            schema_resolver: Arc::new(NullResolver),
            dtd_resolver: Arc::new(NullResolver),
        }
    }

    /// Create a context with the options from the given configuration
    pub fn from_config(config: &ImportConfig) -> Result<Self, ConfigError> {
        let mut context = Self::new();
        context.set_options(config.to_import_options()?);
        Ok(context)
    }

    /// Set the resolver for a type, or for all types when `None`
    pub fn set_resolver_for_type(
        &mut self,
        resource_type: Option<ResourceType>,
        resolver: Arc<dyn ResourceDocumentResolver>,
    ) {
        match resource_type {
            Some(ResourceType::XmlSchema) => self.schema_resolver = resolver,
            Some(ResourceType::Dtd) => self.dtd_resolver = resolver,
            None => {
                self.schema_resolver = resolver.clone();
                self.dtd_resolver = resolver;
            }
        }
    }

    /// The resolver for a type, untyped resources use the DTD resolver
    pub fn resolver_for_type(
        &self,
        resource_type: Option<ResourceType>,
    ) -> Arc<dyn ResourceDocumentResolver> {
        match resource_type {
            Some(ResourceType::XmlSchema) => self.schema_resolver.clone(),
            _ => self.dtd_resolver.clone(),
        }
    }

    pub fn input_sources(&self) -> &[ResourceInputSource] {
        &self.input_sources
    }

    pub fn set_input_sources(&mut self, input_sources: impl IntoIterator<Item = ResourceInputSource>) {
        self.input_sources = input_sources.into_iter().collect();
    }

    pub fn processed_resources(&self) -> &IndexMap<String, ResourceHolder> {
        &self.processed_resources
    }

    pub fn set_processed_resources(&mut self, processed: IndexMap<String, ResourceHolder>) {
        self.processed_resources = processed;
    }

    /// Copy of the current options
    pub fn options(&self) -> ImportOptions {
        self.options.snapshot()
    }

    /// Replace the options, resolvers already built see the new options
    pub fn set_options(&mut self, options: ImportOptions) {
        self.options.replace(options);
    }

    /// Handle to the session options, e.g. for a selector that remembers
    /// a choice for the rest of the import
    pub fn shared_options(&self) -> SharedOptions {
        self.options.clone()
    }

    pub fn new_file_input_source(
        &self,
        path: impl AsRef<std::path::Path>,
    ) -> Result<ResourceInputSource, ResolveError> {
        ResourceInputSource::from_file(path, self.resolver_for_type(None))
    }

    pub fn new_uri_input_source(
        &self,
        uri: impl Into<String>,
        resource_type: Option<ResourceType>,
    ) -> Result<ResourceInputSource, ResolveError> {
        ResourceInputSource::from_uri(uri, resource_type, self.resolver_for_type(resource_type))
    }

    pub fn new_content_input_source(
        &self,
        uri: impl Into<String>,
        content: impl Into<String>,
        resource_type: Option<ResourceType>,
    ) -> Result<ResourceInputSource, ResolveError> {
        ResourceInputSource::with_content(uri, content, resource_type)
    }

    /// Build a resolver for resources in the registry
    pub fn build_resource_entry_resolver(
        registry: Arc<dyn ResourceRegistry>,
        fail_on_duplicate_namespace: bool,
        entry_selector: Option<Arc<dyn EntrySelector>>,
    ) -> Arc<dyn ResourceDocumentResolver> {
        let mut resolver =
            RegistryResolver::new(registry).fail_on_duplicate_namespace(fail_on_duplicate_namespace);
        if let Some(selector) = entry_selector {
            resolver = resolver.with_entry_selector(selector);
        }
        Arc::new(resolver)
    }

    /// Build a resolver downloading through the registry server
    pub fn build_downloading_resolver(
        registry: Arc<dyn ResourceRegistry>,
        config: &ImportConfig,
    ) -> Arc<dyn ResourceDocumentResolver> {
        Arc::new(
            DownloadingResolver::new(registry).with_schemes(config.download.schemes.iter().cloned()),
        )
    }

    /// Build a resolver asking for missing resources
    pub fn build_manual_resolver(
        therapist: Arc<dyn ResourceTherapist>,
        selector: Arc<dyn ChoiceSelector>,
    ) -> Arc<dyn ResourceDocumentResolver> {
        Arc::new(ManualResolver::new(therapist, selector))
    }

    /// Build a resolver that settles conflicts between registry resources and
    /// those found by the external resolvers, using this context's options.
    pub fn build_smart_resource_entry_resolver(
        &self,
        resource_type: ResourceType,
        registry: Arc<dyn ResourceRegistry>,
        external_resolvers: Vec<Arc<dyn ResourceDocumentResolver>>,
        selector: Arc<dyn ChoiceSelector>,
        entry_selector: Option<Arc<dyn EntrySelector>>,
        therapist: Option<Arc<dyn ResourceTherapist>>,
    ) -> Arc<dyn ResourceDocumentResolver> {
        let internal = Self::build_resource_entry_resolver(registry, false, entry_selector);
        let mut resolver = ConflictAwareResolver::new(
            internal,
            compose(external_resolvers),
            self.options.clone(),
            selector,
        )
        .for_type(resource_type);
        if let Some(therapist) = therapist {
            resolver = resolver.with_therapist(therapist);
        }
        Arc::new(resolver)
    }
}
