//! Resource processing
//!
//! Fetches and classifies each input, scans it for the schemas and DTDs it
//! references, resolves those through the context resolvers and processes them
//! in turn. Every resource ends up as a [`ResourceHolder`], failed resources
//! carry their error. References of a schema are updated to point at the
//! location each dependency was resolved to.

use super::context::ImportContext;
use super::dtd::{EntityReference, external_entities};
use super::holder::ResourceHolder;
use super::input::ResourceInputSource;
use super::schema::{
    SchemaReference, inspect_schema, is_schema, update_doctype_system_id, update_schema_location,
};
use crate::document::{DocumentRef, UriResourceDocument, relative_uri, resolve_uri};
use crate::models::{ResourceEntry, ResourceType};
use crate::registry::{RegistryError, ResourceRegistry};
use crate::resolve::ResolveError;
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use url::Url;

/// How the references of a resource are processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyProcessing {
    /// Process references, failures fail the resource
    On,
    /// Do not process references
    Off,
    /// Process references if possible, failures are ignored
    Auto,
}

impl DependencyProcessing {
    pub fn is_process(&self) -> bool {
        matches!(self, DependencyProcessing::On | DependencyProcessing::Auto)
    }

    pub fn suppresses_errors(&self) -> bool {
        matches!(self, DependencyProcessing::Auto)
    }
}

/// A reference found while processing a resource
enum Dependency {
    /// Already resolved and processed, (reference, resolved URI)
    Processed(Option<String>, String),
    Schema(SchemaReference),
}

/// Processes input sources into resource holders
pub struct ResourceProcessor<'a> {
    context: &'a ImportContext,
    processed: IndexMap<String, ResourceHolder>,
    /// Documents fetched per input URI, shared between passes
    resolved: HashMap<String, DocumentRef>,
}

impl<'a> ResourceProcessor<'a> {
    pub fn new(context: &'a ImportContext) -> Self {
        Self {
            context,
            processed: IndexMap::new(),
            resolved: HashMap::new(),
        }
    }

    /// Process the inputs, returning the processed resources by URI.
    ///
    /// Schemas (and the DTDs they use) are processed first. Remaining DTD
    /// inputs are then processed, their own references only where possible
    /// since a DTD fragment may not resolve on its own.
    pub fn process(mut self, sources: &[ResourceInputSource]) -> IndexMap<String, ResourceHolder> {
        for source in sources {
            self.process_input(source, ResourceType::XmlSchema, DependencyProcessing::On);
        }
        for source in sources {
            self.process_input(source, ResourceType::Dtd, DependencyProcessing::Auto);
        }

        let failed = self.processed.values().filter(|h| h.is_error()).count();
        info!(
            "Processed {} resources from {} inputs ({} failed)",
            self.processed.len(),
            sources.len(),
            failed
        );
        self.processed
    }

    fn process_input(
        &mut self,
        source: &ResourceInputSource,
        type_match: ResourceType,
        processing: DependencyProcessing,
    ) {
        let cached = self.resolved.get(source.uri()).cloned();
        let document = match cached {
            Some(document) => Ok(document),
            None => source.as_resource_document().inspect(|document| {
                self.resolved.insert(source.uri_string(), document.clone());
            }),
        };

        let result = match &document {
            Ok(document) => self.process_document(
                document,
                source.resource_type(),
                Some(type_match),
                None,
                processing,
            ),
            Err(error) => Err(error.clone()),
        };

        if let Err(error) = result {
            debug!("Failed to process '{}': {}", source.uri(), error);
            self.record_error(source.uri(), document.ok().as_ref(), error);
        }
    }

    /// Record a failed input, typed from its document or URI
    fn record_error(&mut self, uri: &str, document: Option<&DocumentRef>, error: ResolveError) {
        let content = document
            .filter(|d| d.available())
            .and_then(|d| d.content().ok());
        let target_namespace = content
            .as_deref()
            .and_then(|c| inspect_schema(c).ok())
            .and_then(|info| info.target_namespace);

        let resource_type = match (document, content.as_deref()) {
            (Some(document), content) => detect_type(&document.uri(), content, None),
            (None, _) => type_from_uri(uri).unwrap_or(ResourceType::XmlSchema),
        };

        let document = document
            .cloned()
            .unwrap_or_else(|| UriResourceDocument::shared(uri, None, None));
        let holder = match resource_type {
            ResourceType::XmlSchema => ResourceHolder::schema(document, target_namespace, Some(error)),
            ResourceType::Dtd => ResourceHolder::dtd(document, None, Some(error)),
        };
        self.processed.insert(uri.to_string(), holder);
    }

    /// Process a document and (depending on `processing`) its dependencies.
    ///
    /// A document is processed once, processing an already failed document
    /// fails again with the recorded error.
    fn process_document(
        &mut self,
        document: &DocumentRef,
        resource_type: Option<ResourceType>,
        type_match: Option<ResourceType>,
        key: Option<String>,
        processing: DependencyProcessing,
    ) -> Result<(), ResolveError> {
        let uri = document.uri();
        if let Some(existing) = self.processed.get(&uri) {
            return match existing.error() {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            };
        }

        debug!("Processing resource '{}'", uri);
        let result = self.process_new(document, &uri, resource_type, type_match, key, processing);
        if result.is_err() {
            self.processed.shift_remove(&uri);
        }
        result
    }

    fn process_new(
        &mut self,
        document: &DocumentRef,
        uri: &str,
        resource_type: Option<ResourceType>,
        type_match: Option<ResourceType>,
        key: Option<String>,
        processing: DependencyProcessing,
    ) -> Result<(), ResolveError> {
        let content = document.content()?;
        let detected = detect_type(uri, Some(&content), resource_type);
        if type_match.is_some_and(|t| t != detected) {
            return Ok(());
        }

        let mut dependencies = Vec::new();
        let mut doctype_location = None;
        match detected {
            ResourceType::XmlSchema => {
                let info = inspect_schema(&content)?;
                let target_namespace = key.or_else(|| info.target_namespace.clone());
                // inserted before dependencies are processed so that cycles terminate
                self.processed.insert(
                    uri.to_string(),
                    ResourceHolder::schema(document.clone(), target_namespace, None),
                );

                if let Some(doctype) = &info.doctype {
                    if let Some(system_id) = &doctype.system_id {
                        let resolved =
                            self.resolve_entity(uri, system_id, doctype.public_id.as_deref())?;
                        if processing.is_process() {
                            doctype_location = relocated_reference(uri, system_id, &resolved)?;
                        }
                        dependencies.push(Dependency::Processed(Some(system_id.clone()), resolved));
                    }
                    for entity in &doctype.entities {
                        let resolved = self.resolve_dtd_entity(uri, entity)?;
                        dependencies.push(Dependency::Processed(Some(entity.system_id.clone()), resolved));
                    }
                }
                dependencies.extend(info.references.into_iter().map(Dependency::Schema));
            }
            ResourceType::Dtd => {
                self.processed.insert(
                    uri.to_string(),
                    ResourceHolder::dtd(document.clone(), key, None),
                );

                if processing.is_process() {
                    match self.resolve_dtd_entities(uri, &content) {
                        Ok(resolved) => dependencies.extend(resolved),
                        Err(error) if processing.suppresses_errors() => {
                            warn!("Ignoring DTD reference error for '{}': {}", uri, error);
                        }
                        Err(error) => return Err(error),
                    }
                }
            }
        }

        let mut relocations = Vec::new();
        for dependency in dependencies {
            match dependency {
                Dependency::Processed(reference, resolved) => {
                    self.add_dependency(uri, reference, resolved);
                }
                Dependency::Schema(reference) => {
                    if let Some(location) = self.process_schema_reference(document, uri, &reference)? {
                        relocations.push((reference, location));
                    }
                }
            }
        }

        if !relocations.is_empty() || doctype_location.is_some() {
            self.update_references(uri, &content, &relocations, doctype_location.as_deref())?;
        }
        Ok(())
    }

    /// Rewrite references of a processed schema to their resolved locations
    fn update_references(
        &mut self,
        uri: &str,
        content: &str,
        relocations: &[(SchemaReference, String)],
        doctype_location: Option<&str>,
    ) -> Result<(), ResolveError> {
        let mut updated = content.to_string();
        for (reference, location) in relocations {
            if let Some(relocated) = update_schema_location(&updated, reference, location)? {
                debug!("Updated reference {} of '{}' to '{}'", reference, uri, location);
                updated = relocated;
            }
        }
        if let Some(system_id) = doctype_location
            && let Some(relocated) = update_doctype_system_id(&updated, system_id)
        {
            debug!("Updated DOCTYPE system identifier of '{}' to '{}'", uri, system_id);
            updated = relocated;
        }

        if updated != content
            && let Some(holder) = self.processed.get_mut(uri)
        {
            holder.set_content(updated);
        }
        Ok(())
    }

    /// Resolve and process a schema reference.
    ///
    /// Returns the location the reference should be updated to, if the
    /// dependency was resolved somewhere other than where it points.
    fn process_schema_reference(
        &mut self,
        document: &DocumentRef,
        uri: &str,
        reference: &SchemaReference,
    ) -> Result<Option<String>, ResolveError> {
        let location = reference.location.as_deref();
        let absolute_location = location.map(|l| resolve_uri(Some(uri), l)).transpose()?;

        let dependency = if reference.has_target_namespace() {
            self.context
                .resolver_for_type(Some(ResourceType::XmlSchema))
                .resolve_by_target_namespace(
                    absolute_location.as_deref(),
                    reference.namespace.as_deref(),
                )?
        } else {
            match location.filter(|l| !l.is_empty()) {
                Some(location) if Url::parse(location).is_ok() => Some(
                    self.context
                        .new_uri_input_source(location, Some(ResourceType::XmlSchema))?
                        .as_resource_document()?,
                ),
                Some(location) => {
                    let resolver = self.context.resolver_for_type(Some(ResourceType::XmlSchema));
                    Some(document.relative(location, Some(resolver.as_ref()))?)
                }
                None => None,
            }
        };

        let dependency = dependency
            .filter(|d| d.exists())
            .ok_or_else(|| ResolveError::MissingDependency(reference.to_string()))?;

        let dependency_uri = dependency.uri();
        let relocation = match (&reference.location, &absolute_location) {
            (Some(location), Some(absolute))
                if *absolute != dependency_uri
                    && (!reference.has_target_namespace() || reference.namespace.is_some()) =>
            {
                Some(relative_uri(uri, &dependency_uri)).filter(|updated| updated != location)
            }
            _ => None,
        };

        self.add_dependency(uri, reference.location.clone(), dependency_uri);
        self.process_document(
            &dependency,
            Some(ResourceType::XmlSchema),
            None,
            reference.namespace.clone(),
            DependencyProcessing::On,
        )?;
        Ok(relocation)
    }

    fn resolve_dtd_entities(&mut self, uri: &str, content: &str) -> Result<Vec<Dependency>, ResolveError> {
        let mut resolved = Vec::new();
        for entity in external_entities(content) {
            let entity_uri = self.resolve_dtd_entity(uri, &entity)?;
            resolved.push(Dependency::Processed(Some(entity.system_id), entity_uri));
        }
        Ok(resolved)
    }

    fn resolve_dtd_entity(&mut self, base: &str, entity: &EntityReference) -> Result<String, ResolveError> {
        self.resolve_entity(base, &entity.system_id, entity.public_id.as_deref())
    }

    /// Resolve and process a DTD, returning its URI
    fn resolve_entity(
        &mut self,
        base: &str,
        system_id: &str,
        public_id: Option<&str>,
    ) -> Result<String, ResolveError> {
        let absolute = resolve_uri(Some(base), system_id)?;
        if self.processed.get(&absolute).is_some_and(|h| !h.is_error()) {
            return Ok(absolute);
        }

        let document = match public_id {
            Some(public_id) => self
                .context
                .resolver_for_type(Some(ResourceType::Dtd))
                .resolve_by_public_id(Some(&absolute), public_id)?,
            None => Some(
                self.context
                    .new_uri_input_source(absolute.clone(), Some(ResourceType::Dtd))?
                    .as_resource_document()?,
            ),
        };
        let document = document.ok_or_else(|| {
            ResolveError::MissingDependency(match public_id {
                Some(public_id) => format!("{} (public ID {})", system_id, public_id),
                None => system_id.to_string(),
            })
        })?;

        let resolved = document.uri();
        self.process_document(
            &document,
            Some(ResourceType::Dtd),
            None,
            public_id.map(str::to_string),
            DependencyProcessing::Off,
        )?;
        Ok(resolved)
    }

    fn add_dependency(&mut self, uri: &str, reference: Option<String>, absolute: String) {
        if let Some(holder) = self.processed.get_mut(uri) {
            holder.add_dependency(reference, absolute);
        }
    }
}

/// Where a reference should point for it to resolve to `resolved`, `None`
/// when it already does
fn relocated_reference(
    base: &str,
    reference: &str,
    resolved: &str,
) -> Result<Option<String>, ResolveError> {
    if resolve_uri(Some(base), reference)? == resolved {
        return Ok(None);
    }
    Ok(Some(relative_uri(base, resolved)).filter(|updated| updated != reference))
}

/// Type from the suffix of the URI path
fn type_from_uri(uri: &str) -> Option<ResourceType> {
    let path = Url::parse(uri)
        .map(|url| url.path().to_string())
        .unwrap_or_else(|_| uri.to_string());
    ResourceType::from_path_suffix(&path)
}

/// Type from the hint, else the URI suffix, else the content
fn detect_type(uri: &str, content: Option<&str>, hint: Option<ResourceType>) -> ResourceType {
    if let Some(resource_type) = hint {
        return resource_type;
    }
    if let Some(resource_type) = type_from_uri(uri) {
        return resource_type;
    }
    if content.is_some_and(is_schema) {
        ResourceType::XmlSchema
    } else {
        ResourceType::Dtd
    }
}

/// Process the inputs of an import
pub fn process_resources(
    context: &ImportContext,
    sources: &[ResourceInputSource],
) -> IndexMap<String, ResourceHolder> {
    ResourceProcessor::new(context).process(sources)
}

/// Save every holder that needs saving in a single registry call.
///
/// Returns the number of entries saved.
pub fn save_resources<'h>(
    registry: &dyn ResourceRegistry,
    holders: impl IntoIterator<Item = &'h ResourceHolder>,
) -> Result<usize, RegistryError> {
    let entries = holders
        .into_iter()
        .filter(|holder| holder.is_persist())
        .map(ResourceHolder::as_resource_entry)
        .collect::<Result<Vec<ResourceEntry>, _>>()
        .map_err(|e| RegistryError::SaveFailed(e.to_string()))?;

    if entries.is_empty() {
        debug!("No resources to save");
        return Ok(0);
    }

    let count = entries.len();
    registry.save_entries(entries)?;
    info!("Saved {} resources", count);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_detection_order() {
        let schema = "<xs:schema xmlns:xs='http://www.w3.org/2001/XMLSchema'/>";
        assert_eq!(
            detect_type("http://host/a.dtd", Some(schema), Some(ResourceType::XmlSchema)),
            ResourceType::XmlSchema
        );
        assert_eq!(detect_type("http://host/a.dtd", Some(schema), None), ResourceType::Dtd);
        assert_eq!(detect_type("http://host/a?x=1", Some(schema), None), ResourceType::XmlSchema);
        assert_eq!(detect_type("http://host/a", Some("<!ELEMENT a EMPTY>"), None), ResourceType::Dtd);
    }

    #[test]
    fn type_from_uri_needs_a_dotted_suffix() {
        assert_eq!(type_from_uri("http://host/a.DTD"), Some(ResourceType::Dtd));
        assert_eq!(type_from_uri("http://host/a.xsd?version=2"), Some(ResourceType::XmlSchema));
        assert_eq!(type_from_uri("http://host/schemas-dtd"), None);
    }

    #[test]
    fn reference_is_relocated_only_when_resolved_elsewhere() {
        let base = "http://host/a/x.xsd";
        assert_eq!(relocated_reference(base, "y.xsd", "http://host/a/y.xsd").unwrap(), None);
        assert_eq!(
            relocated_reference(base, "y.xsd", "http://host/a/types/y.xsd").unwrap(),
            Some("types/y.xsd".to_string())
        );
        assert_eq!(
            relocated_reference(base, "y.dtd", "http://registry/y.dtd").unwrap(),
            Some("http://registry/y.dtd".to_string())
        );
    }

    #[test]
    fn dependency_processing_flags() {
        assert!(DependencyProcessing::Auto.is_process());
        assert!(DependencyProcessing::Auto.suppresses_errors());
        assert!(!DependencyProcessing::Off.is_process());
        assert!(!DependencyProcessing::On.suppresses_errors());
    }
}
