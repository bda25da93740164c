//! Processed resources

use crate::document::{DocumentRef, RegistryResourceDocument, ResourceDocument, UriResourceDocument};
use crate::document::registry::RegistryAction;
use crate::models::{ResourceEntry, ResourceType};
use crate::resolve::ResolveError;
use std::collections::BTreeSet;

/// What saving a holder will do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolderAction {
    Create,
    Update,
    Ignore,
}

impl std::fmt::Display for HolderAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HolderAction::Create => write!(f, "Create"),
            HolderAction::Update => write!(f, "Update"),
            HolderAction::Ignore => write!(f, "Ignore"),
        }
    }
}

/// A resource classified during import, with the dependencies found for it
#[derive(Debug, Clone)]
pub struct ResourceHolder {
    document: DocumentRef,
    resource_type: Option<ResourceType>,
    /// Target namespace for schemas, public identifier for DTDs
    detail: Option<String>,
    error: Option<ResolveError>,
    /// (reference as written, absolute URI)
    dependencies: BTreeSet<(Option<String>, String)>,
}

impl ResourceHolder {
    fn build(
        document: DocumentRef,
        resource_type: Option<ResourceType>,
        detail: Option<String>,
        error: Option<ResolveError>,
    ) -> Self {
        Self {
            document,
            resource_type,
            detail,
            error,
            dependencies: BTreeSet::new(),
        }
    }

    pub fn schema(
        document: DocumentRef,
        target_namespace: Option<String>,
        error: Option<ResolveError>,
    ) -> Self {
        Self::build(document, Some(ResourceType::XmlSchema), target_namespace, error)
    }

    /// Holder for a DTD, registry DTDs keep their registered public identifier
    pub fn dtd(document: DocumentRef, public_id: Option<String>, error: Option<ResolveError>) -> Self {
        let public_id = match document.as_registry() {
            Some(registry_doc) => registry_doc.header().resource_key1.clone(),
            None => public_id,
        };
        Self::build(document, Some(ResourceType::Dtd), public_id, error)
    }

    pub fn untyped(document: DocumentRef) -> Self {
        Self::build(document, None, None, None)
    }

    /// Holder of the given type, the detail is taken from a registry document
    pub fn new(document: DocumentRef, resource_type: ResourceType) -> Self {
        let detail = document
            .as_registry()
            .and_then(|r| r.header().resource_key1.clone());
        Self::build(document, Some(resource_type), detail, None)
    }

    fn registry_document(&self) -> Option<&RegistryResourceDocument> {
        self.document.as_registry()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error(&self) -> Option<&ResolveError> {
        self.error.as_ref()
    }

    pub fn set_error(&mut self, error: ResolveError) {
        self.error = Some(error);
    }

    /// Should this holder be saved
    pub fn is_persist(&self) -> bool {
        if self.is_error() {
            return false;
        }
        match self.registry_document() {
            Some(registry_doc) => registry_doc.updated_entry().is_some(),
            None => true,
        }
    }

    /// Is this a resource not yet in the registry
    pub fn is_new(&self) -> bool {
        self.registry_document().is_none()
    }

    pub fn status(&self) -> &'static str {
        if self.is_error() { "Failed" } else { "OK" }
    }

    pub fn action(&self) -> HolderAction {
        if self.is_error() {
            return HolderAction::Ignore;
        }
        match self.registry_document().map(|r| r.action()) {
            Some(RegistryAction::Update) => HolderAction::Update,
            Some(RegistryAction::Ignore) => HolderAction::Ignore,
            None => HolderAction::Create,
        }
    }

    pub fn system_id(&self) -> String {
        self.document.uri()
    }

    /// Change the URI of the resource.
    ///
    /// Registry resources only change if they are being saved anyway.
    pub fn set_system_id(&mut self, system_id: impl Into<String>) {
        let system_id = system_id.into();
        if let Some(registry_doc) = self.registry_document() {
            if self.is_persist() {
                registry_doc.update_uri(system_id);
            }
            return;
        }
        let content = if self.document.available() {
            self.document.content().ok()
        } else {
            None
        };
        self.document = UriResourceDocument::shared(system_id, content, None);
    }

    pub fn description(&self) -> String {
        self.registry_document()
            .and_then(|r| r.description())
            .unwrap_or_default()
            .to_string()
    }

    pub fn public_id(&self) -> Option<&str> {
        self.detail_for_type(ResourceType::Dtd)
    }

    pub fn target_namespace(&self) -> Option<&str> {
        self.detail_for_type(ResourceType::XmlSchema)
    }

    fn detail_for_type(&self, resource_type: ResourceType) -> Option<&str> {
        if self.resource_type == Some(resource_type) {
            self.detail.as_deref()
        } else {
            None
        }
    }

    /// Human readable details, e.g. "TNS: urn:example"
    pub fn details(&self) -> String {
        match (&self.detail, self.resource_type) {
            (Some(detail), Some(ResourceType::XmlSchema)) => format!("TNS: {}", detail),
            (Some(detail), Some(ResourceType::Dtd)) => format!("Public ID: {}", detail),
            _ => String::new(),
        }
    }

    pub fn resource_type(&self) -> Option<ResourceType> {
        self.resource_type
    }

    pub fn content(&self) -> Result<String, ResolveError> {
        self.document.content()
    }

    /// Replace the content, registry resources only change if being saved
    pub fn set_content(&mut self, content: impl Into<String>) {
        if let Some(registry_doc) = self.registry_document() {
            if self.is_persist() {
                registry_doc.update_content(content);
            }
            return;
        }
        self.document = UriResourceDocument::shared(self.document.uri(), Some(content.into()), None);
    }

    pub fn is_xml(&self) -> bool {
        self.resource_type.is_some_and(|t| t.is_xml())
    }

    /// Record a dependency by its reference (if any) and absolute URI
    pub fn add_dependency(&mut self, reference: Option<String>, absolute_uri: impl Into<String>) {
        self.dependencies.insert((reference, absolute_uri.into()));
    }

    pub fn dependencies(&self) -> &BTreeSet<(Option<String>, String)> {
        &self.dependencies
    }

    pub fn set_dependencies(&mut self, dependencies: BTreeSet<(Option<String>, String)>) {
        self.dependencies = dependencies;
    }

    /// The distinct absolute URIs of all dependencies
    pub fn absolute_dependencies(&self) -> BTreeSet<&str> {
        self.dependencies
            .iter()
            .map(|(_, absolute)| absolute.as_str())
            .collect()
    }

    pub fn document(&self) -> &DocumentRef {
        &self.document
    }

    /// Build the registry entry to save
    pub fn as_resource_entry(&self) -> Result<ResourceEntry, ResolveError> {
        let resource_type = match self.resource_type {
            Some(resource_type) if !self.is_error() => resource_type,
            _ => {
                return Err(ResolveError::InvalidResource(format!(
                    "Cannot create resource entry for '{}'",
                    self.system_id()
                )));
            }
        };

        match self.registry_document() {
            Some(registry_doc) => registry_doc.updated_entry().ok_or_else(|| {
                ResolveError::InvalidResource(format!(
                    "No update for existing resource '{}'",
                    self.system_id()
                ))
            }),
            None => Ok(ResourceEntry::new(
                self.system_id(),
                resource_type,
                self.document.content()?,
                self.detail.clone(),
            )),
        }
    }

    /// Update the content of a registry resource from the given document
    pub fn update_content_from(&self, document: &dyn ResourceDocument) -> Result<(), ResolveError> {
        match self.registry_document() {
            Some(registry_doc) => registry_doc.update_content_from(document),
            None => Ok(()),
        }
    }
}
