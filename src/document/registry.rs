//! Registry backed documents
//!
//! A registry document wraps an existing global resource. It can be updated in
//! place from another document when an import conflict is settled by updating
//! the existing resource; the pending update is then visible through
//! [`RegistryResourceDocument::updated_entry`].

use super::ResourceDocument;
use crate::models::{ResourceEntry, ResourceEntryHeader};
use crate::registry::ResourceRegistry;
use crate::resolve::ResolveError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Pending action for a registry document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryAction {
    Update,
    Ignore,
}

#[derive(Debug)]
struct DocumentState {
    uri: String,
    entry: Option<ResourceEntry>,
    updated_content: Option<String>,
}

impl DocumentState {
    fn apply_update(&mut self) {
        if let (Some(entry), Some(content)) = (self.entry.as_mut(), self.updated_content.as_ref()) {
            entry.uri = self.uri.clone();
            entry.content = content.clone();
        }
    }
}

/// Document for an existing registry entry, loaded on first content access
pub struct RegistryResourceDocument {
    header: ResourceEntryHeader,
    registry: Option<Arc<dyn ResourceRegistry>>,
    state: Mutex<DocumentState>,
}

impl RegistryResourceDocument {
    /// Create a document that loads its entry from the registry when needed
    pub fn new(header: ResourceEntryHeader, registry: Arc<dyn ResourceRegistry>) -> Self {
        Self::build(header, Some(registry), None)
    }

    /// Create a document for an already loaded entry
    pub fn with_entry(header: ResourceEntryHeader, entry: ResourceEntry) -> Self {
        Self::build(header, None, Some(entry))
    }

    fn build(
        header: ResourceEntryHeader,
        registry: Option<Arc<dyn ResourceRegistry>>,
        entry: Option<ResourceEntry>,
    ) -> Self {
        Self {
            state: Mutex::new(DocumentState {
                uri: header.uri.clone(),
                entry,
                updated_content: None,
            }),
            header,
            registry,
        }
    }

    pub fn header(&self) -> &ResourceEntryHeader {
        &self.header
    }

    pub fn description(&self) -> Option<&str> {
        self.header.description.as_deref()
    }

    /// Take URI and content from the given document
    pub fn update_from(&self, document: &dyn ResourceDocument) -> Result<(), ResolveError> {
        let uri = document.uri();
        let content = document.content()?;
        // the entry must be loaded for the update to apply
        self.content()?;
        debug!("Updating resource {} from {}", self.header.uri, uri);
        let mut state = self.lock();
        state.uri = uri;
        state.updated_content = Some(content);
        state.apply_update();
        Ok(())
    }

    /// Take only the content from the given document
    pub fn update_content_from(&self, document: &dyn ResourceDocument) -> Result<(), ResolveError> {
        let content = document.content()?;
        self.content()?;
        self.update_content(content);
        Ok(())
    }

    pub fn update_uri(&self, uri: impl Into<String>) {
        let mut state = self.lock();
        state.uri = uri.into();
        state.apply_update();
    }

    pub fn update_content(&self, content: impl Into<String>) {
        let mut state = self.lock();
        state.updated_content = Some(content.into());
        state.apply_update();
    }

    /// The entry carrying pending updates, `None` if there is nothing to save
    pub fn updated_entry(&self) -> Option<ResourceEntry> {
        let state = self.lock();
        match state.updated_content {
            Some(_) => state.entry.clone(),
            None => None,
        }
    }

    pub fn action(&self) -> RegistryAction {
        if self.lock().updated_content.is_some() {
            RegistryAction::Update
        } else {
            RegistryAction::Ignore
        }
    }

    fn lock(&self) -> MutexGuard<'_, DocumentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RegistryResourceDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryResourceDocument")
            .field("header", &self.header)
            .field("state", &*self.lock())
            .finish()
    }
}

impl ResourceDocument for RegistryResourceDocument {
    fn uri(&self) -> String {
        self.lock().uri.clone()
    }

    fn content(&self) -> Result<String, ResolveError> {
        let mut state = self.lock();
        if state.entry.is_none() {
            let registry = self.registry.as_ref().ok_or_else(|| {
                ResolveError::ContentUnavailable(self.header.uri.clone())
            })?;
            let entry = registry.find_entry(self.header.id)?.ok_or_else(|| {
                ResolveError::NotFound(format!(
                    "Global resource no longer available '{}'",
                    self.header.uri
                ))
            })?;
            state.entry = Some(entry);
            state.apply_update();
        }
        state
            .entry
            .as_ref()
            .map(|e| e.content.clone())
            .ok_or_else(|| ResolveError::ContentUnavailable(self.header.uri.clone()))
    }

    fn available(&self) -> bool {
        self.lock().entry.is_some()
    }

    fn as_registry(&self) -> Option<&RegistryResourceDocument> {
        Some(self)
    }
}
