//! In-memory registry
//!
//! Used for headless imports and tests. Remote downloads are delegated to an
//! optional fetch function; without one every download fails. Entries can be
//! seeded from and exported to a JSON array of resource entries.

use super::{RegistryError, ResourceRegistry};
use crate::models::{ResourceEntry, ResourceEntryHeader, ResourceType};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

type FetchFn = dyn Fn(&str) -> Result<String, RegistryError> + Send + Sync;

/// Registry holding entries in memory
#[derive(Default)]
pub struct InMemoryRegistry {
    entries: Mutex<Vec<ResourceEntry>>,
    fetch: Option<Box<FetchFn>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: impl IntoIterator<Item = ResourceEntry>) -> Self {
        Self {
            entries: Mutex::new(entries.into_iter().collect()),
            fetch: None,
        }
    }

    /// Set the function used by [`ResourceRegistry::resolve_resource`]
    pub fn with_fetch<F>(mut self, fetch: F) -> Self
    where
        F: Fn(&str) -> Result<String, RegistryError> + Send + Sync + 'static,
    {
        self.fetch = Some(Box::new(fetch));
        self
    }

    /// Create a registry from a JSON array of resource entries
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let entries: Vec<ResourceEntry> = serde_json::from_str(json)
            .map_err(|e| RegistryError::FindFailed(format!("Failed to parse entries: {}", e)))?;
        Ok(Self::with_entries(entries))
    }

    /// Export the stored entries as a JSON array
    pub fn to_json(&self) -> Result<String, RegistryError> {
        serde_json::to_string_pretty(&*self.lock())
            .map_err(|e| RegistryError::SaveFailed(format!("Failed to serialize entries: {}", e)))
    }

    /// Snapshot of the stored entries
    pub fn entries(&self) -> Vec<ResourceEntry> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ResourceEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn headers_where<P>(&self, predicate: P) -> Vec<ResourceEntryHeader>
    where
        P: Fn(&ResourceEntry) -> bool,
    {
        self.lock()
            .iter()
            .filter(|e| predicate(e))
            .map(ResourceEntry::header)
            .collect()
    }
}

impl ResourceRegistry for InMemoryRegistry {
    fn find_header_by_uri(&self, uri: &str) -> Result<Option<ResourceEntryHeader>, RegistryError> {
        Ok(self
            .lock()
            .iter()
            .find(|e| e.uri == uri)
            .map(ResourceEntry::header))
    }

    fn find_headers_by_public_id(
        &self,
        public_id: &str,
    ) -> Result<Vec<ResourceEntryHeader>, RegistryError> {
        Ok(self.headers_where(|e| {
            e.resource_type == ResourceType::Dtd && e.resource_key1.as_deref() == Some(public_id)
        }))
    }

    fn find_headers_by_target_namespace(
        &self,
        target_namespace: Option<&str>,
    ) -> Result<Vec<ResourceEntryHeader>, RegistryError> {
        Ok(self.headers_where(|e| {
            e.resource_type == ResourceType::XmlSchema
                && e.resource_key1.as_deref() == target_namespace
        }))
    }

    fn find_entry(&self, id: Uuid) -> Result<Option<ResourceEntry>, RegistryError> {
        Ok(self.lock().iter().find(|e| e.id == id).cloned())
    }

    fn resolve_resource(&self, uri: &str) -> Result<String, RegistryError> {
        match &self.fetch {
            Some(fetch) => fetch(uri),
            None => Err(RegistryError::ResolveFailed(format!(
                "Cannot download resource: {}",
                uri
            ))),
        }
    }

    /// Save all entries or none, URIs must stay unique across the registry
    fn save_entries(&self, entries: Vec<ResourceEntry>) -> Result<(), RegistryError> {
        let mut stored = self.lock();
        let mut next = stored.clone();
        for entry in entries {
            match next.iter_mut().find(|e| e.id == entry.id) {
                Some(existing) => {
                    debug!("Updating resource entry {}", entry.uri);
                    *existing = entry;
                }
                None => {
                    debug!("Creating resource entry {}", entry.uri);
                    next.push(entry);
                }
            }
        }

        let mut uris = HashSet::new();
        if let Some(duplicate) = next.iter().find(|e| !uris.insert(e.uri.as_str())) {
            return Err(RegistryError::SaveFailed(format!(
                "Duplicate URI: {}",
                duplicate.uri
            )));
        }
        *stored = next;
        Ok(())
    }
}
