//! Resolution of existing registry resources

use super::conflict::{ChoiceRequest, ChoiceSelector};
use super::{ResolveError, ResolveResult, ResourceDocumentResolver};
use crate::document::RegistryResourceDocument;
use crate::models::{ImportChoice, ImportOption, ResourceEntryHeader, ResourceType};
use crate::registry::{RegistryError, ResourceRegistry};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Chooses between several registry resources matching one query
pub trait EntrySelector: Send + Sync {
    fn select(
        &self,
        headers: &[ResourceEntryHeader],
    ) -> Result<Option<ResourceEntryHeader>, ResolveError>;
}

impl<F> EntrySelector for F
where
    F: Fn(&[ResourceEntryHeader]) -> Result<Option<ResourceEntryHeader>, ResolveError>
        + Send
        + Sync,
{
    fn select(
        &self,
        headers: &[ResourceEntryHeader],
    ) -> Result<Option<ResourceEntryHeader>, ResolveError> {
        self(headers)
    }
}

/// Build an entry selector that asks for an ambiguity choice.
///
/// `Existing` selects the first matching resource by URI, `Skip` fails the
/// resolution and anything else selects nothing so that external resolvers are
/// used.
pub fn choice_entry_selector(selector: Arc<dyn ChoiceSelector>) -> Arc<dyn EntrySelector> {
    Arc::new(move |headers: &[ResourceEntryHeader]| {
        let Some(sample) = headers.first() else {
            return Ok(None);
        };
        let option = match sample.resource_type {
            ResourceType::Dtd => ImportOption::AmbiguousPublicId,
            ResourceType::XmlSchema => ImportOption::AmbiguousTargetNamespace,
        };
        let choice = selector.select_choice(&ChoiceRequest {
            option,
            option_detail: None,
            default_choice: ImportChoice::Existing,
            conflict_detail: sample.resource_key1.as_deref(),
            resource_uri: None,
            resource_description: None,
        });
        match choice {
            ImportChoice::Existing => Ok(headers.iter().min_by(|a, b| a.uri.cmp(&b.uri)).cloned()),
            ImportChoice::Skip => Err(ResolveError::AmbiguousResourceSkipped),
            _ => Ok(None),
        }
    })
}

/// Resolver for resources already stored in the registry
pub struct RegistryResolver {
    registry: Arc<dyn ResourceRegistry>,
    fail_on_duplicate_namespace: bool,
    entry_selector: Option<Arc<dyn EntrySelector>>,
}

impl RegistryResolver {
    pub fn new(registry: Arc<dyn ResourceRegistry>) -> Self {
        Self {
            registry,
            fail_on_duplicate_namespace: false,
            entry_selector: None,
        }
    }

    /// Fail when several resources match and none can be selected
    pub fn fail_on_duplicate_namespace(mut self, fail: bool) -> Self {
        self.fail_on_duplicate_namespace = fail;
        self
    }

    pub fn with_entry_selector(mut self, selector: Arc<dyn EntrySelector>) -> Self {
        self.entry_selector = Some(selector);
        self
    }

    fn resolve_headers<F>(&self, uri: Option<&str>, find: F) -> ResolveResult
    where
        F: FnOnce() -> Result<Vec<ResourceEntryHeader>, RegistryError>,
    {
        let headers = find()?;

        let mut selected = match headers.as_slice() {
            [] => None,
            [only] => Some(only.clone()),
            _ => uri.and_then(|uri| headers.iter().find(|h| h.uri == uri).cloned()),
        };

        if headers.len() > 1 && selected.is_none() {
            if let Some(entry_selector) = &self.entry_selector {
                selected = entry_selector.select(&headers)?;
            }

            if selected.is_none() && self.fail_on_duplicate_namespace {
                let uris: BTreeSet<String> = headers.iter().map(|h| h.uri.clone()).collect();
                return Err(ResolveError::AmbiguousMatch(uris.into_iter().collect()));
            }
        }

        Ok(selected.map(|header| {
            debug!("Resolved registry resource {}", header.uri);
            Arc::new(RegistryResourceDocument::new(header, self.registry.clone())) as _
        }))
    }
}

impl ResourceDocumentResolver for RegistryResolver {
    fn resolve_by_uri(&self, uri: &str) -> ResolveResult {
        self.resolve_headers(Some(uri), || {
            Ok(self.registry.find_header_by_uri(uri)?.into_iter().collect())
        })
    }

    fn resolve_by_public_id(&self, uri: Option<&str>, public_id: &str) -> ResolveResult {
        self.resolve_headers(uri, || self.registry.find_headers_by_public_id(public_id))
    }

    fn resolve_by_target_namespace(
        &self,
        uri: Option<&str>,
        target_namespace: Option<&str>,
    ) -> ResolveResult {
        self.resolve_headers(uri, || {
            self.registry
                .find_headers_by_target_namespace(target_namespace)
        })
    }
}
