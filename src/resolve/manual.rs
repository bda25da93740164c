//! Manual resolution of missing resources

use super::conflict::{ChoiceRequest, ChoiceSelector, ResourceTherapist};
use super::{ResolveError, ResolveResult, ResourceDocumentResolver, truncate_middle};
use crate::models::{ImportChoice, ImportOption, ResourceType};
use std::sync::Arc;
use tracing::debug;

/// Resolver of last resort, asks whether a missing resource should be
/// supplied by the therapist or skipped.
pub struct ManualResolver {
    therapist: Arc<dyn ResourceTherapist>,
    selector: Arc<dyn ChoiceSelector>,
}

impl ManualResolver {
    pub fn new(therapist: Arc<dyn ResourceTherapist>, selector: Arc<dyn ChoiceSelector>) -> Self {
        Self {
            therapist,
            selector,
        }
    }

    fn resolve_manually(
        &self,
        resource_type: Option<ResourceType>,
        system_id: Option<&str>,
        public_id: Option<&str>,
        target_namespace: Option<Option<&str>>,
    ) -> ResolveResult {
        let identification = identification(system_id, public_id, target_namespace);
        let choice = self.selector.select_choice(&ChoiceRequest {
            option: ImportOption::MissingResource,
            option_detail: Some("missing"),
            default_choice: ImportChoice::Skip,
            conflict_detail: Some(&identification),
            resource_uri: system_id,
            resource_description: None,
        });
        debug!("Missing resource '{}' handled with '{}'", identification, choice);

        match choice {
            ImportChoice::Import => {
                Ok(self
                    .therapist
                    .consult(resource_type, &identification, None, None))
            }
            ImportChoice::Skip => Err(ResolveError::MissingResourceSkipped),
            _ => Ok(None),
        }
    }
}

/// Identification text, one line per known identifier
fn identification(
    system_id: Option<&str>,
    public_id: Option<&str>,
    target_namespace: Option<Option<&str>>,
) -> String {
    let mut lines = Vec::new();
    if let Some(uri) = system_id.filter(|s| !s.is_empty()) {
        lines.push(format!("URI: {}", truncate_middle(uri, 80)));
    }
    if let Some(public_id) = public_id.filter(|s| !s.is_empty()) {
        lines.push(format!("Public ID: {}", truncate_middle(public_id, 80)));
    }
    if let Some(target_namespace) = target_namespace {
        lines.push(match target_namespace {
            Some(tns) => format!("Target Namespace: {}", truncate_middle(tns, 80)),
            None => "Target Namespace: <no namespace>".to_string(),
        });
    }
    lines.join("\n")
}

impl ResourceDocumentResolver for ManualResolver {
    fn resolve_by_uri(&self, uri: &str) -> ResolveResult {
        let resource_type = ResourceType::from_path_suffix(uri);
        self.resolve_manually(resource_type, Some(uri), None, None)
    }

    fn resolve_by_public_id(&self, uri: Option<&str>, public_id: &str) -> ResolveResult {
        self.resolve_manually(Some(ResourceType::Dtd), uri, Some(public_id), None)
    }

    fn resolve_by_target_namespace(
        &self,
        uri: Option<&str>,
        target_namespace: Option<&str>,
    ) -> ResolveResult {
        self.resolve_manually(
            Some(ResourceType::XmlSchema),
            uri,
            None,
            Some(target_namespace),
        )
    }
}
