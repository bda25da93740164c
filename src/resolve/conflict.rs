//! Conflict aware resolution
//!
//! Combines a registry ("internal") resolver with external resolvers. When the
//! same resource is found both internally and externally the configured
//! [`ImportChoice`] (or a [`ChoiceSelector`] callback) decides which document
//! is used and whether the registry resource is updated.

use super::{ResolveError, ResolveResult, ResourceDocumentResolver, truncate_middle};
use crate::document::DocumentRef;
use crate::import::SharedOptions;
use crate::import::schema::inspect_schema;
use crate::models::{ImportChoice, ImportOption, ResourceType};
use std::sync::Arc;
use tracing::{debug, warn};

/// Details for a single choice decision
#[derive(Debug, Clone, Copy)]
pub struct ChoiceRequest<'a> {
    pub option: ImportOption,
    /// Qualifies the option, e.g. "missing" or "invalid"
    pub option_detail: Option<&'a str>,
    pub default_choice: ImportChoice,
    /// Namespace, public identifier or other resource identification
    pub conflict_detail: Option<&'a str>,
    pub resource_uri: Option<&'a str>,
    pub resource_description: Option<&'a str>,
}

/// Callback deciding how to handle a conflict, missing or invalid resource
pub trait ChoiceSelector: Send + Sync {
    fn select_choice(&self, request: &ChoiceRequest<'_>) -> ImportChoice;
}

impl<F> ChoiceSelector for F
where
    F: Fn(&ChoiceRequest<'_>) -> ImportChoice + Send + Sync,
{
    fn select_choice(&self, request: &ChoiceRequest<'_>) -> ImportChoice {
        self(request)
    }
}

/// Selector that always takes the default choice
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultChoiceSelector;

impl ChoiceSelector for DefaultChoiceSelector {
    fn select_choice(&self, request: &ChoiceRequest<'_>) -> ImportChoice {
        request.default_choice
    }
}

/// Supplies a replacement for a missing or invalid resource
pub trait ResourceTherapist: Send + Sync {
    fn consult(
        &self,
        resource_type: Option<ResourceType>,
        resource_detail: &str,
        invalid_resource: Option<&DocumentRef>,
        invalid_detail: Option<&str>,
    ) -> Option<DocumentRef>;
}

impl<F> ResourceTherapist for F
where
    F: Fn(Option<ResourceType>, &str, Option<&DocumentRef>, Option<&str>) -> Option<DocumentRef>
        + Send
        + Sync,
{
    fn consult(
        &self,
        resource_type: Option<ResourceType>,
        resource_detail: &str,
        invalid_resource: Option<&DocumentRef>,
        invalid_detail: Option<&str>,
    ) -> Option<DocumentRef> {
        self(resource_type, resource_detail, invalid_resource, invalid_detail)
    }
}

#[derive(Debug, Clone, Copy)]
enum Query<'a> {
    Uri(&'a str),
    PublicId {
        uri: Option<&'a str>,
        public_id: &'a str,
    },
    TargetNamespace {
        uri: Option<&'a str>,
        target_namespace: Option<&'a str>,
    },
}

impl Query<'_> {
    fn option(&self) -> ImportOption {
        match self {
            Query::Uri(_) => ImportOption::ConflictingUri,
            Query::PublicId { .. } => ImportOption::ConflictingPublicId,
            Query::TargetNamespace { .. } => ImportOption::ConflictingTargetNamespace,
        }
    }

    fn run(&self, resolver: &dyn ResourceDocumentResolver) -> ResolveResult {
        match *self {
            Query::Uri(uri) => resolver.resolve_by_uri(uri),
            Query::PublicId { uri, public_id } => resolver.resolve_by_public_id(uri, public_id),
            Query::TargetNamespace {
                uri,
                target_namespace,
            } => resolver.resolve_by_target_namespace(uri, target_namespace),
        }
    }

    fn uri(&self) -> Option<&str> {
        match *self {
            Query::Uri(uri) => Some(uri),
            Query::PublicId { uri, .. } | Query::TargetNamespace { uri, .. } => uri,
        }
    }

    fn conflict_detail(&self) -> Option<&str> {
        match *self {
            Query::Uri(_) => None,
            Query::PublicId { public_id, .. } => Some(public_id),
            Query::TargetNamespace {
                target_namespace, ..
            } => target_namespace,
        }
    }

    /// Resource type and identification used when external resolution fails
    fn identification(&self) -> (Option<ResourceType>, Option<String>) {
        match *self {
            Query::Uri(_) => (None, None),
            Query::PublicId { public_id, .. } => (
                Some(ResourceType::Dtd),
                Some(format!("Public ID: {}", truncate_middle(public_id, 80))),
            ),
            Query::TargetNamespace {
                target_namespace, ..
            } => (
                Some(ResourceType::XmlSchema),
                Some(namespace_identification(target_namespace)),
            ),
        }
    }
}

fn namespace_identification(target_namespace: Option<&str>) -> String {
    match target_namespace {
        Some(tns) => format!("Target Namespace: {}", truncate_middle(tns, 80)),
        None => "Target Namespace: <no namespace>".to_string(),
    }
}

/// Resolver settling conflicts between registry and external resources
pub struct ConflictAwareResolver {
    internal: Arc<dyn ResourceDocumentResolver>,
    external: Arc<dyn ResourceDocumentResolver>,
    options: SharedOptions,
    selector: Arc<dyn ChoiceSelector>,
    resource_type: Option<ResourceType>,
    therapist: Option<Arc<dyn ResourceTherapist>>,
}

impl ConflictAwareResolver {
    /// Create a resolver, options are read on each query so shared options
    /// changed later in the session take effect.
    pub fn new(
        internal: Arc<dyn ResourceDocumentResolver>,
        external: Arc<dyn ResourceDocumentResolver>,
        options: impl Into<SharedOptions>,
        selector: Arc<dyn ChoiceSelector>,
    ) -> Self {
        Self {
            internal,
            external,
            options: options.into(),
            selector,
            resource_type: None,
            therapist: None,
        }
    }

    /// Set the type of resource resolved, external schemas are checked when set
    pub fn for_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = Some(resource_type);
        self
    }

    /// Set the therapist consulted for missing or invalid resources
    pub fn with_therapist(mut self, therapist: Arc<dyn ResourceTherapist>) -> Self {
        self.therapist = Some(therapist);
        self
    }

    fn resolve(&self, query: Query<'_>) -> ResolveResult {
        let configured = self.options.get(query.option());
        let mut internal = query.run(self.internal.as_ref())?;

        let external = if internal.is_some() && configured == ImportChoice::Existing {
            debug!(
                "Using existing resource for {:?} without external resolution",
                query
            );
            None
        } else {
            match self.resolve_external(query) {
                Ok(external) => external,
                Err(error) if internal.is_some() => {
                    warn!(
                        "External resolution failed for {:?}, using existing resource: {}",
                        query, error
                    );
                    None
                }
                Err(error) if self.therapist.is_some() => {
                    let (resource_type, detail) = query.identification();
                    self.resolve_invalid(
                        resource_type,
                        detail,
                        query.uri(),
                        &error,
                        None,
                        None,
                    )?
                }
                Err(error) => return Err(error),
            }
        };

        // No-namespace schemas are expected to be numerous (included schemas
        // may omit the namespace) so only a URI match counts as a conflict.
        if let Query::TargetNamespace {
            target_namespace: None,
            ..
        } = query
        {
            if let (Some(i), Some(e)) = (&internal, &external) {
                if i.uri() != e.uri() {
                    internal = None;
                }
            }
        }

        self.settle(query.option(), internal, external, query.conflict_detail())
    }

    fn resolve_external(&self, query: Query<'_>) -> ResolveResult {
        let external = query.run(self.external.as_ref())?;
        if let Some(document) = &external {
            document.content()?;
        }
        Ok(external)
    }

    fn settle(
        &self,
        option: ImportOption,
        internal: Option<DocumentRef>,
        external: Option<DocumentRef>,
        conflict_detail: Option<&str>,
    ) -> ResolveResult {
        let (resolved, is_external) = match (internal, external) {
            (Some(internal), Some(external)) => {
                let internal_uri = internal.uri();
                let option = if internal_uri == external.uri() {
                    ImportOption::ConflictingUri
                } else {
                    option
                };
                let description = internal
                    .as_registry()
                    .and_then(|r| r.description().map(str::to_string));

                let choice = self.choose(&ChoiceRequest {
                    option,
                    option_detail: None,
                    default_choice: ImportChoice::Existing,
                    conflict_detail,
                    resource_uri: Some(&internal_uri),
                    resource_description: description.as_deref(),
                })?;
                debug!("Conflict for {} settled with '{}'", internal_uri, choice);

                match choice {
                    ImportChoice::UpdateAll => {
                        if let Some(registry_doc) = internal.as_registry() {
                            registry_doc.update_from(external.as_ref())?;
                        }
                        (internal, false)
                    }
                    ImportChoice::UpdateContent => {
                        if let Some(registry_doc) = internal.as_registry() {
                            registry_doc.update_content_from(external.as_ref())?;
                        }
                        (internal, false)
                    }
                    ImportChoice::Import => (external, true),
                    ImportChoice::Skip => return Err(ResolveError::ConflictSkipped),
                    _ => (internal, false),
                }
            }
            (Some(internal), None) => (internal, false),
            (None, Some(external)) => (external, true),
            (None, None) => return Ok(None),
        };

        if is_external && self.resource_type == Some(ResourceType::XmlSchema) {
            let check = resolved
                .content()
                .and_then(|content| inspect_schema(&content).map(|_| ()));
            if let Err(error) = check {
                let uri = resolved.uri();
                let detail = match option {
                    ImportOption::ConflictingUri => {
                        Some(format!("URI: {}", truncate_middle(&uri, 80)))
                    }
                    ImportOption::ConflictingTargetNamespace => {
                        Some(namespace_identification(conflict_detail))
                    }
                    _ => conflict_detail.map(str::to_string),
                };
                let description = resolved
                    .as_registry()
                    .and_then(|r| r.description().map(str::to_string));
                return self.resolve_invalid(
                    Some(ResourceType::XmlSchema),
                    detail,
                    Some(&uri),
                    &error,
                    Some(&resolved),
                    description.as_deref(),
                );
            }
        }

        Ok(Some(resolved))
    }

    fn resolve_invalid(
        &self,
        resource_type: Option<ResourceType>,
        detail: Option<String>,
        uri: Option<&str>,
        error: &ResolveError,
        invalid: Option<&DocumentRef>,
        description: Option<&str>,
    ) -> ResolveResult {
        let choice = self.choose(&ChoiceRequest {
            option: ImportOption::MissingResource,
            option_detail: Some("invalid"),
            default_choice: ImportChoice::Skip,
            conflict_detail: detail.as_deref(),
            resource_uri: uri,
            resource_description: description,
        })?;

        match choice {
            ImportChoice::Import => {
                let full_detail = detail.unwrap_or_else(|| {
                    format!("URI: {}", truncate_middle(uri.unwrap_or_default(), 80))
                });
                let message = error.to_string();
                Ok(self.therapist.as_ref().and_then(|therapist| {
                    therapist.consult(resource_type, &full_detail, invalid, Some(&message))
                }))
            }
            ImportChoice::Skip => Err(ResolveError::InvalidResourceSkipped(error.to_string())),
            _ => Ok(None),
        }
    }

    /// Configured choice for the option, or the selector's if none is configured
    fn choose(&self, request: &ChoiceRequest<'_>) -> Result<ImportChoice, ResolveError> {
        let choice = match self.options.get(request.option) {
            ImportChoice::None => self.selector.select_choice(request),
            configured => configured,
        };
        if request.option.allows(choice) {
            Ok(choice)
        } else {
            Err(ResolveError::IllegalChoice {
                option: request.option,
                choice,
            })
        }
    }
}

impl ResourceDocumentResolver for ConflictAwareResolver {
    fn resolve_by_uri(&self, uri: &str) -> ResolveResult {
        self.resolve(Query::Uri(uri))
    }

    fn resolve_by_public_id(&self, uri: Option<&str>, public_id: &str) -> ResolveResult {
        self.resolve(Query::PublicId { uri, public_id })
    }

    fn resolve_by_target_namespace(
        &self,
        uri: Option<&str>,
        target_namespace: Option<&str>,
    ) -> ResolveResult {
        self.resolve(Query::TargetNamespace {
            uri,
            target_namespace,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::UriResourceDocument;
    use crate::import::ImportOptions;
    use crate::models::ResourceEntry;
    use crate::registry::InMemoryRegistry;
    use crate::resolve::RegistryResolver;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SCHEMA: &str =
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:a"/>"#;

    struct Counting {
        document: Option<DocumentRef>,
        calls: AtomicUsize,
    }

    impl ResourceDocumentResolver for Counting {
        fn resolve_by_uri(&self, _uri: &str) -> ResolveResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.document.clone())
        }

        fn resolve_by_target_namespace(
            &self,
            _uri: Option<&str>,
            _target_namespace: Option<&str>,
        ) -> ResolveResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.document.clone())
        }
    }

    fn internal() -> Arc<dyn ResourceDocumentResolver> {
        let entry = ResourceEntry::new(
            "http://host/a.xsd",
            ResourceType::XmlSchema,
            SCHEMA,
            Some("urn:a".into()),
        );
        Arc::new(RegistryResolver::new(Arc::new(
            InMemoryRegistry::with_entries([entry]),
        )))
    }

    fn external(uri: &str, content: &str) -> Arc<Counting> {
        Arc::new(Counting {
            document: Some(UriResourceDocument::shared(uri, Some(content.into()), None)),
            calls: AtomicUsize::new(0),
        })
    }

    fn resolver(
        external: Arc<Counting>,
        choice: ImportChoice,
    ) -> ConflictAwareResolver {
        ConflictAwareResolver::new(
            internal(),
            external,
            ImportOptions::default(),
            Arc::new(move |_: &ChoiceRequest<'_>| choice),
        )
        .for_type(ResourceType::XmlSchema)
    }

    #[test]
    fn configured_existing_skips_external() {
        let external = external("http://host/a.xsd", SCHEMA);
        let mut options = ImportOptions::default();
        options
            .set(ImportOption::ConflictingUri, ImportChoice::Existing)
            .unwrap();
        let resolver = ConflictAwareResolver::new(
            internal(),
            external.clone(),
            options,
            Arc::new(DefaultChoiceSelector),
        );

        let doc = resolver.resolve_by_uri("http://host/a.xsd").unwrap().unwrap();
        assert!(doc.as_registry().is_some());
        assert_eq!(external.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn remembered_choice_applies_to_later_queries() {
        let external = external("http://host/a.xsd", SCHEMA);
        let options = SharedOptions::default();
        let session = options.clone();
        let resolver = ConflictAwareResolver::new(
            internal(),
            external.clone(),
            options,
            Arc::new(move |request: &ChoiceRequest<'_>| {
                session
                    .remember(request.option, ImportChoice::Existing)
                    .unwrap();
                ImportChoice::Existing
            }),
        );

        resolver.resolve_by_uri("http://host/a.xsd").unwrap().unwrap();
        assert_eq!(external.calls.load(Ordering::SeqCst), 1);
        let doc = resolver.resolve_by_uri("http://host/a.xsd").unwrap().unwrap();
        assert!(doc.as_registry().is_some());
        assert_eq!(external.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn import_choice_uses_external() {
        let resolver = resolver(external("http://other/a.xsd", SCHEMA), ImportChoice::Import);
        let doc = resolver
            .resolve_by_target_namespace(None, Some("urn:a"))
            .unwrap()
            .unwrap();
        assert_eq!(doc.uri(), "http://other/a.xsd");
        assert!(doc.as_registry().is_none());
    }

    #[test]
    fn skip_choice_fails() {
        let resolver = resolver(external("http://other/a.xsd", SCHEMA), ImportChoice::Skip);
        let err = resolver
            .resolve_by_target_namespace(None, Some("urn:a"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Conflicting resource skipped.");
    }

    #[test]
    fn illegal_callback_choice_is_rejected() {
        let resolver = resolver(
            external("http://host/a.xsd", SCHEMA),
            ImportChoice::UpdateContent,
        );
        // same URI so the option is CONFLICTING_URI, which does not allow UPDATE_CONTENT
        let err = resolver.resolve_by_uri("http://host/a.xsd").unwrap_err();
        assert_eq!(
            err,
            ResolveError::IllegalChoice {
                option: ImportOption::ConflictingUri,
                choice: ImportChoice::UpdateContent
            }
        );
    }

    #[test]
    fn no_namespace_conflict_ignores_internal() {
        let entry = ResourceEntry::new("http://host/n.xsd", ResourceType::XmlSchema, SCHEMA, None);
        let internal: Arc<dyn ResourceDocumentResolver> = Arc::new(RegistryResolver::new(
            Arc::new(InMemoryRegistry::with_entries([entry])),
        ));
        let resolver = ConflictAwareResolver::new(
            internal,
            external("http://other/n.xsd", SCHEMA),
            ImportOptions::default(),
            Arc::new(|_: &ChoiceRequest<'_>| ImportChoice::Skip),
        );
        let doc = resolver
            .resolve_by_target_namespace(None, None)
            .unwrap()
            .unwrap();
        assert_eq!(doc.uri(), "http://other/n.xsd");
    }

    #[test]
    fn invalid_external_schema_is_skipped() {
        let resolver = ConflictAwareResolver::new(
            Arc::new(crate::resolve::NullResolver),
            external("http://other/a.xsd", "<not-a-schema/>"),
            ImportOptions::default(),
            Arc::new(DefaultChoiceSelector),
        )
        .for_type(ResourceType::XmlSchema);
        let err = resolver.resolve_by_uri("http://other/a.xsd").unwrap_err();
        assert!(matches!(err, ResolveError::InvalidResourceSkipped(_)));
    }

    #[test]
    fn invalid_external_schema_goes_to_therapist() {
        let replacement = UriResourceDocument::shared("http://fixed/a.xsd", Some(SCHEMA.into()), None);
        let therapist_doc = replacement.clone();
        let resolver = ConflictAwareResolver::new(
            Arc::new(crate::resolve::NullResolver),
            external("http://other/a.xsd", "<not-a-schema/>"),
            ImportOptions::default(),
            Arc::new(|_: &ChoiceRequest<'_>| ImportChoice::Import),
        )
        .for_type(ResourceType::XmlSchema)
        .with_therapist(Arc::new(
            move |_: Option<ResourceType>,
                  detail: &str,
                  invalid: Option<&DocumentRef>,
                  _: Option<&str>| {
                assert_eq!(detail, "URI: http://other/a.xsd");
                assert!(invalid.is_some());
                Some(therapist_doc.clone())
            },
        ));
        let doc = resolver.resolve_by_uri("http://other/a.xsd").unwrap().unwrap();
        assert_eq!(doc.uri(), "http://fixed/a.xsd");
    }
}
