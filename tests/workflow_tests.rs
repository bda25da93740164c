//! Import workflow tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use xml_resource_import::document::UriResourceDocument;
use xml_resource_import::import::{
    DependencyImport, ImportContext, ImportOptions, import_dependencies, inspect_schema,
    resolve_dependencies,
};
use xml_resource_import::models::{ImportChoice, ImportOption, ResourceEntry, ResourceType};
use xml_resource_import::registry::{InMemoryRegistry, ResourceRegistry};
use xml_resource_import::resolve::{ChoiceRequest, ResolveError, ResolveResult, ResourceDocumentResolver};

const MAIN: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:a">
  <xs:import namespace="urn:b" schemaLocation="b.xsd"/>
</xs:schema>"#;

const SCHEMA_B: &str =
    r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:b"/>"#;

const UPDATED_B: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:b">
  <xs:element name="b" type="xs:string"/>
</xs:schema>"#;

/// Serves a single schema by namespace and counts the lookups
struct NamespaceResolver {
    namespace: &'static str,
    uri: &'static str,
    content: &'static str,
    calls: AtomicUsize,
}

impl NamespaceResolver {
    fn new(namespace: &'static str, uri: &'static str, content: &'static str) -> Arc<Self> {
        Arc::new(Self {
            namespace,
            uri,
            content,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ResourceDocumentResolver for NamespaceResolver {
    fn resolve_by_target_namespace(
        &self,
        _uri: Option<&str>,
        target_namespace: Option<&str>,
    ) -> ResolveResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((target_namespace == Some(self.namespace))
            .then(|| UriResourceDocument::shared(self.uri, Some(self.content.to_string()), None)))
    }
}

fn registry_with_b() -> (Arc<InMemoryRegistry>, ResourceEntry) {
    let entry = ResourceEntry::new(
        "http://registry/b.xsd",
        ResourceType::XmlSchema,
        SCHEMA_B,
        Some("urn:b".into()),
    );
    (Arc::new(InMemoryRegistry::with_entries([entry.clone()])), entry)
}

fn locations(content: &str) -> Vec<String> {
    inspect_schema(content)
        .unwrap()
        .references
        .into_iter()
        .filter_map(|r| r.location)
        .collect()
}

mod import_dependencies_tests {
    use super::*;

    #[test]
    fn test_new_dependency_is_saved_without_main_resource() {
        let registry = Arc::new(InMemoryRegistry::new());
        let external = NamespaceResolver::new("urn:b", "http://host/b.xsd", SCHEMA_B);
        let import = DependencyImport::new(registry.clone())
            .with_resolvers(vec![external.clone() as Arc<dyn ResourceDocumentResolver>]);

        let mut context = ImportContext::new();
        let outcome =
            import_dependencies(&mut context, "http://host/a.xsd", MAIN, None, &import).unwrap();

        assert_eq!(outcome.saved, 1);
        assert_eq!(outcome.dependencies.len(), 1);
        assert_eq!(outcome.resource.unwrap().content().unwrap(), MAIN);

        let entries = registry.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].uri, "http://host/b.xsd");
        assert_eq!(entries[0].resource_key1.as_deref(), Some("urn:b"));
        assert_eq!(context.processed_resources().len(), 1);
        assert_eq!(context.input_sources().len(), 1);
    }

    #[test]
    fn test_existing_registry_resource_is_used_and_referenced() {
        let (registry, _) = registry_with_b();
        let external = NamespaceResolver::new("urn:b", "http://host/b.xsd", UPDATED_B);
        let import = DependencyImport::new(registry.clone())
            .with_resolvers(vec![external.clone() as Arc<dyn ResourceDocumentResolver>]);

        let mut context = ImportContext::new();
        context.set_options(
            ImportOptions::new()
                .with(ImportOption::ConflictingTargetNamespace, ImportChoice::Existing)
                .unwrap(),
        );
        let outcome =
            import_dependencies(&mut context, "http://host/a.xsd", MAIN, None, &import).unwrap();

        assert_eq!(outcome.saved, 0);
        assert_eq!(external.calls(), 0);
        let resource = outcome.resource.unwrap();
        assert_eq!(locations(&resource.content().unwrap()), vec!["http://registry/b.xsd"]);
        assert_eq!(registry.entries()[0].content, SCHEMA_B);
    }

    #[test]
    fn test_selected_update_is_saved_and_remembered() {
        let (registry, entry) = registry_with_b();
        let external = NamespaceResolver::new("urn:b", "http://host/b.xsd", UPDATED_B);
        let mut context = ImportContext::new();
        let session = context.shared_options();
        let asked = Arc::new(AtomicUsize::new(0));
        let counter = asked.clone();
        let import = DependencyImport::new(registry.clone())
            .with_resolvers(vec![external.clone() as Arc<dyn ResourceDocumentResolver>])
            .with_selector(Arc::new(move |request: &ChoiceRequest<'_>| {
                counter.fetch_add(1, Ordering::SeqCst);
                session.remember(request.option, ImportChoice::UpdateAll).unwrap();
                ImportChoice::UpdateAll
            }));

        let outcome =
            import_dependencies(&mut context, "http://host/a.xsd", MAIN, None, &import).unwrap();

        assert_eq!(outcome.saved, 1);
        assert_eq!(asked.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.resource.unwrap().content().unwrap(), MAIN);
        assert_eq!(
            context.options().get(ImportOption::ConflictingTargetNamespace),
            ImportChoice::UpdateAll
        );

        let stored = registry.find_entry(entry.id).unwrap().unwrap();
        assert_eq!(stored.uri, "http://host/b.xsd");
        assert_eq!(stored.content, UPDATED_B);
        assert_eq!(registry.entries().len(), 1);
    }

    #[test]
    fn test_failed_dependency_saves_nothing() {
        let registry = Arc::new(InMemoryRegistry::new());
        let import = DependencyImport::new(registry.clone());

        let mut context = ImportContext::new();
        let err = import_dependencies(&mut context, "http://host/a.xsd", MAIN, None, &import)
            .unwrap_err();

        assert_eq!(err, ResolveError::MissingResourceSkipped);
        assert!(registry.entries().is_empty());
        assert!(context.processed_resources()["http://host/a.xsd"].is_error());
    }
}

mod resolve_dependencies_tests {
    use super::*;

    fn main_entry() -> ResourceEntry {
        ResourceEntry::new(
            "http://registry/a.xsd",
            ResourceType::XmlSchema,
            MAIN,
            Some("urn:a".into()),
        )
    }

    #[test]
    fn test_resolves_from_registry_and_reports_invalid_uris() {
        let (registry, _) = registry_with_b();
        registry.save_entries(vec![main_entry()]).unwrap();

        let resolved = resolve_dependencies(registry, ["http://registry/a.xsd", "not a uri"]);
        assert_eq!(resolved.len(), 3);

        let a = &resolved["http://registry/a.xsd"];
        assert!(!a.is_error());
        assert!(!a.is_persist());
        assert_eq!(
            a.absolute_dependencies().into_iter().collect::<Vec<_>>(),
            vec!["http://registry/b.xsd"]
        );
        assert!(!resolved["http://registry/b.xsd"].is_error());
        assert!(matches!(
            resolved["not a uri"].error(),
            Some(ResolveError::InvalidUri(_))
        ));
    }

    #[test]
    fn test_ambiguous_namespace_fails_the_referencing_resource() {
        let registry = Arc::new(InMemoryRegistry::with_entries([
            main_entry(),
            ResourceEntry::new(
                "http://registry/b1.xsd",
                ResourceType::XmlSchema,
                SCHEMA_B,
                Some("urn:b".into()),
            ),
            ResourceEntry::new(
                "http://registry/b2.xsd",
                ResourceType::XmlSchema,
                SCHEMA_B,
                Some("urn:b".into()),
            ),
        ]));

        let resolved = resolve_dependencies(registry, ["http://registry/a.xsd"]);
        assert_eq!(
            resolved["http://registry/a.xsd"].error(),
            Some(&ResolveError::AmbiguousMatch(vec![
                "http://registry/b1.xsd".to_string(),
                "http://registry/b2.xsd".to_string(),
            ]))
        );
    }
}
