//! Import processing tests

use std::collections::HashMap;
use std::sync::Arc;
use xml_resource_import::document::UriResourceDocument;
use xml_resource_import::import::{
    HolderAction, ImportContext, ResourceHolder, get_dependencies, process_resources,
    save_resources,
};
use xml_resource_import::models::{DependencyScope, ResourceEntry, ResourceType};
use xml_resource_import::registry::InMemoryRegistry;
use xml_resource_import::resolve::{ResolveError, ResolveResult, ResourceDocumentResolver};

const SCHEMA_A: &str = r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:a">
  <xs:import namespace="urn:b" schemaLocation="b.xsd"/>
</xs:schema>"#;

const SCHEMA_B: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:b">
  <xs:element name="b" type="xs:string"/>
</xs:schema>"#;

const INCLUDES_B: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:include schemaLocation="b.xsd"/>
</xs:schema>"#;

const INCLUDES_A: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:include schemaLocation="a.xsd"/>
</xs:schema>"#;

/// Resolver over fixed documents, by URI and by target namespace
#[derive(Default)]
struct MapResolver {
    by_uri: HashMap<String, String>,
    by_namespace: HashMap<String, (String, String)>,
    by_public_id: HashMap<String, (String, String)>,
}

impl MapResolver {
    fn with_uri(mut self, uri: &str, content: &str) -> Self {
        self.by_uri.insert(uri.to_string(), content.to_string());
        self
    }

    fn with_namespace(mut self, namespace: &str, uri: &str, content: &str) -> Self {
        self.by_namespace
            .insert(namespace.to_string(), (uri.to_string(), content.to_string()));
        self
    }

    fn with_public_id(mut self, public_id: &str, uri: &str, content: &str) -> Self {
        self.by_public_id
            .insert(public_id.to_string(), (uri.to_string(), content.to_string()));
        self
    }
}

impl ResourceDocumentResolver for MapResolver {
    fn resolve_by_uri(&self, uri: &str) -> ResolveResult {
        Ok(self
            .by_uri
            .get(uri)
            .map(|content| UriResourceDocument::shared(uri, Some(content.clone()), None)))
    }

    fn resolve_by_target_namespace(
        &self,
        _uri: Option<&str>,
        target_namespace: Option<&str>,
    ) -> ResolveResult {
        Ok(target_namespace
            .and_then(|ns| self.by_namespace.get(ns))
            .map(|(uri, content)| UriResourceDocument::shared(uri.clone(), Some(content.clone()), None)))
    }

    fn resolve_by_public_id(&self, _uri: Option<&str>, public_id: &str) -> ResolveResult {
        Ok(self
            .by_public_id
            .get(public_id)
            .map(|(uri, content)| UriResourceDocument::shared(uri.clone(), Some(content.clone()), None)))
    }
}

fn context(resolver: MapResolver) -> ImportContext {
    let mut context = ImportContext::new();
    context.set_resolver_for_type(None, Arc::new(resolver));
    context
}

mod schema_processing_tests {
    use super::*;

    #[test]
    fn test_import_records_dependency_and_both_resources() {
        let context = context(MapResolver::default().with_namespace(
            "urn:b",
            "http://host/b.xsd",
            SCHEMA_B,
        ));
        let source = context
            .new_content_input_source("http://host/a.xsd", SCHEMA_A, None)
            .unwrap();

        let processed = process_resources(&context, &[source]);
        assert_eq!(processed.len(), 2);
        assert!(processed.values().all(|h| !h.is_error()));

        let a = &processed["http://host/a.xsd"];
        assert_eq!(a.target_namespace(), Some("urn:a"));
        assert!(
            a.dependencies()
                .contains(&(Some("b.xsd".to_string()), "http://host/b.xsd".to_string()))
        );

        let b = &processed["http://host/b.xsd"];
        assert_eq!(b.target_namespace(), Some("urn:b"));
        assert_eq!(b.resource_type(), Some(ResourceType::XmlSchema));

        let deps = get_dependencies(DependencyScope::All, a, processed.values());
        assert_eq!(deps.len(), 1);
        assert_eq!(deps.iter().next().unwrap().uri(), "http://host/b.xsd");
    }

    #[test]
    fn test_missing_dependency_records_error_holder() {
        let context = context(MapResolver::default());
        let source = context
            .new_content_input_source("http://host/a.xsd", SCHEMA_A, None)
            .unwrap();

        let processed = process_resources(&context, &[source]);
        assert_eq!(processed.len(), 1);

        let a = &processed["http://host/a.xsd"];
        assert!(a.is_error());
        assert_eq!(a.status(), "Failed");
        assert_eq!(a.action(), HolderAction::Ignore);
        assert!(matches!(a.error(), Some(ResolveError::MissingDependency(_))));
        assert_eq!(a.target_namespace(), Some("urn:a"));
    }

    #[test]
    fn test_cyclic_includes_terminate() {
        let context = context(
            MapResolver::default()
                .with_uri("http://host/a.xsd", INCLUDES_B)
                .with_uri("http://host/b.xsd", INCLUDES_A),
        );
        let source = context
            .new_content_input_source("http://host/a.xsd", INCLUDES_B, None)
            .unwrap();

        let processed = process_resources(&context, &[source]);
        assert_eq!(processed.len(), 2);
        assert!(processed.values().all(|h| !h.is_error()));

        let a = &processed["http://host/a.xsd"];
        let b = &processed["http://host/b.xsd"];
        assert_eq!(
            a.absolute_dependencies().into_iter().collect::<Vec<_>>(),
            vec!["http://host/b.xsd"]
        );
        assert_eq!(
            b.absolute_dependencies().into_iter().collect::<Vec<_>>(),
            vec!["http://host/a.xsd"]
        );
        assert_eq!(get_dependencies(DependencyScope::All, a, processed.values()).len(), 1);
    }

    #[test]
    fn test_input_that_is_not_a_schema_fails() {
        let context = context(MapResolver::default());
        let source = context
            .new_content_input_source("http://host/a.xsd", "<root/>", None)
            .unwrap();

        let processed = process_resources(&context, &[source]);
        assert!(matches!(
            processed["http://host/a.xsd"].error(),
            Some(ResolveError::InvalidResource(_))
        ));
    }

    #[test]
    fn test_unresolvable_input_fails() {
        let context = context(MapResolver::default());
        let source = context
            .new_uri_input_source("http://host/gone.xsd", Some(ResourceType::XmlSchema))
            .unwrap();

        let processed = process_resources(&context, &[source]);
        let holder = &processed["http://host/gone.xsd"];
        assert!(matches!(holder.error(), Some(ResolveError::NotFound(_))));
        assert_eq!(holder.resource_type(), Some(ResourceType::XmlSchema));
    }

    #[test]
    fn test_unresolvable_input_is_typed_by_dotted_suffix() {
        let context = context(MapResolver::default());
        let sources = [
            context.new_uri_input_source("http://host/gone.DTD", None).unwrap(),
            context.new_uri_input_source("http://host/schemas-dtd", None).unwrap(),
        ];

        let processed = process_resources(&context, &sources);
        assert_eq!(
            processed["http://host/gone.DTD"].resource_type(),
            Some(ResourceType::Dtd)
        );
        assert_eq!(
            processed["http://host/schemas-dtd"].resource_type(),
            Some(ResourceType::XmlSchema)
        );
    }
}

mod reference_update_tests {
    use super::*;
    use xml_resource_import::import::inspect_schema;
    use xml_resource_import::registry::ResourceRegistry;

    fn locations(content: &str) -> Vec<String> {
        inspect_schema(content)
            .unwrap()
            .references
            .into_iter()
            .filter_map(|r| r.location)
            .collect()
    }

    #[test]
    fn test_import_resolved_from_registry_points_at_registry_resource() {
        let registry = Arc::new(InMemoryRegistry::with_entries([ResourceEntry::new(
            "http://registry/b.xsd",
            ResourceType::XmlSchema,
            SCHEMA_B,
            Some("urn:b".into()),
        )]));
        let mut context = ImportContext::new();
        context.set_resolver_for_type(
            None,
            ImportContext::build_resource_entry_resolver(registry.clone(), false, None),
        );
        let source = context
            .new_content_input_source("http://host/a.xsd", SCHEMA_A, None)
            .unwrap();

        let processed = process_resources(&context, &[source]);
        assert!(processed.values().all(|h| !h.is_error()));
        let a = &processed["http://host/a.xsd"];
        assert_eq!(locations(&a.content().unwrap()), vec!["http://registry/b.xsd"]);
        assert!(
            a.dependencies()
                .contains(&(Some("b.xsd".to_string()), "http://registry/b.xsd".to_string()))
        );

        assert_eq!(save_resources(registry.as_ref(), processed.values()).unwrap(), 1);
        let saved = registry.find_header_by_uri("http://host/a.xsd").unwrap().unwrap();
        let saved = registry.find_entry(saved.id).unwrap().unwrap();
        assert!(saved.content.contains(r#"schemaLocation="http://registry/b.xsd""#));
    }

    #[test]
    fn test_location_below_the_schema_is_kept_relative() {
        let context = context(MapResolver::default().with_namespace(
            "urn:b",
            "http://host/types/b.xsd",
            SCHEMA_B,
        ));
        let source = context
            .new_content_input_source("http://host/a.xsd", SCHEMA_A, None)
            .unwrap();

        let processed = process_resources(&context, &[source]);
        let a = &processed["http://host/a.xsd"];
        assert_eq!(locations(&a.content().unwrap()), vec!["types/b.xsd"]);
        assert_eq!(a.target_namespace(), Some("urn:a"));
    }

    #[test]
    fn test_location_already_pointing_at_dependency_is_unchanged() {
        let context = context(MapResolver::default().with_namespace(
            "urn:b",
            "http://host/b.xsd",
            SCHEMA_B,
        ));
        let source = context
            .new_content_input_source("http://host/a.xsd", SCHEMA_A, None)
            .unwrap();

        let processed = process_resources(&context, &[source]);
        assert_eq!(processed["http://host/a.xsd"].content().unwrap(), SCHEMA_A);
    }

    #[test]
    fn test_doctype_system_id_points_at_resolved_dtd() {
        const WITH_DOCTYPE: &str = r#"<!DOCTYPE xs:schema PUBLIC "-//W3C//DTD XMLSCHEMA 200102//EN" "XMLSchema.dtd">
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:d"/>"#;
        let context = context(MapResolver::default().with_public_id(
            "-//W3C//DTD XMLSCHEMA 200102//EN",
            "http://registry/XMLSchema.dtd",
            "<!ELEMENT xs:schema ANY>",
        ));
        let source = context
            .new_content_input_source("http://host/d.xsd", WITH_DOCTYPE, None)
            .unwrap();

        let processed = process_resources(&context, &[source]);
        assert_eq!(processed.len(), 2);
        let d = &processed["http://host/d.xsd"];
        assert!(!d.is_error());
        let doctype = inspect_schema(&d.content().unwrap()).unwrap().doctype.unwrap();
        assert_eq!(doctype.system_id.as_deref(), Some("http://registry/XMLSchema.dtd"));
        assert_eq!(
            processed["http://registry/XMLSchema.dtd"].public_id(),
            Some("-//W3C//DTD XMLSCHEMA 200102//EN")
        );
    }
}

mod dtd_processing_tests {
    use super::*;

    const DTD: &str = r#"<!ENTITY % common SYSTEM "common.dtd">
%common;
<!ELEMENT a (#PCDATA)>"#;

    #[test]
    fn test_dtd_entity_is_processed() {
        let context = context(
            MapResolver::default().with_uri("http://host/common.dtd", "<!ENTITY % x \"y\">"),
        );
        let source = context
            .new_content_input_source("http://host/a.dtd", DTD, None)
            .unwrap();

        let processed = process_resources(&context, &[source]);
        assert_eq!(processed.len(), 2);

        let a = &processed["http://host/a.dtd"];
        assert_eq!(a.resource_type(), Some(ResourceType::Dtd));
        assert!(!a.is_xml());
        assert!(
            a.dependencies()
                .contains(&(Some("common.dtd".to_string()), "http://host/common.dtd".to_string()))
        );
        assert!(!processed["http://host/common.dtd"].is_error());
    }

    #[test]
    fn test_unresolved_entity_of_dtd_input_is_ignored() {
        let context = context(MapResolver::default());
        let source = context
            .new_content_input_source("http://host/a.dtd", DTD, None)
            .unwrap();

        let processed = process_resources(&context, &[source]);
        assert_eq!(processed.len(), 1);
        let a = &processed["http://host/a.dtd"];
        assert!(!a.is_error());
        assert!(a.dependencies().is_empty());
    }
}

mod save_tests {
    use super::*;

    #[test]
    fn test_save_creates_new_resources() {
        let context = context(MapResolver::default().with_namespace(
            "urn:b",
            "http://host/b.xsd",
            SCHEMA_B,
        ));
        let source = context
            .new_content_input_source("http://host/a.xsd", SCHEMA_A, None)
            .unwrap();
        let processed = process_resources(&context, &[source]);

        let registry = InMemoryRegistry::new();
        let saved = save_resources(&registry, processed.values()).unwrap();
        assert_eq!(saved, 2);

        let mut entries: Vec<ResourceEntry> = registry.entries();
        entries.sort_by(|x, y| x.uri.cmp(&y.uri));
        assert_eq!(entries[0].uri, "http://host/a.xsd");
        assert_eq!(entries[0].resource_key1.as_deref(), Some("urn:a"));
        assert_eq!(entries[1].content, SCHEMA_B);
        assert_eq!(entries[1].resource_type, ResourceType::XmlSchema);
    }

    #[test]
    fn test_failed_and_unchanged_resources_are_not_saved() {
        let failed = ResourceHolder::schema(
            UriResourceDocument::shared("http://host/a.xsd", Some(SCHEMA_A.into()), None),
            None,
            Some(ResolveError::ConflictSkipped),
        );
        let registry = InMemoryRegistry::new();
        assert_eq!(save_resources(&registry, [&failed]).unwrap(), 0);
        assert!(registry.entries().is_empty());
    }
}

mod context_tests {
    use super::*;
    use xml_resource_import::config::ImportConfig;
    use xml_resource_import::models::{ImportChoice, ImportOption};

    #[test]
    fn test_context_from_config_takes_choices() {
        let config = ImportConfig::parse("[choices]\nconflicting_uri = \"update_all\"\n").unwrap();
        let context = ImportContext::from_config(&config).unwrap();
        assert_eq!(
            context.options().get(ImportOption::ConflictingUri),
            ImportChoice::UpdateAll
        );
        assert_eq!(
            context.options().get(ImportOption::MissingResource),
            ImportChoice::None
        );
    }

    #[test]
    fn test_file_input_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.xsd");
        std::fs::write(&path, SCHEMA_B).unwrap();

        let mut context = ImportContext::new();
        context.set_resolver_for_type(None, Arc::new(xml_resource_import::resolve::FileResolver));
        let source = context.new_file_input_source(&path).unwrap();
        assert_eq!(source.length(), Some(SCHEMA_B.len() as u64));
        assert!(source.uri().starts_with("file:"));

        let processed = process_resources(&context, &[source]);
        assert_eq!(processed.len(), 1);
        let holder = processed.values().next().unwrap();
        assert_eq!(holder.target_namespace(), Some("urn:b"));
        assert!(holder.is_persist());
    }
}
