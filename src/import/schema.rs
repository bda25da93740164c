//! XML Schema inspection
//!
//! Reads the parts of a schema needed for import: the target namespace, the
//! `import`/`include`/`redefine`/`override` references and any document type
//! declaration. This is not validation, a schema is accepted if it is well
//! formed and its root element is `xs:schema`.
//!
//! References can be pointed at a new location once the referenced resource
//! has been resolved elsewhere.

use super::dtd::{EntityReference, external_entities};
use crate::resolve::ResolveError;
use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{NsReader, Writer};
use quick_xml::name::{Namespace, ResolveResult as NamespaceResult};
use regex::Regex;

/// The XML Schema namespace
pub const XML_SCHEMA_NS: &str = "http://www.w3.org/2001/XMLSchema";

static RE_DOCTYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)^\s*([^\s\[]+)(?:\s+(?:PUBLIC\s+(?:"([^"]*)"|'([^']*)')\s+(?:"([^"]*)"|'([^']*)')|SYSTEM\s+(?:"([^"]*)"|'([^']*)')))?\s*(?:\[(.*)\])?\s*$"#,
    )
    .expect("Invalid regex")
});

static RE_DOCTYPE_SYSTEM_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)(<!DOCTYPE\s+[^\s\[>]+\s+(?:PUBLIC\s+(?:"[^"]*"|'[^']*')\s+|SYSTEM\s+))(?:"[^"]*"|'[^']*')"#,
    )
    .expect("Invalid regex")
});

/// Kind of schema reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Import,
    Include,
    Redefine,
    Override,
}

impl ReferenceKind {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"import" => Some(ReferenceKind::Import),
            b"include" => Some(ReferenceKind::Include),
            b"redefine" => Some(ReferenceKind::Redefine),
            b"override" => Some(ReferenceKind::Override),
            _ => None,
        }
    }
}

/// A reference from a schema to another schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaReference {
    pub kind: ReferenceKind,
    /// The `schemaLocation` as written
    pub location: Option<String>,
    /// The `namespace` of an import
    pub namespace: Option<String>,
}

impl SchemaReference {
    /// Imports are resolved by namespace, other references by location
    pub fn has_target_namespace(&self) -> bool {
        self.kind == ReferenceKind::Import
    }
}

impl std::fmt::Display for SchemaReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.location, self.has_target_namespace()) {
            (Some(location), true) => write!(
                f,
                "{} (namespace {})",
                location,
                self.namespace.as_deref().unwrap_or("<no namespace>")
            ),
            (Some(location), false) => write!(f, "{}", location),
            (None, true) => write!(
                f,
                "namespace {}",
                self.namespace.as_deref().unwrap_or("<no namespace>")
            ),
            (None, false) => write!(f, "<no location>"),
        }
    }
}

/// Document type declaration of a schema
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Doctype {
    pub name: String,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
    /// External entities declared in the internal subset
    pub entities: Vec<EntityReference>,
}

/// What a schema declares and references
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaInfo {
    pub target_namespace: Option<String>,
    pub references: Vec<SchemaReference>,
    pub doctype: Option<Doctype>,
}

fn parse_error(e: impl std::fmt::Display) -> ResolveError {
    ResolveError::InvalidResource(format!("XML parsing error: {}", e))
}

fn parse_doctype(text: &str) -> Doctype {
    match RE_DOCTYPE.captures(text) {
        Some(caps) => {
            let text = |i: usize| caps.get(i).map(|m| m.as_str().to_string());
            Doctype {
                name: text(1).unwrap_or_default(),
                public_id: text(2).or_else(|| text(3)),
                system_id: text(4)
                    .or_else(|| text(5))
                    .or_else(|| text(6))
                    .or_else(|| text(7)),
                entities: text(8)
                    .map(|subset| external_entities(&subset))
                    .unwrap_or_default(),
            }
        }
        None => Doctype {
            name: text.trim().to_string(),
            ..Doctype::default()
        },
    }
}

/// Value of an unqualified attribute
fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, ResolveError> {
    for attr in element.attributes() {
        let attr = attr.map_err(parse_error)?;
        if attr.key.prefix().is_none() && attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value().map_err(parse_error)?.into_owned()));
        }
    }
    Ok(None)
}

fn is_schema_namespace(ns: &NamespaceResult<'_>) -> bool {
    matches!(ns, NamespaceResult::Bound(Namespace(n)) if *n == XML_SCHEMA_NS.as_bytes())
}

/// Inspect schema content, failing if it is not an XML Schema
pub fn inspect_schema(content: &str) -> Result<SchemaInfo, ResolveError> {
    let mut reader = NsReader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut info = SchemaInfo::default();
    let mut seen_root = false;

    loop {
        let (ns, event) = reader.read_resolved_event().map_err(parse_error)?;
        match event {
            Event::DocType(text) => {
                info.doctype = Some(parse_doctype(&String::from_utf8_lossy(&text)));
            }
            Event::Start(ref element) | Event::Empty(ref element) => {
                let local_name = element.local_name();
                if !seen_root {
                    seen_root = true;
                    if !is_schema_namespace(&ns) || local_name.as_ref() != b"schema" {
                        return Err(ResolveError::InvalidResource(format!(
                            "Not an XML Schema, root element is '{}'",
                            String::from_utf8_lossy(element.name().as_ref())
                        )));
                    }
                    info.target_namespace = attribute(element, b"targetNamespace")?;
                } else if is_schema_namespace(&ns) {
                    if let Some(kind) = ReferenceKind::from_local_name(local_name.as_ref()) {
                        info.references.push(SchemaReference {
                            kind,
                            location: attribute(element, b"schemaLocation")?,
                            namespace: attribute(element, b"namespace")?,
                        });
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(ResolveError::InvalidResource(
            "Not an XML Schema, no root element".to_string(),
        ));
    }
    Ok(info)
}

/// Is the content an XML Schema
pub fn is_schema(content: &str) -> bool {
    inspect_schema(content).is_ok()
}

/// Point the references matching `reference` at a new location.
///
/// A reference matches on whether it is an import, the namespace (imports
/// only) and the location as written. Everything else in the document is
/// written back as read. Returns `None` when no reference matched.
pub fn update_schema_location(
    content: &str,
    reference: &SchemaReference,
    location: &str,
) -> Result<Option<String>, ResolveError> {
    let Some(current) = reference.location.as_deref() else {
        return Ok(None);
    };

    let mut reader = NsReader::from_str(content);
    let mut writer = Writer::new(Vec::new());
    let mut updated = false;

    loop {
        let (ns, event) = reader.read_resolved_event().map_err(parse_error)?;
        let event = match event {
            Event::Eof => break,
            Event::Start(element) => match relocate(&ns, &element, reference, current, location)? {
                Some(relocated) => {
                    updated = true;
                    Event::Start(relocated)
                }
                None => Event::Start(element),
            },
            Event::Empty(element) => match relocate(&ns, &element, reference, current, location)? {
                Some(relocated) => {
                    updated = true;
                    Event::Empty(relocated)
                }
                None => Event::Empty(element),
            },
            event => event,
        };
        writer.write_event(event).map_err(parse_error)?;
    }

    if !updated {
        return Ok(None);
    }
    String::from_utf8(writer.into_inner())
        .map(Some)
        .map_err(parse_error)
}

/// Copy of the element with its `schemaLocation` replaced, if it matches
fn relocate(
    ns: &NamespaceResult<'_>,
    element: &BytesStart<'_>,
    reference: &SchemaReference,
    current: &str,
    location: &str,
) -> Result<Option<BytesStart<'static>>, ResolveError> {
    if !is_schema_namespace(ns) {
        return Ok(None);
    }
    let Some(kind) = ReferenceKind::from_local_name(element.local_name().as_ref()) else {
        return Ok(None);
    };
    let is_import = kind == ReferenceKind::Import;
    if is_import != reference.has_target_namespace()
        || attribute(element, b"schemaLocation")?.as_deref() != Some(current)
        || (is_import && attribute(element, b"namespace")? != reference.namespace)
    {
        return Ok(None);
    }

    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut relocated = BytesStart::new(name);
    for attr in element.attributes() {
        let attr = attr.map_err(parse_error)?;
        if attr.key.prefix().is_none() && attr.key.local_name().as_ref() == b"schemaLocation" {
            relocated.push_attribute(("schemaLocation", location));
        } else {
            relocated.push_attribute(attr);
        }
    }
    Ok(Some(relocated))
}

/// Replace the system identifier of the document type declaration.
///
/// Returns `None` when there is no declaration with a system identifier.
pub fn update_doctype_system_id(content: &str, system_id: &str) -> Option<String> {
    let caps = RE_DOCTYPE_SYSTEM_ID.captures(content)?;
    let whole = caps.get(0)?;
    let external_id = caps.get(1)?;
    let quoted = if system_id.contains('"') {
        format!("'{}'", system_id)
    } else {
        format!("\"{}\"", system_id)
    };
    Some(format!(
        "{}{}{}{}",
        &content[..whole.start()],
        external_id.as_str(),
        quoted,
        &content[whole.end()..]
    ))
}
