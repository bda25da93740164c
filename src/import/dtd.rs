//! DTD scanning
//!
//! Finds external parameter entity declarations, the references a DTD (or a
//! document type internal subset) makes to other DTDs.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("Invalid regex"));
static RE_EXTERNAL_PARAMETER_ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"<!ENTITY\s+%\s+([^\s%;"']+)\s+(?:PUBLIC\s+(?:"([^"]*)"|'([^']*)')\s+(?:"([^"]*)"|'([^']*)')|SYSTEM\s+(?:"([^"]*)"|'([^']*)'))"#,
    )
    .expect("Invalid regex")
});

/// An external entity reference declared in a DTD
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityReference {
    pub name: String,
    pub public_id: Option<String>,
    /// System identifier as written, may be relative
    pub system_id: String,
}

/// Find the external parameter entities declared in DTD text
///
/// # Example
///
/// ```rust
/// use xml_resource_import::import::dtd::external_entities;
///
/// let refs = external_entities(r#"<!ENTITY % types SYSTEM "types.dtd"> %types;"#);
/// assert_eq!(refs.len(), 1);
/// assert_eq!(refs[0].system_id, "types.dtd");
/// ```
pub fn external_entities(content: &str) -> Vec<EntityReference> {
    let content = RE_COMMENT.replace_all(content, "");
    RE_EXTERNAL_PARAMETER_ENTITY
        .captures_iter(&content)
        .filter_map(|caps| {
            let text = |i: usize| caps.get(i).map(|m| m.as_str().to_string());
            let name = text(1)?;
            let public_id = text(2).or_else(|| text(3));
            let system_id = text(4)
                .or_else(|| text(5))
                .or_else(|| text(6))
                .or_else(|| text(7))?;
            Some(EntityReference {
                name,
                public_id,
                system_id,
            })
        })
        .collect()
}
