//! Enums for resource import
//!
//! # Serde Casing Conventions
//!
//! - `snake_case`: policy values that appear in configuration files (ImportChoice, ImportOption)
//! - `SCREAMING_SNAKE_CASE`: registry resource types (ResourceType), matching stored entries
//! - `lowercase`: query-time filters (DependencyScope)

use serde::{Deserialize, Serialize};

/// Type of a global resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    XmlSchema,
    Dtd,
}

impl ResourceType {
    /// All resource types, in detection order
    pub const ALL: [ResourceType; 2] = [ResourceType::XmlSchema, ResourceType::Dtd];

    pub fn mime_type(&self) -> &'static str {
        match self {
            ResourceType::XmlSchema => "text/xml",
            ResourceType::Dtd => "application/xml-dtd",
        }
    }

    pub fn filename_suffix(&self) -> &'static str {
        match self {
            ResourceType::XmlSchema => "xsd",
            ResourceType::Dtd => "dtd",
        }
    }

    /// Whether documents of this type are XML documents.
    ///
    /// DTDs use their own syntax and are not XML.
    pub fn is_xml(&self) -> bool {
        matches!(self, ResourceType::XmlSchema)
    }

    /// Find the resource type whose filename suffix ends the given path or URI
    ///
    /// # Example
    ///
    /// ```rust
    /// use xml_resource_import::models::ResourceType;
    ///
    /// assert_eq!(ResourceType::from_path_suffix("http://host/a.XSD"), Some(ResourceType::XmlSchema));
    /// assert_eq!(ResourceType::from_path_suffix("file:/tmp/types.dtd"), Some(ResourceType::Dtd));
    /// assert_eq!(ResourceType::from_path_suffix("urn:example"), None);
    /// ```
    pub fn from_path_suffix(path: &str) -> Option<ResourceType> {
        let lower = path.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| lower.ends_with(&format!(".{}", t.filename_suffix())))
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::XmlSchema => write!(f, "XML Schema"),
            ResourceType::Dtd => write!(f, "DTD"),
        }
    }
}

/// The current choice for an import option.
///
/// Not all choices are applicable to all options, see [`ImportOption::allows`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportChoice {
    /// No current selection
    #[default]
    None,
    /// Use the existing resource
    Existing,
    /// Update the content of the existing resource
    UpdateContent,
    /// Update the existing resource and its metadata (such as URI)
    UpdateAll,
    /// Import the new resource
    Import,
    /// Skip the resource and all resources that depend on it
    Skip,
}

impl std::fmt::Display for ImportChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ImportChoice::None => "none",
            ImportChoice::Existing => "existing",
            ImportChoice::UpdateContent => "update_content",
            ImportChoice::UpdateAll => "update_all",
            ImportChoice::Import => "import",
            ImportChoice::Skip => "skip",
        };
        write!(f, "{}", name)
    }
}

/// Class of import conflict (or problem) that requires a choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportOption {
    /// A dependency target namespace matches multiple existing resources
    AmbiguousTargetNamespace,
    /// A dependency public identifier matches multiple existing resources
    AmbiguousPublicId,
    /// A dependency URI matches an existing resource
    ConflictingUri,
    /// A dependency target namespace matches an existing resource
    ConflictingTargetNamespace,
    /// A dependency public identifier matches an existing resource
    ConflictingPublicId,
    /// A dependency is missing or invalid
    MissingResource,
}

impl ImportOption {
    pub const ALL: [ImportOption; 6] = [
        ImportOption::AmbiguousTargetNamespace,
        ImportOption::AmbiguousPublicId,
        ImportOption::ConflictingUri,
        ImportOption::ConflictingTargetNamespace,
        ImportOption::ConflictingPublicId,
        ImportOption::MissingResource,
    ];

    /// The choices that may be applied for this option
    pub fn import_choices(&self) -> &'static [ImportChoice] {
        use ImportChoice::*;
        match self {
            ImportOption::AmbiguousTargetNamespace | ImportOption::AmbiguousPublicId => {
                &[Existing, Import, Skip]
            }
            ImportOption::ConflictingUri => &[Existing, UpdateAll, Skip],
            ImportOption::ConflictingTargetNamespace | ImportOption::ConflictingPublicId => {
                &[Existing, UpdateContent, UpdateAll, Import, Skip]
            }
            ImportOption::MissingResource => &[Import, Skip],
        }
    }

    /// Check if a choice is legal for this option.
    ///
    /// `ImportChoice::None` (no selection) is always accepted.
    pub fn allows(&self, choice: ImportChoice) -> bool {
        choice == ImportChoice::None || self.import_choices().contains(&choice)
    }
}

impl std::fmt::Display for ImportOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ImportOption::AmbiguousTargetNamespace => "ambiguous_target_namespace",
            ImportOption::AmbiguousPublicId => "ambiguous_public_id",
            ImportOption::ConflictingUri => "conflicting_uri",
            ImportOption::ConflictingTargetNamespace => "conflicting_target_namespace",
            ImportOption::ConflictingPublicId => "conflicting_public_id",
            ImportOption::MissingResource => "missing_resource",
        };
        write!(f, "{}", name)
    }
}

/// Filter for dependency queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyScope {
    #[default]
    All,
    Direct,
    Transitive,
}
