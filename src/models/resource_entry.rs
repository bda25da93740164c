//! Registry records for global resources

use super::enums::ResourceType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted global resource (schema or DTD)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEntry {
    pub id: Uuid,
    pub uri: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub content_type: String,
    pub content: String,
    /// Target namespace for schemas, public identifier for DTDs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_key1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ResourceEntry {
    /// Create a new entry with a random id and the MIME type of the resource type
    pub fn new(
        uri: impl Into<String>,
        resource_type: ResourceType,
        content: impl Into<String>,
        resource_key1: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            uri: uri.into(),
            resource_type,
            content_type: resource_type.mime_type().to_string(),
            content: content.into(),
            resource_key1,
            description: None,
        }
    }

    pub fn header(&self) -> ResourceEntryHeader {
        ResourceEntryHeader {
            id: self.id,
            uri: self.uri.clone(),
            resource_type: self.resource_type,
            resource_key1: self.resource_key1.clone(),
            description: self.description.clone(),
        }
    }
}

/// Summary of a [`ResourceEntry`] without its content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEntryHeader {
    pub id: Uuid,
    pub uri: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_key1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
