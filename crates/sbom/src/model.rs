//! CycloneDX document model.
//!
//! Only the subset of CycloneDX 1.4 the prefetcher emits is modeled:
//! a bill of materials with tool metadata and a flat component list.
//! Serialization field names follow the CycloneDX JSON schema.

use serde::{Deserialize, Serialize};

/// Name of the provenance property attached to every component.
pub const FOUND_BY_PROPERTY: &str = "airlock:found_by";

/// A CycloneDX name/value property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    /// Property name.
    pub name: String,
    /// Property value.
    pub value: String,
}

impl Property {
    /// Create a property.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The provenance property recording which tool reported a component.
    #[must_use]
    pub fn found_by() -> Self {
        Self::new(FOUND_BY_PROPERTY, airlock_core::TOOL_NAME)
    }
}

/// A component reported in the bill of materials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// CycloneDX component type. Always `library` for fetched packages.
    #[serde(rename = "type")]
    pub component_type: String,
    /// Component name.
    pub name: String,
    /// Component version, when the ecosystem pins one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Package URL identifying the component.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purl: Option<String>,
    /// Component properties.
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl Component {
    /// Create a library component.
    #[must_use]
    pub fn library(
        name: impl Into<String>,
        version: Option<String>,
        purl: Option<String>,
    ) -> Self {
        Self {
            component_type: "library".to_string(),
            name: name.into(),
            version,
            purl,
            properties: Vec::new(),
        }
    }

    /// Identity used for deduplication and ordering.
    ///
    /// The purl is the preferred identity; components without one fall
    /// back to `name:version`. The key is internal and never serialized.
    #[must_use]
    pub fn key(&self) -> String {
        match &self.purl {
            Some(purl) => purl.clone(),
            None => format!("{}:{}", self.name, self.version.as_deref().unwrap_or("None")),
        }
    }
}

/// A tool listed in the document metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool vendor.
    pub vendor: String,
    /// Tool name.
    pub name: String,
}

impl Default for Tool {
    fn default() -> Self {
        Self {
            vendor: airlock_core::TOOL_VENDOR.to_string(),
            name: airlock_core::TOOL_NAME.to_string(),
        }
    }
}

/// Document metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Tools that produced the document.
    pub tools: Vec<Tool>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            tools: vec![Tool::default()],
        }
    }
}
