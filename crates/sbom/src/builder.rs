//! Bill of materials assembly.
//!
//! Backends report components in whatever order fetching produced them,
//! possibly with duplicates when several workspaces pin the same
//! dependency. [`Sbom::from_components`] normalizes that raw list into a
//! reproducible document: provenance is attached, duplicates collapse,
//! and components are sorted so byte-identical inputs yield
//! byte-identical output.

use crate::model::{Component, Metadata, Property};
use airlock_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// A CycloneDX 1.4 bill of materials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sbom {
    /// Always `CycloneDX`.
    pub bom_format: String,
    /// CycloneDX schema version.
    pub spec_version: String,
    /// Document version.
    pub version: u32,
    /// Document metadata.
    pub metadata: Metadata,
    /// Reported components, deduplicated and sorted by identity key.
    pub components: Vec<Component>,
}

impl Default for Sbom {
    fn default() -> Self {
        Self {
            bom_format: "CycloneDX".to_string(),
            spec_version: "1.4".to_string(),
            version: 1,
            metadata: Metadata::default(),
            components: Vec::new(),
        }
    }
}

impl Sbom {
    /// Build a normalized document from raw components.
    ///
    /// Normalization happens here, at construction, rather than in
    /// serialization hooks: every component gains the provenance property
    /// (prepended unless already present), duplicates by
    /// [`Component::key`] collapse keeping the first occurrence, and the
    /// survivors are sorted by key. The result is invariant under input
    /// permutation and under re-normalization.
    #[must_use]
    pub fn from_components(components: Vec<Component>) -> Self {
        Self {
            components: normalize(components),
            ..Self::default()
        }
    }

    /// Serialize the document to pretty-printed JSON with a trailing
    /// newline.
    pub fn to_json_string(&self) -> Result<String> {
        let mut rendered = serde_json::to_string_pretty(self)?;
        rendered.push('\n');
        Ok(rendered)
    }

    /// Write the document to `path`.
    pub fn write(&self, path: &Path) -> Result<()> {
        let rendered = self.to_json_string()?;
        std::fs::write(path, rendered)
            .map_err(|source| Error::io_with_path(source, path, "writing SBOM"))
    }
}

fn normalize(mut components: Vec<Component>) -> Vec<Component> {
    let provenance = Property::found_by();
    for component in &mut components {
        if !component.properties.contains(&provenance) {
            component.properties.insert(0, provenance.clone());
        }
    }

    let mut seen = HashSet::new();
    components.retain(|component| seen.insert(component.key()));
    components.sort_by_cached_key(Component::key);
    components
}
