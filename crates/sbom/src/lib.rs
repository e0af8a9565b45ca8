//! CycloneDX SBOM model and builder for airlock.
//!
//! Every fetch produces a software bill of materials listing the
//! components that were downloaded and verified. This crate models the
//! CycloneDX 1.4 subset airlock emits and normalizes raw component lists
//! into reproducible documents.
//!
//! # Determinism
//!
//! [`Sbom::from_components`] owns all normalization: provenance
//! properties, deduplication by component identity, and byte-wise
//! ordering. Feeding the same components in any order produces the same
//! document, which keeps SBOM diffs meaningful across runs.
//!
//! # Example
//!
//! ```rust,ignore
//! use airlock_sbom::{Component, Sbom};
//!
//! let components = vec![
//!     Component::library("chai", Some("4.3.6".into()), Some("pkg:npm/chai@4.3.6".into())),
//! ];
//! let sbom = Sbom::from_components(components);
//! sbom.write(output_dir.join("bom.json").as_path())?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod builder;
pub mod model;
pub mod purl;

// Re-export the document types
pub use builder::Sbom;
pub use model::{Component, FOUND_BY_PROPERTY, Metadata, Property, Tool};
