//! core::definition::schema
//!
//! Definition file schema (v1).
//!
//! # Schema Design
//!
//! A definition file is TOML and:
//! - Is self-describing with `kind` and `schema_version`
//! - Is strictly parsed (unknown fields rejected)
//! - Keeps step configuration opaque (interpreted by step contracts)
//!
//! Inline sub-graphs embedded in a composite step use the same shape;
//! `kind` and `schema_version` are optional there.
//!
//! # Example
//!
//! ```
//! use translineage::core::definition::schema::parse_definition;
//!
//! let doc = parse_definition(r#"
//!     kind = "translineage.transformation"
//!     schema_version = 1
//!     name = "example"
//!
//!     [[steps]]
//!     name = "generator"
//!     type = "row_generator"
//!     [steps.config]
//!     fields = [{ name = "value", type = "string" }]
//!
//!     [[steps]]
//!     name = "out"
//!     type = "dummy"
//!
//!     [[hops]]
//!     from = "generator"
//!     to = "out"
//! "#).unwrap();
//!
//! assert_eq!(doc.name, "example");
//! assert_eq!(doc.steps.len(), 2);
//! assert!(doc.hops[0].enabled);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The kind identifier for definition files.
pub const DEFINITION_KIND: &str = "translineage.transformation";

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from definition parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("failed to parse definition: {0}")]
    ParseError(String),

    #[error("invalid kind '{found}', expected '{}'", DEFINITION_KIND)]
    InvalidKind { found: String },

    #[error("unsupported schema version {0}, supported: {SCHEMA_VERSION}")]
    UnsupportedVersion(u32),
}

/// Envelope for version dispatch before full parsing.
#[derive(Debug, Deserialize)]
struct DefinitionEnvelope {
    kind: String,
    schema_version: u32,
}

/// Parse a definition file with version dispatch.
///
/// # Errors
///
/// Returns an error if:
/// - The TOML is malformed or misses required fields
/// - The `kind` field doesn't match [`DEFINITION_KIND`]
/// - The `schema_version` is not supported
pub fn parse_definition(contents: &str) -> Result<GraphDocument, DefinitionError> {
    let envelope: DefinitionEnvelope =
        toml::from_str(contents).map_err(|e| DefinitionError::ParseError(e.to_string()))?;

    check_envelope(Some(&envelope.kind), Some(envelope.schema_version))?;

    match envelope.schema_version {
        1 => toml::from_str(contents).map_err(|e| DefinitionError::ParseError(e.to_string())),
        v => Err(DefinitionError::UnsupportedVersion(v)),
    }
}

/// Validate `kind` and `schema_version` when present.
pub fn check_envelope(kind: Option<&str>, version: Option<u32>) -> Result<(), DefinitionError> {
    if let Some(kind) = kind {
        if kind != DEFINITION_KIND {
            return Err(DefinitionError::InvalidKind {
                found: kind.to_string(),
            });
        }
    }
    if let Some(v) = version {
        if v != SCHEMA_VERSION {
            return Err(DefinitionError::UnsupportedVersion(v));
        }
    }
    Ok(())
}

/// One graph as written in a definition file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GraphDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub steps: Vec<StepEntry>,

    #[serde(default)]
    pub hops: Vec<HopEntry>,

    #[serde(default)]
    pub databases: Vec<DatabaseEntry>,

    #[serde(default)]
    pub partition_schemas: Vec<ResourceEntry>,

    #[serde(default)]
    pub cluster_schemas: Vec<ResourceEntry>,

    #[serde(default)]
    pub slave_servers: Vec<ResourceEntry>,
}

/// A declared step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StepEntry {
    pub name: String,

    /// Step type tag, resolved against the step registry
    #[serde(rename = "type")]
    pub step_type: String,

    /// Opaque configuration for the step's contract
    #[serde(default)]
    pub config: toml::Table,

    /// Composite steps only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<MappingEntry>,
}

/// Composite step linkage.
///
/// Exactly one of `path` and `transformation` must be set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MappingEntry {
    /// Linked definition file, relative to the declaring file's directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Inline sub-graph
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformation: Option<Box<GraphDocument>>,

    /// Entry step inside the sub-graph
    pub input_step: String,

    /// Exit step inside the sub-graph
    pub output_step: String,

    #[serde(default)]
    pub renames: Vec<RenameEntry>,
}

/// One rename pair of a composite step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RenameEntry {
    pub parent: String,
    pub child: String,
}

/// A declared hop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HopEntry {
    pub from: String,
    pub to: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

/// A declared database connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DatabaseEntry {
    pub name: String,

    /// Origin marker: the connection is exported to the shared pool
    #[serde(default)]
    pub shared: bool,

    #[serde(default)]
    pub parameters: toml::Table,
}

/// A declared partition schema, cluster schema or slave server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ResourceEntry {
    pub name: String,

    #[serde(default)]
    pub parameters: toml::Table,
}
