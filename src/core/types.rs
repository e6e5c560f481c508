//! core::types
//!
//! Strong types for identifiers shared across the crate.
//!
//! # Types
//!
//! - [`StepName`] - Validated step name
//! - [`GraphId`] - Identity of one graph inside a loaded transformation
//! - [`QualifiedStep`] - A step name qualified by the graph that owns it
//!
//! # Validation
//!
//! These types enforce validity at construction time so the loader can
//! reject bad names before any graph is built.
//!
//! # Examples
//!
//! ```
//! use translineage::core::types::{GraphId, QualifiedStep, StepName};
//!
//! let step = StepName::new("lookup").unwrap();
//! let graph = GraphId::new("pdi-13634").unwrap();
//! let child = graph.child("mapper");
//! assert_eq!(child.as_str(), "pdi-13634/mapper");
//!
//! let qualified = QualifiedStep::new(child, step.as_str());
//! assert_eq!(qualified.to_string(), "pdi-13634/mapper::lookup");
//!
//! assert!(StepName::new("").is_err());
//! assert!(StepName::new("  ").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid step name: {0}")]
    InvalidStepName(String),

    #[error("invalid graph id: {0}")]
    InvalidGraphId(String),
}

/// A validated step name.
///
/// Step names must:
/// - Not be empty or whitespace only
/// - Not start or end with whitespace
/// - Not contain control characters
///
/// Comparison between step names inside a graph is case-insensitive; this
/// type preserves the declared spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StepName(String);

impl StepName {
    /// Create a new validated step name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidStepName` if the name is empty, padded
    /// with whitespace, or contains control characters.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name.trim().is_empty() {
            return Err(TypeError::InvalidStepName(
                "step name cannot be empty".into(),
            ));
        }
        if name.trim() != name {
            return Err(TypeError::InvalidStepName(format!(
                "step name '{name}' cannot start or end with whitespace"
            )));
        }
        if name.chars().any(|c| c.is_control()) {
            return Err(TypeError::InvalidStepName(
                "step name cannot contain control characters".into(),
            ));
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StepName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<StepName> for String {
    fn from(name: StepName) -> Self {
        name.0
    }
}

impl AsRef<str> for StepName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StepName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a graph inside a transformation.
///
/// The root graph and linked sub-graph files use their canonical file path
/// (or the declared name when loaded from a string). Inline embedded graphs
/// are identified as `<parent>/<step>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GraphId(String);

impl GraphId {
    /// Create a new graph id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidGraphId` if the id is empty.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(TypeError::InvalidGraphId("graph id cannot be empty".into()));
        }
        Ok(Self(id))
    }

    /// Id for a graph embedded inline in `step` of this graph.
    pub fn child(&self, step: &str) -> GraphId {
        GraphId(format!("{}/{}", self.0, step))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for GraphId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<GraphId> for String {
    fn from(id: GraphId) -> Self {
        id.0
    }
}

impl std::fmt::Display for GraphId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A step qualified by its owning graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedStep {
    pub graph: GraphId,
    pub step: String,
}

impl QualifiedStep {
    pub fn new(graph: GraphId, step: impl Into<String>) -> Self {
        Self {
            graph,
            step: step.into(),
        }
    }
}

impl std::fmt::Display for QualifiedStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.graph, self.step)
    }
}
