//! steps::registry
//!
//! Lookup table from step type tag to schema contract.
//!
//! # Design
//!
//! The loader and the resolver never name concrete step implementations;
//! they ask the registry for the contract behind a tag. Callers populate
//! the registry with the built-ins, their own contracts, or both.
//!
//! The tag [`COMPOSITE_STEP_TYPE`] is reserved: composite steps are
//! resolved by the lineage resolver itself and cannot be registered.
//!
//! # Example
//!
//! ```
//! use translineage::steps::StepRegistry;
//!
//! let registry = StepRegistry::with_builtins();
//! assert!(registry.contains("dummy"));
//! assert!(registry.is_known("mapping"));
//! assert!(!registry.is_known("teleport"));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::builtin;
use super::traits::StepSchemaContract;
use crate::core::graph::COMPOSITE_STEP_TYPE;

/// Errors from registry updates.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("step type '{0}' is reserved for composite steps")]
    Reserved(String),

    #[error("step type tag cannot be empty")]
    EmptyTag,
}

/// Registered step types.
#[derive(Clone, Default)]
pub struct StepRegistry {
    contracts: BTreeMap<String, Arc<dyn StepSchemaContract>>,
}

impl StepRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in step type.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let builtins: [(&str, Arc<dyn StepSchemaContract>); 7] = [
            (builtin::ROW_GENERATOR, Arc::new(builtin::RowGenerator)),
            (builtin::DUMMY, Arc::new(builtin::PassThrough)),
            (builtin::MAPPING_INPUT, Arc::new(builtin::MappingInput)),
            (builtin::MAPPING_OUTPUT, Arc::new(builtin::PassThrough)),
            (builtin::STREAM_LOOKUP, Arc::new(builtin::StreamLookup)),
            (builtin::SELECT_VALUES, Arc::new(builtin::SelectValues)),
            (builtin::ADD_CONSTANTS, Arc::new(builtin::AddConstants)),
        ];
        for (tag, contract) in builtins {
            registry.contracts.insert(tag.to_string(), contract);
        }
        registry
    }

    /// Register (or replace) the contract for a tag.
    ///
    /// # Errors
    ///
    /// - `RegistryError::Reserved` for the composite tag
    /// - `RegistryError::EmptyTag` for a blank tag
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        contract: Arc<dyn StepSchemaContract>,
    ) -> Result<(), RegistryError> {
        let tag = tag.into();
        if tag.trim().is_empty() {
            return Err(RegistryError::EmptyTag);
        }
        if tag == COMPOSITE_STEP_TYPE {
            return Err(RegistryError::Reserved(tag));
        }
        self.contracts.insert(tag, contract);
        Ok(())
    }

    /// Contract for a tag.
    pub fn get(&self, tag: &str) -> Option<&Arc<dyn StepSchemaContract>> {
        self.contracts.get(tag)
    }

    /// Whether a contract is registered for `tag`.
    pub fn contains(&self, tag: &str) -> bool {
        self.contracts.contains_key(tag)
    }

    /// Whether the loader can accept steps of this type.
    pub fn is_known(&self, tag: &str) -> bool {
        tag == COMPOSITE_STEP_TYPE || self.contains(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.contracts.keys().map(String::as_str)
    }
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("tags", &self.tags().collect::<Vec<_>>())
            .finish()
    }
}
