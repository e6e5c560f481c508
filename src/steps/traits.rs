//! steps::traits
//!
//! The schema contract every step type implements.
//!
//! # Design
//!
//! A contract maps the schemas arriving at a step, plus the step's own
//! configuration, to the schema the step emits. Contracts are synchronous
//! and pure: they borrow their inputs and return freshly built schemas.
//! They are shared between threads through the [`super::StepRegistry`], so
//! implementations must be `Send + Sync`.
//!
//! # Example
//!
//! ```
//! use translineage::core::schema::{FieldDescriptor, Schema, ValueType};
//! use translineage::steps::{StepContext, StepContractError, StepInput, StepSchemaContract};
//!
//! /// Appends a fixed audit column.
//! struct AuditColumn;
//!
//! impl StepSchemaContract for AuditColumn {
//!     fn output_schema(
//!         &self,
//!         _step: &StepContext<'_>,
//!         input: &StepInput,
//!     ) -> Result<Schema, StepContractError> {
//!         let mut out = input.merged.clone();
//!         out.push(FieldDescriptor::new("audited_at", ValueType::Timestamp))
//!             .map_err(|_| StepContractError::DuplicateField("audited_at".into()))?;
//!         Ok(out)
//!     }
//! }
//! ```

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::core::graph::StepConfig;
use crate::core::schema::Schema;

/// Errors a contract reports when it cannot produce an output schema.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StepContractError {
    /// The step's configuration is malformed for its type.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A field the configuration relies on is not present in the input.
    #[error("field not found in input: {0}")]
    MissingField(String),

    /// The step would emit two fields with the same name.
    #[error("duplicate output field: {0}")]
    DuplicateField(String),
}

/// What a contract knows about the step it is computing.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub name: &'a str,
    pub step_type: &'a str,
    pub config: &'a StepConfig,
}

impl StepContext<'_> {
    /// Deserialize the step's configuration into a typed value.
    ///
    /// # Errors
    ///
    /// Returns `StepContractError::InvalidConfig` if the table does not
    /// match `T`.
    pub fn parse_config<T: DeserializeOwned>(&self) -> Result<T, StepContractError> {
        toml::Value::Table(self.config.table().clone())
            .try_into()
            .map_err(|e: toml::de::Error| {
                StepContractError::InvalidConfig(e.to_string().trim().to_string())
            })
    }
}

/// One incoming stream: the upstream step and the schema it delivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputStream {
    pub from: String,
    pub schema: Schema,
}

/// Everything arriving at a step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepInput {
    /// The merged input schema, as returned by input resolution.
    pub merged: Schema,
    /// Per-hop schemas in enabled-hop declaration order. Empty when the
    /// input was injected at the entry of an embedded graph.
    pub streams: Vec<InputStream>,
}

impl StepInput {
    /// Input made of an already merged schema only.
    pub fn merged_only(merged: Schema) -> Self {
        Self {
            merged,
            streams: Vec::new(),
        }
    }

    /// Case-insensitive stream lookup by upstream step name.
    pub fn stream(&self, from: &str) -> Option<&InputStream> {
        self.streams.iter().find(|s| s.from.eq_ignore_ascii_case(from))
    }
}

/// Computes a step type's output schema.
pub trait StepSchemaContract: Send + Sync {
    /// Produce the output schema for `step` given `input`.
    ///
    /// Source steps ignore `input` and derive the schema from configuration.
    fn output_schema(
        &self,
        step: &StepContext<'_>,
        input: &StepInput,
    ) -> Result<Schema, StepContractError>;
}

impl<F> StepSchemaContract for F
where
    F: Fn(&StepContext<'_>, &StepInput) -> Result<Schema, StepContractError> + Send + Sync,
{
    fn output_schema(
        &self,
        step: &StepContext<'_>,
        input: &StepInput,
    ) -> Result<Schema, StepContractError> {
        self(step, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Sample {
        limit: u32,
    }

    fn config(src: &str) -> StepConfig {
        StepConfig::new(toml::from_str(src).unwrap())
    }

    #[test]
    fn parse_config_typed() {
        let cfg = config("limit = 5");
        let ctx = StepContext {
            name: "s",
            step_type: "sample",
            config: &cfg,
        };
        let parsed: Sample = ctx.parse_config().unwrap();
        assert_eq!(parsed.limit, 5);
    }

    #[test]
    fn parse_config_reports_invalid() {
        let cfg = config("limit = \"five\"");
        let ctx = StepContext {
            name: "s",
            step_type: "sample",
            config: &cfg,
        };
        let err = ctx.parse_config::<Sample>().unwrap_err();
        assert!(matches!(err, StepContractError::InvalidConfig(_)));
    }

    #[test]
    fn closures_are_contracts() {
        let contract =
            |_: &StepContext<'_>, input: &StepInput| -> Result<Schema, StepContractError> {
                Ok(input.merged.clone())
            };
        let cfg = StepConfig::default();
        let ctx = StepContext {
            name: "s",
            step_type: "closure",
            config: &cfg,
        };
        let out = contract.output_schema(&ctx, &StepInput::default()).unwrap();
        assert!(out.is_empty());
    }
}
