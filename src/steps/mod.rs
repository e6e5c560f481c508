//! steps
//!
//! Step types and their schema contracts.
//!
//! # Modules
//!
//! - [`traits`] - The [`StepSchemaContract`] trait and its inputs
//! - [`registry`] - Tag to contract lookup table
//! - [`builtin`] - Contracts for the step types shipped with the crate

pub mod builtin;
pub mod registry;
pub mod traits;

pub use registry::{RegistryError, StepRegistry};
pub use traits::{InputStream, StepContext, StepContractError, StepInput, StepSchemaContract};
