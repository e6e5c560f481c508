//! translineage - Schema lineage for graphs of data-processing steps
//!
//! translineage computes, without running anything, the ordered fields each
//! step of a transformation receives and emits. Transformations may embed
//! whole sub-graphs through composite (mapping) steps, and carry resource
//! declarations that are merged with a shared resource pool.
//!
//! # Architecture
//!
//! - [`core`] - Domain types, schemas, graphs, resources, loading, config
//! - [`steps`] - Step schema contracts and the step registry
//! - [`lineage`] - Schema lineage resolution
//! - [`cli`] - Command-line interface layer
//! - [`ui`] - Output formatting
//!
//! # Correctness Invariants
//!
//! 1. Loaded transformations are never mutated by resolution
//! 2. Every returned schema is owned by the caller
//! 3. Cycles and runaway nesting end in errors, never in unbounded recursion

pub mod cli;
pub mod core;
pub mod lineage;
pub mod steps;
pub mod ui;
