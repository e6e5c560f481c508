//! core
//!
//! Core domain types, schemas, and loading for translineage.
//!
//! # Modules
//!
//! - [`types`] - Strong types: StepName, GraphId, QualifiedStep
//! - [`schema`] - Field descriptors and ordered schemas
//! - [`graph`] - Step graph representation and queries
//! - [`resources`] - Shared resource pool and scope merging
//! - [`transformation`] - Root graph plus embedded graphs
//! - [`definition`] - Definition file schema and loading
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Everything is read-only once loaded

pub mod config;
pub mod definition;
pub mod graph;
pub mod resources;
pub mod schema;
pub mod transformation;
pub mod types;
