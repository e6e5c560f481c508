//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`output`] - Output formatting, verbosity, and log installation
//!
//! # Design
//!
//! All user-facing output goes through this module to keep formatting and
//! quiet-mode handling consistent across commands.

pub mod output;
