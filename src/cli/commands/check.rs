//! check command - Validate a definition

use std::path::Path;

use anyhow::{bail, Result};

use super::Session;
use crate::cli::Context;
use crate::lineage::SchemaCache;
use crate::ui::output;

/// Load a definition, report cycles, and resolve every root step.
///
/// Fails if any graph has a cycle over enabled hops or any step cannot be
/// resolved. Every problem is reported before failing.
pub fn check(ctx: &Context, file: &Path) -> Result<()> {
    let session = Session::open(ctx)?;
    let transformation = session.load(file)?;
    let mut problems = 0usize;

    for graph in transformation.graphs() {
        if let Some(step) = graph.find_cycle() {
            output::error(format!(
                "graph '{}' has a cycle through step '{}'",
                graph.id(),
                step
            ));
            problems += 1;
        }
    }

    for graph in transformation.graphs() {
        tracing::debug!(graph = %graph.id(), steps = ?graph.step_type_counts(), "graph loaded");
    }

    let resolver = session.resolver(&transformation);
    let mut cache = SchemaCache::new();
    let root = transformation.root();
    for step in root.steps() {
        match resolver.output_schema_cached(step.name(), &mut cache) {
            Ok(schema) => {
                tracing::debug!(step = step.name(), fields = schema.len(), "step resolved");
            }
            Err(e) => {
                output::error(&e);
                problems += 1;
            }
        }
    }

    if problems > 0 {
        bail!("{} problem(s) found in '{}'", problems, file.display());
    }

    output::print(
        format!(
            "{}: {} steps, {} graphs, ok",
            root.name(),
            root.steps().len(),
            transformation.graphs().count()
        ),
        ctx.verbosity,
    );
    Ok(())
}
