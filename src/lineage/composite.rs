//! lineage::composite
//!
//! Output schema of composite (mapping) steps.
//!
//! A composite step's output is the output of the exit step of its
//! embedded graph, computed with the composite's own input injected at the
//! entry step:
//!
//! 1. Resolve the composite's input in the outer frame
//! 2. Rename parent-side fields to their child-side names
//! 3. Open a child frame one level deeper, with a fresh cache and the
//!    renamed input injected at the entry step
//! 4. Resolve the exit step in the child frame
//! 5. Rename child-side fields back to their parent-side names
//!
//! The child frame shares the caller's active path, so a graph that embeds
//! itself (directly or through linked files) is reported as a cycle rather
//! than running into the nesting bound.

use super::{ActivePath, Frame, Injection, LineageResolver, ResolveError, SchemaCache};
use crate::core::graph::MappingDefinition;
use crate::core::schema::Schema;

pub(super) fn resolve<'a>(
    resolver: &LineageResolver<'a>,
    frame: &Frame<'a>,
    index: usize,
    mapping: &MappingDefinition,
    cache: &mut SchemaCache,
    active: &mut ActivePath,
) -> Result<Schema, ResolveError> {
    let graph = frame.graph;
    let step = &graph.steps()[index];

    let external = resolver.input_in_frame(frame, index, cache, active)?.merged;
    let injected = external
        .renamed_with(|name| mapping.to_child(name))
        .map_err(|e| ResolveError::duplicate(graph, step, e))?;

    let depth = frame.depth + 1;
    let max = resolver.options.max_nesting_depth;
    if depth > max {
        return Err(ResolveError::NestedResolutionDepthExceeded {
            graph: graph.id().clone(),
            step: step.name().to_string(),
            max,
        });
    }

    let embedded = resolver.graph(&mapping.graph)?;
    let entry = LineageResolver::locate(embedded, &mapping.entry_step)?;
    let exit = LineageResolver::locate(embedded, &mapping.exit_step)?;

    tracing::debug!(
        graph = %graph.id(),
        step = step.name(),
        embedded = %embedded.id(),
        depth,
        "entering embedded graph"
    );

    let child = Frame {
        graph: embedded,
        depth,
        injection: Some(Injection {
            step: entry,
            schema: injected,
        }),
    };
    let mut child_cache = SchemaCache::for_graph(resolver.transformation.instance(), embedded.id());
    let inner = resolver.output_in_frame(&child, exit, &mut child_cache, active)?;

    inner
        .renamed_with(|name| mapping.to_parent(name))
        .map_err(|e| ResolveError::duplicate(graph, step, e))
}
