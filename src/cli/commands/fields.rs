//! fields command - Show the resolved schema of a step

use std::path::Path;

use anyhow::{Context as _, Result};

use super::Session;
use crate::cli::Context;
use crate::ui::output;

/// Print the output (or input) schema of a root-graph step.
pub fn fields(ctx: &Context, file: &Path, step: &str, input: bool, json: bool) -> Result<()> {
    let session = Session::open(ctx)?;
    let transformation = session.load(file)?;
    let resolver = session.resolver(&transformation);

    let (schema, side) = if input {
        (resolver.input_schema(step), "input")
    } else {
        (resolver.output_schema(step), "output")
    };
    let schema =
        schema.with_context(|| format!("Failed to resolve {side} fields of step '{step}'"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&schema)?);
    } else if schema.is_empty() {
        output::print(format!("Step '{step}' has no {side} fields"), ctx.verbosity);
    } else {
        println!("{}", output::format_schema(&schema));
    }

    Ok(())
}
