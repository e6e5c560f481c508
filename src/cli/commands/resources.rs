//! resources command - Show resources after merging with the shared pool

use std::path::Path;

use anyhow::Result;

use super::Session;
use crate::cli::Context;
use crate::ui::output;

/// Print the resolved resource lists of the root graph.
pub fn resources(ctx: &Context, file: &Path, json: bool) -> Result<()> {
    let session = Session::open(ctx)?;
    let transformation = session.load(file)?;
    let resources = transformation.resources();

    if json {
        println!("{}", serde_json::to_string_pretty(resources)?);
        return Ok(());
    }

    println!("{}", output::format_resources(resources));
    let private = resources.private_database_names();
    if !private.is_empty() {
        output::print(
            format!("\nPrivate databases: {}", private.join(", ")),
            ctx.verbosity,
        );
    }
    Ok(())
}
