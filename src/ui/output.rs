//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! User-facing text goes to stdout and respects the quiet flag. Diagnostics
//! go through `tracing` to stderr; [`init_tracing`] installs the subscriber
//! with a filter derived from the verbosity, which `RUST_LOG` overrides.
//! When `--json` is enabled, command output is machine-readable JSON.

use std::fmt::Display;

use tracing_subscriber::EnvFilter;

use crate::core::resources::{ResolvedResourceSet, ResourceCategory};
use crate::core::schema::Schema;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }

    /// Default log filter for this verbosity.
    pub fn filter(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Debug => "translineage=debug",
        }
    }
}

/// Install the stderr log subscriber.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(verbosity: Verbosity) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a schema as an aligned table.
///
/// ```
/// use translineage::core::schema::{FieldDescriptor, Schema, ValueType};
/// use translineage::ui::output::format_schema;
///
/// let schema = Schema::from_fields([
///     FieldDescriptor::new("id", ValueType::Integer),
///     FieldDescriptor::new("name", ValueType::String).with_length(40),
/// ]).unwrap();
///
/// let table = format_schema(&schema);
/// assert!(table.lines().nth(2).unwrap().starts_with("1  name"));
/// ```
pub fn format_schema(schema: &Schema) -> String {
    let width = schema
        .iter()
        .map(|f| f.name().len())
        .chain(std::iter::once("field".len()))
        .max()
        .unwrap_or(0);

    let mut lines = vec![format!("#  {:<width$}  type", "field")];
    for field in schema {
        let mut line = format!(
            "{:<2} {:<width$}  {}",
            field.position(),
            field.name(),
            field.value_type()
        );
        match (field.length(), field.precision()) {
            (Some(l), Some(p)) => line.push_str(&format!("({l},{p})")),
            (Some(l), None) => line.push_str(&format!("({l})")),
            (None, Some(p)) => line.push_str(&format!("(,{p})")),
            (None, None) => {}
        }
        lines.push(line);
    }
    lines.join("\n")
}

/// Format resolved resources, one section per category.
///
/// Private entries are marked `(private)`.
pub fn format_resources(resources: &ResolvedResourceSet) -> String {
    let mut sections = Vec::new();
    for category in ResourceCategory::ALL {
        let entries: Vec<String> = resources
            .definitions(category)
            .iter()
            .map(|d| {
                if d.is_shared() {
                    d.name().to_string()
                } else {
                    format!("{} (private)", d.name())
                }
            })
            .collect();
        let body = if entries.is_empty() {
            "  (none)".to_string()
        } else {
            format_list(&entries, "  ")
        };
        sections.push(format!("{}:\n{}", category.section(), body));
    }
    sections.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resources::{ResourceDeclaration, SharedResourcePool};
    use crate::core::schema::{FieldDescriptor, ValueType};

    #[test]
    fn verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn schema_table() {
        let schema = Schema::from_fields([
            FieldDescriptor::new("value", ValueType::String).with_length(10),
            FieldDescriptor::new("amount", ValueType::Number)
                .with_length(9)
                .with_precision(2),
        ])
        .unwrap();

        let table = format_schema(&schema);
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "0  value   string(10)");
        assert_eq!(lines[2], "1  amount  number(9,2)");
    }

    #[test]
    fn resources_mark_private() {
        let mut pool = SharedResourcePool::new();
        pool.add(ResourceCategory::Database, "shared", toml::Table::new())
            .unwrap();
        let set = ResolvedResourceSet::merge(
            &pool,
            &[ResourceDeclaration::private(ResourceCategory::Database, "test")],
        );

        let text = format_resources(&set);
        assert!(text.contains("  shared\n"));
        assert!(text.contains("  test (private)"));
        assert!(text.contains("  (none)"));
    }
}
