//! Integration tests for loading and lineage resolution.
//!
//! These tests load definition files from `tests/fixtures/` and check the
//! resolved schemas and resources end to end.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use translineage::core::definition::{LoadError, Loader};
use translineage::core::resources::{ResourceCategory, SharedResourcePool};
use translineage::core::schema::{MergePolicy, ValueType};
use translineage::core::transformation::Transformation;
use translineage::lineage::{LineageResolver, ResolveError, ResolverOptions, SchemaCache};
use translineage::steps::StepRegistry;

// =============================================================================
// Test Fixtures
// =============================================================================

const HEADER: &str = "kind = \"translineage.transformation\"\nschema_version = 1\n";

fn fixture(path: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(path)
}

fn shared_pool() -> SharedResourcePool {
    SharedResourcePool::load(&fixture("resources/shared.toml")).expect("shared pool loads")
}

fn load(path: &str, pool: &SharedResourcePool) -> Transformation {
    let registry = StepRegistry::with_builtins();
    Loader::new(&registry, pool)
        .load_file(&fixture(path))
        .expect("fixture loads")
}

fn load_str(src: &str) -> Result<Transformation, LoadError> {
    let registry = StepRegistry::with_builtins();
    let pool = SharedResourcePool::new();
    Loader::new(&registry, &pool).load_str(&format!("{HEADER}{src}"), None)
}

// =============================================================================
// Propagation
// =============================================================================

#[test]
fn single_predecessor_input_equals_output() {
    let t = load("pdi_13634/main.toml", &SharedResourcePool::new());
    let registry = StepRegistry::with_builtins();
    let resolver = LineageResolver::new(&t, &registry, ResolverOptions::default());

    let generated = resolver.output_schema("generator").unwrap();
    let received = resolver.input_schema("mapper").unwrap();

    assert_eq!(received, generated);
    assert_eq!(received.names(), vec!["value"]);
    assert_eq!(received.field(0).unwrap().value_type(), ValueType::String);
    assert_eq!(received.field(0).unwrap().length(), Some(10));
}

#[test]
fn composite_output_and_captor_input_agree() {
    let t = load("pdi_13634/main.toml", &SharedResourcePool::new());
    let registry = StepRegistry::with_builtins();
    let resolver = LineageResolver::new(&t, &registry, ResolverOptions::default());

    let mut mapper = resolver.output_schema("mapper").unwrap();
    let mut captor = resolver.input_schema("captor").unwrap();

    assert_eq!(mapper.names(), vec!["value", "new_value"]);
    assert_eq!(captor, mapper);

    mapper.rename("value", "changed").unwrap();
    mapper.field_mut(1).unwrap().set_length(Some(1));
    assert_eq!(captor.names(), vec!["value", "new_value"]);
    assert_eq!(captor.field(1).unwrap().length(), Some(10));

    captor.remove("new_value").unwrap();
    assert_eq!(mapper.len(), 2);

    let again = resolver.output_schema("mapper").unwrap();
    assert_eq!(again.names(), vec!["value", "new_value"]);
}

#[test]
fn resolution_is_idempotent() {
    let t = load("pdi_13634/main.toml", &SharedResourcePool::new());
    let registry = StepRegistry::with_builtins();
    let resolver = LineageResolver::new(&t, &registry, ResolverOptions::default());

    let first = resolver.output_schema("captor").unwrap();
    let second = resolver.output_schema("captor").unwrap();
    assert_eq!(first, second);

    let mut cache = SchemaCache::new();
    let cached = resolver.output_schema_cached("captor", &mut cache).unwrap();
    let hit = resolver.output_schema_cached("captor", &mut cache).unwrap();
    assert_eq!(cached, first);
    assert_eq!(hit, first);
}

#[test]
fn step_names_are_case_insensitive() {
    let t = load("pdi_13634/main.toml", &SharedResourcePool::new());
    let registry = StepRegistry::with_builtins();
    let resolver = LineageResolver::new(&t, &registry, ResolverOptions::default());

    assert!(t.find_step("CAPTOR").is_some());
    assert_eq!(
        resolver.output_schema("Captor").unwrap(),
        resolver.output_schema("captor").unwrap()
    );
}

#[test]
fn embedded_graph_steps_resolve_standalone() {
    let t = load("pdi_13634/main.toml", &SharedResourcePool::new());
    let registry = StepRegistry::with_builtins();
    let resolver = LineageResolver::new(&t, &registry, ResolverOptions::default());

    let mapping = t.find_step("mapper").unwrap().mapping().unwrap();
    // Without the injected input, the entry step misses its declared field.
    let err = resolver
        .output_schema_in(&mapping.graph, "output")
        .unwrap_err();
    assert!(matches!(err, ResolveError::StepContract { ref step, .. } if step == "input"));
    assert!(resolver
        .input_schema_in(&mapping.graph, "input")
        .unwrap()
        .is_empty());

    let nowhere = mapping.graph.child("nowhere");
    assert_eq!(
        resolver.output_schema_in(&nowhere, "output"),
        Err(ResolveError::UnknownGraph(nowhere.clone()))
    );
}

#[test]
fn resolution_from_many_threads() {
    let t = load("pdi_13634/main.toml", &shared_pool());
    let registry = StepRegistry::with_builtins();
    let resolver = LineageResolver::new(&t, &registry, ResolverOptions::default());
    let expected = resolver.output_schema("captor").unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| resolver.output_schema("captor").unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

/// A `row_generator` followed by `len - 1` pass-through steps.
fn chain_definition(len: usize) -> String {
    let mut src = String::from(
        "name = \"chain\"\n\
         [[steps]]\nname = \"s0\"\ntype = \"row_generator\"\n\
         [steps.config]\nfields = [{ name = \"id\", type = \"integer\" }]\n",
    );
    for i in 1..len {
        src.push_str(&format!("[[steps]]\nname = \"s{i}\"\ntype = \"dummy\"\n"));
    }
    for i in 1..len {
        src.push_str(&format!("[[hops]]\nfrom = \"s{}\"\nto = \"s{i}\"\n", i - 1));
    }
    src
}

#[test]
fn long_chain_resolves_on_worker_thread() {
    let len = 10_000;
    let handle = std::thread::spawn(move || {
        let t = load_str(&chain_definition(len)).unwrap();
        let registry = StepRegistry::with_builtins();
        let resolver = LineageResolver::new(&t, &registry, ResolverOptions::default());
        let last = format!("s{}", len - 1);
        let output = resolver.output_schema(&last).unwrap();
        let input = resolver.input_schema(&last).unwrap();
        (output.names().join(","), input.names().join(","))
    });

    let (output, input) = handle.join().unwrap();
    assert_eq!(output, "id");
    assert_eq!(input, "id");
}

// =============================================================================
// Merge points
// =============================================================================

const MERGE: &str = r#"
name = "merge"

[[steps]]
name = "left"
type = "row_generator"
[steps.config]
fields = [{ name = "id", type = "integer" }, { name = "left_only", type = "string" }]

[[steps]]
name = "right"
type = "row_generator"
[steps.config]
fields = [{ name = "ID", type = "string" }, { name = "right_only", type = "date" }]

[[steps]]
name = "join"
type = "dummy"

[[hops]]
from = "right"
to = "join"

[[hops]]
from = "left"
to = "join"
"#;

#[test]
fn first_wins_keeps_hop_order() {
    let t = load_str(MERGE).unwrap();
    let registry = StepRegistry::with_builtins();
    let resolver = LineageResolver::new(&t, &registry, ResolverOptions::default());

    let input = resolver.input_schema("join").unwrap();
    assert_eq!(input.names(), vec!["ID", "right_only", "left_only"]);
    assert_eq!(input.find("id").unwrap().value_type(), ValueType::String);
    let positions: Vec<_> = input.iter().map(|f| f.position()).collect();
    assert_eq!(positions, vec![0, 1, 2]);
}

#[test]
fn strict_merge_rejects_duplicates() {
    let t = load_str(MERGE).unwrap();
    let registry = StepRegistry::with_builtins();
    let options = ResolverOptions {
        merge_policy: MergePolicy::Strict,
        ..ResolverOptions::default()
    };
    let resolver = LineageResolver::new(&t, &registry, options);

    match resolver.output_schema("join").unwrap_err() {
        ResolveError::DuplicateFieldName { step, field, .. } => {
            assert_eq!(step, "join");
            assert_eq!(field, "id");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn disabled_hop_is_ignored() {
    let t = load_str(
        r#"
name = "disabled"

[[steps]]
name = "a"
type = "row_generator"
[steps.config]
fields = [{ name = "a" }]

[[steps]]
name = "b"
type = "row_generator"
[steps.config]
fields = [{ name = "b" }]

[[steps]]
name = "out"
type = "dummy"

[[hops]]
from = "a"
to = "out"

[[hops]]
from = "b"
to = "out"
enabled = false
"#,
    )
    .unwrap();
    let registry = StepRegistry::with_builtins();
    let resolver = LineageResolver::new(&t, &registry, ResolverOptions::default());

    assert_eq!(resolver.output_schema("out").unwrap().names(), vec!["a"]);
    assert_eq!(t.root().previous_steps("out").len(), 1);
}

// =============================================================================
// Cycles and nesting
// =============================================================================

#[test]
fn cycle_terminates_with_error() {
    let t = load_str(
        r#"
name = "cycle"

[[steps]]
name = "X"
type = "dummy"

[[steps]]
name = "Y"
type = "dummy"

[[hops]]
from = "X"
to = "Y"

[[hops]]
from = "Y"
to = "X"
"#,
    )
    .unwrap();
    let registry = StepRegistry::with_builtins();
    let resolver = LineageResolver::new(&t, &registry, ResolverOptions::default());

    assert_eq!(t.root().find_cycle(), Some("X"));
    assert!(matches!(
        resolver.output_schema("X"),
        Err(ResolveError::CyclicGraph { ref step, .. }) if step == "X"
    ));
    // A failed call leaves the resolver usable.
    assert!(matches!(
        resolver.output_schema("nope"),
        Err(ResolveError::UnknownStep { .. })
    ));
}

#[test]
fn cross_file_cycle_is_detected() {
    let t = load("cycle/a.toml", &SharedResourcePool::new());
    let registry = StepRegistry::with_builtins();
    let resolver = LineageResolver::new(&t, &registry, ResolverOptions::default());

    assert_eq!(t.graphs().count(), 2);
    match resolver.output_schema("m").unwrap_err() {
        ResolveError::CyclicGraph { step, path, .. } => {
            assert_eq!(step, "m");
            assert!(path.len() >= 3);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn nesting_bound_applies() {
    let temp = TempDir::new().unwrap();
    // level0 -> level1 -> level2 -> leaf
    let leaf = format!(
        "{HEADER}name = \"leaf\"\n\
         [[steps]]\nname = \"input\"\ntype = \"mapping_input\"\n\
         [[steps]]\nname = \"output\"\ntype = \"mapping_output\"\n\
         [[hops]]\nfrom = \"input\"\nto = \"output\"\n"
    );
    fs::write(temp.path().join("leaf.toml"), leaf).unwrap();
    for (level, child) in [(2, "leaf"), (1, "level2"), (0, "level1")] {
        let doc = format!(
            "{HEADER}name = \"level{level}\"\n\
             [[steps]]\nname = \"input\"\ntype = \"mapping_input\"\n\
             [[steps]]\nname = \"nested\"\ntype = \"mapping\"\n\
             [steps.mapping]\npath = \"{child}.toml\"\ninput_step = \"input\"\noutput_step = \"output\"\n\
             [[steps]]\nname = \"output\"\ntype = \"mapping_output\"\n\
             [[hops]]\nfrom = \"input\"\nto = \"nested\"\n\
             [[hops]]\nfrom = \"nested\"\nto = \"output\"\n"
        );
        fs::write(temp.path().join(format!("level{level}.toml")), doc).unwrap();
    }

    let registry = StepRegistry::with_builtins();
    let pool = SharedResourcePool::new();
    let t = Loader::new(&registry, &pool)
        .load_file(&temp.path().join("level0.toml"))
        .unwrap();
    assert_eq!(t.graphs().count(), 4);

    let deep_enough = ResolverOptions {
        max_nesting_depth: 3,
        ..ResolverOptions::default()
    };
    assert!(LineageResolver::new(&t, &registry, deep_enough)
        .output_schema("output")
        .unwrap()
        .is_empty());

    let too_shallow = ResolverOptions {
        max_nesting_depth: 2,
        ..ResolverOptions::default()
    };
    assert!(matches!(
        LineageResolver::new(&t, &registry, too_shallow).output_schema("output"),
        Err(ResolveError::NestedResolutionDepthExceeded { max: 2, .. })
    ));
}

#[test]
fn renames_translate_at_the_boundary() {
    let t = load_str(
        r#"
name = "renames"

[[steps]]
name = "gen"
type = "row_generator"
[steps.config]
fields = [{ name = "customer_id", type = "integer" }]

[[steps]]
name = "mapper"
type = "mapping"

[steps.mapping]
input_step = "input"
output_step = "output"
renames = [{ parent = "customer_id", child = "id" }]

[steps.mapping.transformation]
name = "inner"

[[steps.mapping.transformation.steps]]
name = "input"
type = "mapping_input"
[steps.mapping.transformation.steps.config]
fields = [{ name = "id" }]
select_only = true

[[steps.mapping.transformation.steps]]
name = "output"
type = "add_constants"
[steps.mapping.transformation.steps.config]
fields = [{ name = "source", type = "string", value = "crm" }]

[[steps.mapping.transformation.hops]]
from = "input"
to = "output"

[[hops]]
from = "gen"
to = "mapper"
"#,
    )
    .unwrap();
    let registry = StepRegistry::with_builtins();
    let resolver = LineageResolver::new(&t, &registry, ResolverOptions::default());

    let out = resolver.output_schema("mapper").unwrap();
    assert_eq!(out.names(), vec!["customer_id", "source"]);
    assert_eq!(out.field(0).unwrap().value_type(), ValueType::Integer);
}

// =============================================================================
// Resources
// =============================================================================

#[test]
fn resources_keep_declaration_order() {
    let t = load("resources/trans_meta.toml", &shared_pool());
    let resources = t.resources();

    assert_eq!(resources.database_names(), vec!["shared", "test"]);
    assert_eq!(resources.partition_schema_names(), vec!["test"]);
    assert_eq!(resources.cluster_schema_names(), vec!["test"]);
    assert_eq!(resources.slave_server_names(), vec!["test"]);
    assert_eq!(resources.private_database_names(), &["test".to_string()]);
}

#[test]
fn shared_then_private_databases() {
    let t = load("resources/trans_meta.toml", &shared_pool());
    let databases = t.resources().databases();

    assert_eq!(databases.len(), 2);
    assert!(databases[0].is_shared());
    assert_eq!(
        databases[0].parameters()["host"].as_str(),
        Some("db.shared.internal")
    );
    assert!(!databases[1].is_shared());
}

#[test]
fn private_declaration_overrides_shared_in_place() {
    let registry = StepRegistry::with_builtins();
    let mut pool = shared_pool();
    pool.add(ResourceCategory::Database, "reporting", toml::Table::new())
        .unwrap();

    let t = Loader::new(&registry, &pool)
        .load_str(
            &format!(
                "{HEADER}name = \"override\"\n\
                 [[databases]]\nname = \"SHARED\"\n[databases.parameters]\nhost = \"localhost\"\n\
                 [[databases]]\nname = \"test\"\n"
            ),
            None,
        )
        .unwrap();

    let databases = t.resources().databases();
    let names: Vec<_> = databases.iter().map(|d| d.name()).collect();
    assert_eq!(names, vec!["SHARED", "reporting", "test"]);
    assert!(!databases[0].is_shared());
    assert!(databases[1].is_shared());
    assert_eq!(databases[0].parameters()["host"].as_str(), Some("localhost"));
    assert_eq!(
        t.resources().private_database_names(),
        &["SHARED".to_string(), "test".to_string()]
    );
}

// =============================================================================
// Load errors
// =============================================================================

#[test]
fn unknown_step_type_fails_load() {
    let err = load_str("name = \"x\"\n[[steps]]\nname = \"a\"\ntype = \"teleport\"\n").unwrap_err();
    assert!(matches!(err, LoadError::MissingPlugin { .. }));
}

#[test]
fn custom_registry_accepts_custom_types() {
    use std::sync::Arc;
    use translineage::core::schema::{FieldDescriptor, Schema};
    use translineage::steps::{StepContext, StepContractError, StepInput};

    let mut registry = StepRegistry::with_builtins();
    registry
        .register(
            "audit",
            Arc::new(
                |_: &StepContext<'_>, input: &StepInput| -> Result<Schema, StepContractError> {
                    let mut out = input.merged.clone();
                    out.push(FieldDescriptor::new("audited_at", ValueType::Timestamp))
                        .map_err(|_| StepContractError::DuplicateField("audited_at".into()))?;
                    Ok(out)
                },
            ),
        )
        .unwrap();
    let pool = SharedResourcePool::new();
    let t = Loader::new(&registry, &pool)
        .load_str(
            &format!(
                "{HEADER}name = \"x\"\n\
                 [[steps]]\nname = \"gen\"\ntype = \"row_generator\"\n\
                 [steps.config]\nfields = [{{ name = \"id\", type = \"integer\" }}]\n\
                 [[steps]]\nname = \"audit\"\ntype = \"audit\"\n\
                 [[hops]]\nfrom = \"gen\"\nto = \"audit\"\n"
            ),
            None,
        )
        .unwrap();

    let resolver = LineageResolver::new(&t, &registry, ResolverOptions::default());
    assert_eq!(
        resolver.output_schema("audit").unwrap().names(),
        vec!["id", "audited_at"]
    );
}

#[test]
fn missing_linked_file_fails_load() {
    let temp = TempDir::new().unwrap();
    let main = temp.path().join("main.toml");
    fs::write(
        &main,
        format!(
            "{HEADER}name = \"x\"\n[[steps]]\nname = \"m\"\ntype = \"mapping\"\n\
             [steps.mapping]\npath = \"gone.toml\"\ninput_step = \"in\"\noutput_step = \"out\"\n"
        ),
    )
    .unwrap();

    let registry = StepRegistry::with_builtins();
    let pool = SharedResourcePool::new();
    let err = Loader::new(&registry, &pool).load_file(&main).unwrap_err();
    assert!(matches!(err, LoadError::Read { .. }));
}

#[test]
fn linked_file_missing_exit_step_fails_load() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("sub.toml"),
        format!("{HEADER}name = \"sub\"\n[[steps]]\nname = \"in\"\ntype = \"mapping_input\"\n"),
    )
    .unwrap();
    let main = temp.path().join("main.toml");
    fs::write(
        &main,
        format!(
            "{HEADER}name = \"x\"\n[[steps]]\nname = \"m\"\ntype = \"mapping\"\n\
             [steps.mapping]\npath = \"sub.toml\"\ninput_step = \"in\"\noutput_step = \"out\"\n"
        ),
    )
    .unwrap();

    let registry = StepRegistry::with_builtins();
    let pool = SharedResourcePool::new();
    let err = Loader::new(&registry, &pool).load_file(&main).unwrap_err();
    assert!(matches!(
        err,
        LoadError::UnknownStepReference { ref reference, .. } if reference == "out"
    ));
}
