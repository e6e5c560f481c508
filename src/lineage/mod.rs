//! lineage
//!
//! Schema lineage resolution.
//!
//! # Overview
//!
//! The resolver computes, for any step, the ordered fields it receives
//! ([`LineageResolver::input_schema`]) and the ordered fields it emits
//! ([`LineageResolver::output_schema`]), by walking enabled hops backwards
//! and applying each step's [`StepSchemaContract`].
//!
//! # Algorithm
//!
//! Resolution is explicit recursion over *frames*. A frame is one graph
//! at one nesting level, optionally with a schema injected at its entry
//! step. Composite steps open a child frame over the embedded graph (see
//! [`composite`]); each frame has its own cache, while the set of steps
//! being resolved (the *active path*) is shared across frames of a call.
//! Re-entering an active step is a cycle, whether the cycle stays within a
//! graph or runs through embedded graphs.
//!
//! Within a frame, upstream steps are walked with an explicit stack and
//! computed in post-order, so long chains of steps never deepen the native
//! call stack. Only entering an embedded graph recurses, and that is
//! bounded by [`ResolverOptions::max_nesting_depth`].
//!
//! # Ownership
//!
//! The resolver borrows the transformation and the registry and never
//! mutates them. Schemas are cloned into and out of caches; every returned
//! schema is owned by the caller. Independent calls share no state, so a
//! resolver can be used from several threads at once.
//!
//! # Example
//!
//! ```no_run
//! use translineage::core::definition::Loader;
//! use translineage::core::resources::SharedResourcePool;
//! use translineage::lineage::{LineageResolver, ResolverOptions};
//! use translineage::steps::StepRegistry;
//! use std::path::Path;
//!
//! let registry = StepRegistry::with_builtins();
//! let pool = SharedResourcePool::new();
//! let transformation = Loader::new(&registry, &pool)
//!     .load_file(Path::new("etl/orders.toml"))
//!     .unwrap();
//!
//! let resolver = LineageResolver::new(&transformation, &registry, ResolverOptions::default());
//! let schema = resolver.output_schema("captor").unwrap();
//! println!("{schema}");
//! ```

pub mod composite;

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::core::config::Config;
use crate::core::graph::{Graph, Step, StepKind};
use crate::core::schema::{MergePolicy, Schema, SchemaError};
use crate::core::transformation::Transformation;
use crate::core::types::{GraphId, QualifiedStep};
use crate::steps::{InputStream, StepContext, StepContractError, StepInput, StepRegistry};

/// Default bound on composite nesting.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 32;

fn format_path(path: &[QualifiedStep]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Errors from schema resolution.
///
/// Every variant names the graph and step where resolution failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("graph '{graph}' has no step named '{step}'")]
    UnknownStep { graph: GraphId, step: String },

    #[error("transformation has no graph '{0}'")]
    UnknownGraph(GraphId),

    #[error("step '{step}' in graph '{graph}' has unregistered type '{step_type}'")]
    MissingPlugin {
        graph: GraphId,
        step: String,
        step_type: String,
    },

    #[error("step '{step}' in graph '{graph}': {source}")]
    StepContract {
        graph: GraphId,
        step: String,
        #[source]
        source: StepContractError,
    },

    #[error("cycle through step '{step}' in graph '{graph}': {}", format_path(.path))]
    CyclicGraph {
        graph: GraphId,
        step: String,
        /// Active path at detection, ending with the re-entered step
        path: Vec<QualifiedStep>,
    },

    #[error("step '{step}' in graph '{graph}' nests deeper than {max} levels")]
    NestedResolutionDepthExceeded {
        graph: GraphId,
        step: String,
        max: usize,
    },

    #[error("duplicate field '{field}' at step '{step}' in graph '{graph}'")]
    DuplicateFieldName {
        graph: GraphId,
        step: String,
        field: String,
    },
}

impl ResolveError {
    fn duplicate(graph: &Graph, step: &Step, err: SchemaError) -> Self {
        let field = match err {
            SchemaError::DuplicateFieldName(name) => name,
            other => other.to_string(),
        };
        ResolveError::DuplicateFieldName {
            graph: graph.id().clone(),
            step: step.name().to_string(),
            field,
        }
    }
}

/// Resolver tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Maximum number of nested composite levels below the queried graph
    pub max_nesting_depth: usize,
    /// Handling of duplicate names where several hops meet
    pub merge_policy: MergePolicy,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            merge_policy: MergePolicy::FirstWins,
        }
    }
}

impl ResolverOptions {
    /// Options from a loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_nesting_depth: config.max_nesting_depth(),
            merge_policy: config.merge_policy(),
        }
    }
}

/// Output schemas already computed for one graph.
///
/// A cache remembers the graph it was filled for, and the transformation
/// instance that graph belongs to; using it against any other graph,
/// including the same file loaded again, clears it first.
#[derive(Debug, Clone, Default)]
pub struct SchemaCache {
    owner: Option<(u64, GraphId)>,
    outputs: HashMap<usize, Schema>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn for_graph(instance: u64, id: &GraphId) -> Self {
        Self {
            owner: Some((instance, id.clone())),
            outputs: HashMap::new(),
        }
    }

    /// The graph this cache holds schemas for.
    pub fn graph(&self) -> Option<&GraphId> {
        self.owner.as_ref().map(|(_, id)| id)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn clear(&mut self) {
        self.outputs.clear();
    }

    fn bind(&mut self, instance: u64, id: &GraphId) {
        let bound = matches!(&self.owner, Some((i, g)) if *i == instance && g == id);
        if !bound {
            if !self.outputs.is_empty() {
                tracing::trace!(from = ?self.graph(), to = %id, "schema cache rebound");
            }
            self.outputs.clear();
            self.owner = Some((instance, id.clone()));
        }
    }

    fn contains(&self, step: usize) -> bool {
        self.outputs.contains_key(&step)
    }

    fn get(&self, step: usize) -> Option<Schema> {
        self.outputs.get(&step).cloned()
    }

    fn insert(&mut self, step: usize, schema: &Schema) {
        self.outputs.insert(step, schema.clone());
    }
}

/// Steps being resolved by one top-level call, across frames, in the
/// order they were entered.
#[derive(Debug, Default)]
struct ActivePath {
    order: Vec<QualifiedStep>,
    members: HashSet<QualifiedStep>,
}

impl ActivePath {
    fn len(&self) -> usize {
        self.order.len()
    }

    fn contains(&self, step: &QualifiedStep) -> bool {
        self.members.contains(step)
    }

    fn push(&mut self, step: QualifiedStep) {
        self.members.insert(step.clone());
        self.order.push(step);
    }

    fn pop(&mut self) {
        if let Some(step) = self.order.pop() {
            self.members.remove(&step);
        }
    }

    fn truncate(&mut self, len: usize) {
        while self.order.len() > len {
            self.pop();
        }
    }

    /// The active path closed by re-entering `step`.
    fn closed_by(&self, step: QualifiedStep) -> Vec<QualifiedStep> {
        let mut path = self.order.clone();
        path.push(step);
        path
    }
}

/// Pending work of the walk over one frame.
#[derive(Debug, Clone, Copy)]
enum Visit {
    /// Check the cache and the active path, then schedule predecessors.
    Enter(usize),
    /// Every predecessor is cached; compute the step itself.
    Exit(usize),
}

/// Schema injected at the entry step of an embedded graph.
#[derive(Debug)]
struct Injection {
    step: usize,
    schema: Schema,
}

/// One graph at one nesting level.
#[derive(Debug)]
struct Frame<'t> {
    graph: &'t Graph,
    depth: usize,
    injection: Option<Injection>,
}

impl<'t> Frame<'t> {
    fn top(graph: &'t Graph) -> Self {
        Self {
            graph,
            depth: 0,
            injection: None,
        }
    }

    fn is_injected(&self, step: usize) -> bool {
        self.injection.as_ref().is_some_and(|i| i.step == step)
    }
}

/// Resolves step schemas of a transformation.
#[derive(Debug, Clone, Copy)]
pub struct LineageResolver<'a> {
    transformation: &'a Transformation,
    registry: &'a StepRegistry,
    options: ResolverOptions,
}

impl<'a> LineageResolver<'a> {
    pub fn new(
        transformation: &'a Transformation,
        registry: &'a StepRegistry,
        options: ResolverOptions,
    ) -> Self {
        Self {
            transformation,
            registry,
            options,
        }
    }

    pub fn options(&self) -> ResolverOptions {
        self.options
    }

    /// Ordered fields emitted by a root-graph step.
    pub fn output_schema(&self, step: &str) -> Result<Schema, ResolveError> {
        self.output_schema_cached(step, &mut SchemaCache::new())
    }

    /// Ordered fields arriving at a root-graph step.
    ///
    /// Predecessor outputs are concatenated in enabled-hop declaration
    /// order; duplicate names follow [`ResolverOptions::merge_policy`].
    pub fn input_schema(&self, step: &str) -> Result<Schema, ResolveError> {
        self.input_schema_cached(step, &mut SchemaCache::new())
    }

    /// [`Self::output_schema`] reusing schemas from `cache`.
    ///
    /// A cache filled against another graph or another transformation,
    /// including a fresh load of the same file, is cleared before use.
    pub fn output_schema_cached(
        &self,
        step: &str,
        cache: &mut SchemaCache,
    ) -> Result<Schema, ResolveError> {
        self.resolve_output(self.transformation.root(), step, cache)
    }

    /// [`Self::input_schema`] reusing schemas from `cache`.
    pub fn input_schema_cached(
        &self,
        step: &str,
        cache: &mut SchemaCache,
    ) -> Result<Schema, ResolveError> {
        self.resolve_input(self.transformation.root(), step, cache)
    }

    /// Output schema of a step of any graph of the transformation.
    ///
    /// An embedded graph resolved this way has no injected entry schema.
    pub fn output_schema_in(&self, graph: &GraphId, step: &str) -> Result<Schema, ResolveError> {
        let graph = self.graph(graph)?;
        self.resolve_output(graph, step, &mut SchemaCache::new())
    }

    /// Input schema of a step of any graph of the transformation.
    pub fn input_schema_in(&self, graph: &GraphId, step: &str) -> Result<Schema, ResolveError> {
        let graph = self.graph(graph)?;
        self.resolve_input(graph, step, &mut SchemaCache::new())
    }

    fn graph(&self, id: &GraphId) -> Result<&'a Graph, ResolveError> {
        self.transformation
            .graph(id)
            .ok_or_else(|| ResolveError::UnknownGraph(id.clone()))
    }

    fn locate(graph: &Graph, step: &str) -> Result<usize, ResolveError> {
        graph
            .step_index(step)
            .ok_or_else(|| ResolveError::UnknownStep {
                graph: graph.id().clone(),
                step: step.to_string(),
            })
    }

    fn resolve_output(
        &self,
        graph: &'a Graph,
        step: &str,
        cache: &mut SchemaCache,
    ) -> Result<Schema, ResolveError> {
        let index = Self::locate(graph, step)?;
        cache.bind(self.transformation.instance(), graph.id());
        tracing::debug!(graph = %graph.id(), step, "resolving output schema");

        let mut active = ActivePath::default();
        self.output_in_frame(&Frame::top(graph), index, cache, &mut active)
    }

    fn resolve_input(
        &self,
        graph: &'a Graph,
        step: &str,
        cache: &mut SchemaCache,
    ) -> Result<Schema, ResolveError> {
        let index = Self::locate(graph, step)?;
        cache.bind(self.transformation.instance(), graph.id());
        tracing::debug!(graph = %graph.id(), step, "resolving input schema");

        let mut active = ActivePath::default();
        let input = self.input_in_frame(&Frame::top(graph), index, cache, &mut active)?;
        Ok(input.merged)
    }

    /// Output of step `target` in `frame`, through the frame's cache.
    ///
    /// Upstream steps of the frame are visited with an explicit stack in
    /// post-order, so the native call depth does not grow with the length
    /// of the graph. Only composite steps recurse, one level per nesting
    /// level. On error the active path is restored to its length on entry.
    fn output_in_frame(
        &self,
        frame: &Frame<'a>,
        target: usize,
        cache: &mut SchemaCache,
        active: &mut ActivePath,
    ) -> Result<Schema, ResolveError> {
        let base = active.len();
        let result = self.walk_frame(frame, target, cache, active);
        if result.is_err() {
            active.truncate(base);
        }
        result
    }

    fn walk_frame(
        &self,
        frame: &Frame<'a>,
        target: usize,
        cache: &mut SchemaCache,
        active: &mut ActivePath,
    ) -> Result<Schema, ResolveError> {
        let graph = frame.graph;
        let mut pending = vec![Visit::Enter(target)];

        while let Some(visit) = pending.pop() {
            match visit {
                Visit::Enter(index) => {
                    if cache.contains(index) {
                        tracing::trace!(graph = %graph.id(), index, "schema cache hit");
                        continue;
                    }

                    let step = &graph.steps()[index];
                    let key = QualifiedStep::new(graph.id().clone(), step.name());
                    if active.contains(&key) {
                        return Err(ResolveError::CyclicGraph {
                            graph: graph.id().clone(),
                            step: step.name().to_string(),
                            path: active.closed_by(key),
                        });
                    }

                    active.push(key);
                    pending.push(Visit::Exit(index));
                    if !frame.is_injected(index) {
                        let sources: Vec<usize> = graph
                            .enabled_incoming(index)
                            .map(|hop| hop.from_index())
                            .collect();
                        // Reversed so the first hop is visited first.
                        pending.extend(sources.into_iter().rev().map(Visit::Enter));
                    }
                }
                Visit::Exit(index) => {
                    let schema = self.compute_output(frame, index, cache, active)?;
                    active.pop();
                    cache.insert(index, &schema);
                    if index == target {
                        return Ok(schema);
                    }
                }
            }
        }

        // The walk only drains without reaching the target's exit when the
        // target was already cached.
        cache.get(target).ok_or_else(|| ResolveError::UnknownStep {
            graph: graph.id().clone(),
            step: graph.steps()[target].name().to_string(),
        })
    }

    fn compute_output(
        &self,
        frame: &Frame<'a>,
        index: usize,
        cache: &mut SchemaCache,
        active: &mut ActivePath,
    ) -> Result<Schema, ResolveError> {
        let graph = frame.graph;
        let step = &graph.steps()[index];

        match step.kind() {
            StepKind::Composite(mapping) => {
                composite::resolve(self, frame, index, mapping, cache, active)
            }
            StepKind::Plain(config) => {
                let contract =
                    self.registry
                        .get(step.step_type())
                        .ok_or_else(|| ResolveError::MissingPlugin {
                            graph: graph.id().clone(),
                            step: step.name().to_string(),
                            step_type: step.step_type().to_string(),
                        })?;
                let input = self.input_in_frame(frame, index, cache, active)?;
                let context = StepContext {
                    name: step.name(),
                    step_type: step.step_type(),
                    config,
                };
                contract
                    .output_schema(&context, &input)
                    .map_err(|source| ResolveError::StepContract {
                        graph: graph.id().clone(),
                        step: step.name().to_string(),
                        source,
                    })
            }
        }
    }

    /// Everything arriving at step `index` in `frame`.
    fn input_in_frame(
        &self,
        frame: &Frame<'a>,
        index: usize,
        cache: &mut SchemaCache,
        active: &mut ActivePath,
    ) -> Result<StepInput, ResolveError> {
        if let Some(injection) = frame.injection.as_ref().filter(|i| i.step == index) {
            return Ok(StepInput::merged_only(injection.schema.clone()));
        }

        let graph = frame.graph;
        let step = &graph.steps()[index];
        let sources: Vec<usize> = graph
            .enabled_incoming(index)
            .map(|hop| hop.from_index())
            .collect();

        let mut input = StepInput::default();
        for source in sources {
            let schema = self.output_in_frame(frame, source, cache, active)?;
            let dropped = input
                .merged
                .merge(&schema, self.options.merge_policy)
                .map_err(|e| ResolveError::duplicate(graph, step, e))?;
            if !dropped.is_empty() {
                tracing::trace!(
                    graph = %graph.id(),
                    step = step.name(),
                    ?dropped,
                    "dropped duplicate input fields"
                );
            }
            input.streams.push(InputStream {
                from: graph.steps()[source].name().to_string(),
                schema,
            });
        }
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::{HopSpec, StepConfig};
    use crate::core::resources::ResolvedResourceSet;
    use crate::core::schema::{FieldDescriptor, ValueType};
    use crate::core::types::StepName;

    fn generator(name: &str, fields: &[&str]) -> Step {
        let list = fields
            .iter()
            .map(|f| format!("{{ name = \"{f}\", type = \"string\" }}"))
            .collect::<Vec<_>>()
            .join(", ");
        let table: toml::Table = toml::from_str(&format!("fields = [{list}]")).unwrap();
        Step::plain(
            StepName::new(name).unwrap(),
            "row_generator",
            StepConfig::new(table),
        )
    }

    fn dummy(name: &str) -> Step {
        Step::plain(StepName::new(name).unwrap(), "dummy", StepConfig::default())
    }

    fn transformation(steps: Vec<Step>, hops: Vec<HopSpec>) -> Transformation {
        Transformation::single(
            Graph::new(
                GraphId::new("test").unwrap(),
                "test",
                steps,
                hops,
                ResolvedResourceSet::default(),
            )
            .unwrap(),
        )
    }

    fn names(schema: &Schema) -> Vec<&str> {
        schema.names()
    }

    #[test]
    fn single_predecessor_propagates_output() {
        let t = transformation(
            vec![generator("gen", &["a", "b"]), dummy("out")],
            vec![HopSpec::new("gen", "out")],
        );
        let registry = StepRegistry::with_builtins();
        let resolver = LineageResolver::new(&t, &registry, ResolverOptions::default());

        assert_eq!(
            resolver.input_schema("out").unwrap(),
            resolver.output_schema("gen").unwrap()
        );
    }

    #[test]
    fn merge_follows_hop_order() {
        let t = transformation(
            vec![
                generator("one", &["a", "shared"]),
                generator("two", &["shared", "b"]),
                dummy("join"),
            ],
            vec![HopSpec::new("two", "join"), HopSpec::new("one", "join")],
        );
        let registry = StepRegistry::with_builtins();

        let resolver = LineageResolver::new(&t, &registry, ResolverOptions::default());
        let input = resolver.input_schema("join").unwrap();
        assert_eq!(names(&input), vec!["shared", "b", "a"]);

        let strict = ResolverOptions {
            merge_policy: MergePolicy::Strict,
            ..ResolverOptions::default()
        };
        let err = LineageResolver::new(&t, &registry, strict)
            .input_schema("join")
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::DuplicateFieldName { ref field, .. } if field == "shared"
        ));
    }

    #[test]
    fn disabled_hops_contribute_nothing() {
        let t = transformation(
            vec![generator("gen", &["a"]), dummy("out")],
            vec![HopSpec::new("gen", "out").disabled()],
        );
        let registry = StepRegistry::with_builtins();
        let resolver = LineageResolver::new(&t, &registry, ResolverOptions::default());
        assert!(resolver.output_schema("out").unwrap().is_empty());
    }

    #[test]
    fn unknown_step() {
        let t = transformation(vec![dummy("a")], vec![]);
        let registry = StepRegistry::with_builtins();
        let resolver = LineageResolver::new(&t, &registry, ResolverOptions::default());
        assert!(matches!(
            resolver.output_schema("ghost"),
            Err(ResolveError::UnknownStep { .. })
        ));
    }

    #[test]
    fn cycle_reported_with_path() {
        let t = transformation(
            vec![dummy("x"), dummy("y")],
            vec![HopSpec::new("x", "y"), HopSpec::new("y", "x")],
        );
        let registry = StepRegistry::with_builtins();
        let resolver = LineageResolver::new(&t, &registry, ResolverOptions::default());

        match resolver.output_schema("x").unwrap_err() {
            ResolveError::CyclicGraph { step, path, .. } => {
                assert_eq!(step, "x");
                let steps: Vec<_> = path.iter().map(|q| q.step.as_str()).collect();
                assert_eq!(steps, vec!["x", "y", "x"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            resolver.input_schema("y"),
            Err(ResolveError::CyclicGraph { .. })
        ));
    }

    #[test]
    fn missing_contract_at_resolution() {
        let t = transformation(
            vec![Step::plain(
                StepName::new("odd").unwrap(),
                "odd",
                StepConfig::default(),
            )],
            vec![],
        );
        let registry = StepRegistry::with_builtins();
        let resolver = LineageResolver::new(&t, &registry, ResolverOptions::default());
        assert!(matches!(
            resolver.output_schema("odd"),
            Err(ResolveError::MissingPlugin { ref step_type, .. }) if step_type == "odd"
        ));
    }

    #[test]
    fn contract_errors_carry_context() {
        let table: toml::Table = toml::from_str("remove = [\"ghost\"]").unwrap();
        let t = transformation(
            vec![
                generator("gen", &["a"]),
                Step::plain(
                    StepName::new("select").unwrap(),
                    "select_values",
                    StepConfig::new(table),
                ),
            ],
            vec![HopSpec::new("gen", "select")],
        );
        let registry = StepRegistry::with_builtins();
        let resolver = LineageResolver::new(&t, &registry, ResolverOptions::default());

        match resolver.output_schema("select").unwrap_err() {
            ResolveError::StepContract { graph, step, source } => {
                assert_eq!(graph.as_str(), "test");
                assert_eq!(step, "select");
                assert_eq!(source, StepContractError::MissingField("ghost".into()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn cache_is_filled_and_rebound() {
        let t = transformation(
            vec![generator("gen", &["a"]), dummy("mid"), dummy("out")],
            vec![HopSpec::new("gen", "mid"), HopSpec::new("mid", "out")],
        );
        let registry = StepRegistry::with_builtins();
        let resolver = LineageResolver::new(&t, &registry, ResolverOptions::default());

        let mut cache = SchemaCache::new();
        let first = resolver.output_schema_cached("out", &mut cache).unwrap();
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.graph().map(GraphId::as_str), Some("test"));

        let second = resolver.output_schema_cached("out", &mut cache).unwrap();
        assert_eq!(first, second);

        cache.bind(t.instance(), &GraphId::new("elsewhere").unwrap());
        assert!(cache.is_empty());
    }

    #[test]
    fn cache_is_not_reused_across_loads() {
        let registry = StepRegistry::with_builtins();
        let before = transformation(
            vec![generator("gen", &["a"]), dummy("out")],
            vec![HopSpec::new("gen", "out")],
        );
        let after = transformation(
            vec![generator("gen", &["a", "b"]), dummy("out")],
            vec![HopSpec::new("gen", "out")],
        );

        let mut cache = SchemaCache::new();
        LineageResolver::new(&before, &registry, ResolverOptions::default())
            .output_schema_cached("out", &mut cache)
            .unwrap();
        let reloaded = LineageResolver::new(&after, &registry, ResolverOptions::default())
            .output_schema_cached("out", &mut cache)
            .unwrap();

        assert_eq!(names(&reloaded), vec!["a", "b"]);
    }

    #[test]
    fn long_chain_resolves_on_small_stack() {
        let count = 10_000;
        let mut steps = vec![generator("s0", &["a"])];
        let mut hops = Vec::new();
        for i in 1..count {
            steps.push(dummy(&format!("s{i}")));
            hops.push(HopSpec::new(format!("s{}", i - 1), format!("s{i}")));
        }
        let t = transformation(steps, hops);

        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(move || {
                let registry = StepRegistry::with_builtins();
                let resolver = LineageResolver::new(&t, &registry, ResolverOptions::default());
                resolver.output_schema(&format!("s{}", count - 1))
            })
            .unwrap();

        assert_eq!(names(&handle.join().unwrap().unwrap()), vec!["a"]);
    }

    #[test]
    fn returned_schemas_are_independent() {
        let t = transformation(
            vec![generator("gen", &["a"]), dummy("out")],
            vec![HopSpec::new("gen", "out")],
        );
        let registry = StepRegistry::with_builtins();
        let resolver = LineageResolver::new(&t, &registry, ResolverOptions::default());

        let mut cache = SchemaCache::new();
        let mut first = resolver.output_schema_cached("out", &mut cache).unwrap();
        first
            .push(FieldDescriptor::new("extra", ValueType::Integer))
            .unwrap();
        first.field_mut(0).unwrap().set_length(Some(99));

        let second = resolver.output_schema_cached("out", &mut cache).unwrap();
        assert_eq!(names(&second), vec!["a"]);
        assert_eq!(second.field(0).unwrap().length(), None);
    }

    #[test]
    fn options_default() {
        let options = ResolverOptions::default();
        assert_eq!(options.max_nesting_depth, DEFAULT_MAX_NESTING_DEPTH);
        assert_eq!(options.merge_policy, MergePolicy::FirstWins);
    }
}
