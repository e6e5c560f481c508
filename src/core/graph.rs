//! core::graph
//!
//! Step graph representation.
//!
//! # Architecture
//!
//! A graph is a list of steps (nodes) and hops (directed edges) in
//! declaration order. Declaration order is preserved for every listing
//! operation and defines the order in which incoming hops contribute to a
//! step's input schema.
//!
//! Composite steps carry a [`MappingDefinition`] pointing at another graph
//! of the same [`Transformation`].
//!
//! # Invariants
//!
//! - Step names are unique within a graph (case-insensitive)
//! - Every hop endpoint names a step of the same graph
//! - Cycles over enabled hops are allowed structurally; they are reported
//!   when a schema is resolved, since hops may be toggled after loading

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use super::resources::ResolvedResourceSet;
use super::types::{GraphId, StepName};

/// Type tag reserved for composite (mapping) steps.
pub const COMPOSITE_STEP_TYPE: &str = "mapping";

/// Errors from graph construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("duplicate step name: {0}")]
    DuplicateStepName(String),

    #[error("hop {from} -> {to} references unknown step '{missing}'")]
    UnknownHopEndpoint {
        from: String,
        to: String,
        missing: String,
    },
}

/// Opaque step configuration.
///
/// The core never interprets it; step schema contracts deserialize it into
/// their own typed configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepConfig(toml::Table);

impl StepConfig {
    pub fn new(table: toml::Table) -> Self {
        Self(table)
    }

    pub fn table(&self) -> &toml::Table {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Link from a composite step to the graph it embeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingDefinition {
    /// The embedded graph.
    pub graph: GraphId,
    /// Step inside the embedded graph that receives the composite's input.
    pub entry_step: String,
    /// Step inside the embedded graph whose output becomes the composite's output.
    pub exit_step: String,
    /// `(parent name, child name)` pairs.
    pub renames: Vec<FieldRename>,
}

/// One row of a mapping rename table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRename {
    /// Field name on the outer graph's side.
    pub parent: String,
    /// Field name inside the embedded graph.
    pub child: String,
}

impl MappingDefinition {
    /// Name a parent-side field takes inside the embedded graph.
    pub fn to_child(&self, parent: &str) -> Option<String> {
        self.renames
            .iter()
            .find(|r| r.parent.eq_ignore_ascii_case(parent))
            .map(|r| r.child.clone())
    }

    /// Name an embedded-graph field takes on the parent side.
    pub fn to_parent(&self, child: &str) -> Option<String> {
        self.renames
            .iter()
            .find(|r| r.child.eq_ignore_ascii_case(child))
            .map(|r| r.parent.clone())
    }
}

/// What a step is.
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    /// Schema computed by the registered contract for the step's type tag.
    Plain(StepConfig),
    /// Schema computed by resolving an embedded graph.
    Composite(MappingDefinition),
}

/// A node of the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    name: StepName,
    step_type: String,
    kind: StepKind,
    incoming: Vec<usize>,
    outgoing: Vec<usize>,
}

impl Step {
    /// Create a plain step.
    pub fn plain(name: StepName, step_type: impl Into<String>, config: StepConfig) -> Self {
        Self {
            name,
            step_type: step_type.into(),
            kind: StepKind::Plain(config),
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }

    /// Create a composite step.
    pub fn composite(name: StepName, mapping: MappingDefinition) -> Self {
        Self {
            name,
            step_type: COMPOSITE_STEP_TYPE.to_string(),
            kind: StepKind::Composite(mapping),
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn step_type(&self) -> &str {
        &self.step_type
    }

    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    pub fn mapping(&self) -> Option<&MappingDefinition> {
        match &self.kind {
            StepKind::Composite(m) => Some(m),
            StepKind::Plain(_) => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, StepKind::Composite(_))
    }

    /// Indices into [`Graph::hops`] of hops ending here, in declaration order.
    pub fn incoming_hops(&self) -> &[usize] {
        &self.incoming
    }

    /// Indices into [`Graph::hops`] of hops starting here, in declaration order.
    pub fn outgoing_hops(&self) -> &[usize] {
        &self.outgoing
    }
}

/// A directed edge between two steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    from: String,
    to: String,
    enabled: bool,
    from_index: usize,
    to_index: usize,
}

impl Hop {
    pub fn from_step(&self) -> &str {
        &self.from
    }

    pub fn to_step(&self) -> &str {
        &self.to
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn from_index(&self) -> usize {
        self.from_index
    }

    pub fn to_index(&self) -> usize {
        self.to_index
    }
}

/// Hop as declared, before endpoints are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopSpec {
    pub from: String,
    pub to: String,
    pub enabled: bool,
}

impl HopSpec {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// A graph of steps and hops.
#[derive(Debug, Clone)]
pub struct Graph {
    id: GraphId,
    name: String,
    steps: Vec<Step>,
    hops: Vec<Hop>,
    index: HashMap<String, usize>,
    resources: ResolvedResourceSet,
}

impl Graph {
    /// Build a graph, resolving hop endpoints.
    ///
    /// # Errors
    ///
    /// - `GraphError::DuplicateStepName` if two steps share a name
    /// - `GraphError::UnknownHopEndpoint` if a hop names an undeclared step
    pub fn new(
        id: GraphId,
        name: impl Into<String>,
        steps: Vec<Step>,
        hops: Vec<HopSpec>,
        resources: ResolvedResourceSet,
    ) -> Result<Self, GraphError> {
        let mut steps = steps;
        let mut index = HashMap::with_capacity(steps.len());
        for (i, step) in steps.iter_mut().enumerate() {
            step.incoming.clear();
            step.outgoing.clear();
            if index.insert(step.name().to_ascii_lowercase(), i).is_some() {
                return Err(GraphError::DuplicateStepName(step.name().to_string()));
            }
        }

        let mut resolved = Vec::with_capacity(hops.len());
        for (i, spec) in hops.into_iter().enumerate() {
            let lookup = |name: &str| {
                index
                    .get(&name.to_ascii_lowercase())
                    .copied()
                    .ok_or_else(|| GraphError::UnknownHopEndpoint {
                        from: spec.from.clone(),
                        to: spec.to.clone(),
                        missing: name.to_string(),
                    })
            };
            let from_index = lookup(&spec.from)?;
            let to_index = lookup(&spec.to)?;
            steps[from_index].outgoing.push(i);
            steps[to_index].incoming.push(i);
            resolved.push(Hop {
                from: spec.from,
                to: spec.to,
                enabled: spec.enabled,
                from_index,
                to_index,
            });
        }

        Ok(Self {
            id,
            name: name.into(),
            steps,
            hops: resolved,
            index,
            resources,
        })
    }

    pub fn id(&self) -> &GraphId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Steps in declaration order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Hops in declaration order.
    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Resolved resource lists for this graph.
    pub fn resources(&self) -> &ResolvedResourceSet {
        &self.resources
    }

    /// Find a step by case-insensitive name.
    pub fn find_step(&self, name: &str) -> Option<&Step> {
        self.step_index(name).map(|i| &self.steps[i])
    }

    /// Position of a step by case-insensitive name.
    pub fn step_index(&self, name: &str) -> Option<usize> {
        self.index.get(&name.to_ascii_lowercase()).copied()
    }

    /// Enabled hops ending at `step`, in hop declaration order.
    pub fn enabled_incoming(&self, step: usize) -> impl Iterator<Item = &Hop> {
        self.steps
            .get(step)
            .map(|s| s.incoming.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|&h| &self.hops[h])
            .filter(|h| h.enabled)
    }

    /// Enabled hops starting at `step`, in hop declaration order.
    pub fn enabled_outgoing(&self, step: usize) -> impl Iterator<Item = &Hop> {
        self.steps
            .get(step)
            .map(|s| s.outgoing.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|&h| &self.hops[h])
            .filter(|h| h.enabled)
    }

    /// Steps feeding `name` through enabled hops.
    pub fn previous_steps(&self, name: &str) -> Vec<&Step> {
        match self.step_index(name) {
            Some(i) => self
                .enabled_incoming(i)
                .map(|h| &self.steps[h.from_index])
                .collect(),
            None => Vec::new(),
        }
    }

    /// Steps fed by `name` through enabled hops.
    pub fn next_steps(&self, name: &str) -> Vec<&Step> {
        match self.step_index(name) {
            Some(i) => self
                .enabled_outgoing(i)
                .map(|h| &self.steps[h.to_index])
                .collect(),
            None => Vec::new(),
        }
    }

    /// Find a hop between two steps (any enabled state).
    pub fn find_hop(&self, from: &str, to: &str) -> Option<&Hop> {
        let (from, to) = (self.step_index(from)?, self.step_index(to)?);
        self.hops
            .iter()
            .find(|h| h.from_index == from && h.to_index == to)
    }

    /// Composite steps in declaration order.
    pub fn composite_steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|s| s.is_composite())
    }

    /// Check if enabled hops form a cycle.
    ///
    /// Returns the name of a step on the cycle, if any. This only looks at
    /// this graph; cycles through embedded graphs are found during
    /// resolution.
    pub fn find_cycle(&self) -> Option<&str> {
        // 0 = unvisited, 1 = on the current path, 2 = done
        let mut state = vec![0u8; self.steps.len()];

        for start in 0..self.steps.len() {
            if state[start] != 0 {
                continue;
            }
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            state[start] = 1;

            while let Some((step, next)) = stack.last_mut() {
                let step = *step;
                let outgoing = &self.steps[step].outgoing;
                let Some(&hop) = outgoing.get(*next) else {
                    state[step] = 2;
                    stack.pop();
                    continue;
                };
                *next += 1;

                let hop = &self.hops[hop];
                if !hop.enabled {
                    continue;
                }
                match state[hop.to_index] {
                    0 => {
                        state[hop.to_index] = 1;
                        stack.push((hop.to_index, 0));
                    }
                    1 => return Some(self.steps[hop.to_index].name()),
                    _ => {}
                }
            }
        }
        None
    }

    /// Step counts per type tag.
    pub fn step_type_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for step in &self.steps {
            *counts.entry(step.step_type()).or_insert(0) += 1;
        }
        counts
    }
}
