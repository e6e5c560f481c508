//! core::transformation
//!
//! A loaded transformation: the root graph plus every graph it embeds.
//!
//! # Ownership
//!
//! The transformation exclusively owns its graphs. Composite steps refer to
//! embedded graphs by [`GraphId`], which lets a linked sub-graph file be
//! shared by several composite steps and lets reference cycles between
//! files exist without ownership cycles. Those cycles are reported when a
//! schema is resolved.
//!
//! Nothing here is mutable after loading; a transformation can be shared
//! across threads and resolved concurrently.
//!
//! Every assembled transformation gets a process-unique instance number.
//! Clones keep it, since they hold the same graphs. Schema caches use it to
//! tell two loads of the same file apart.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::graph::{Graph, Step};
use super::resources::ResolvedResourceSet;
use super::types::GraphId;

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

fn next_instance() -> u64 {
    NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed)
}

/// Root graph plus embedded graphs.
#[derive(Debug, Clone)]
pub struct Transformation {
    root: GraphId,
    graphs: BTreeMap<GraphId, Graph>,
    instance: u64,
}

impl Transformation {
    /// Assemble a transformation.
    ///
    /// Returns `None` if `graphs` lacks the root.
    pub fn new(root: GraphId, graphs: impl IntoIterator<Item = Graph>) -> Option<Self> {
        let graphs: BTreeMap<_, _> = graphs.into_iter().map(|g| (g.id().clone(), g)).collect();
        if !graphs.contains_key(&root) {
            return None;
        }
        Some(Self {
            root,
            graphs,
            instance: next_instance(),
        })
    }

    /// A transformation made of a single graph.
    pub fn single(graph: Graph) -> Self {
        let root = graph.id().clone();
        let mut graphs = BTreeMap::new();
        graphs.insert(root.clone(), graph);
        Self {
            root,
            graphs,
            instance: next_instance(),
        }
    }

    /// Process-unique number of this transformation.
    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn root_id(&self) -> &GraphId {
        &self.root
    }

    /// The root graph.
    pub fn root(&self) -> &Graph {
        // Constructors guarantee the root is present.
        &self.graphs[&self.root]
    }

    /// Any graph by id.
    pub fn graph(&self, id: &GraphId) -> Option<&Graph> {
        self.graphs.get(id)
    }

    /// All graphs, ordered by id.
    pub fn graphs(&self) -> impl Iterator<Item = &Graph> {
        self.graphs.values()
    }

    /// Find a step of the root graph by case-insensitive name.
    pub fn find_step(&self, name: &str) -> Option<&Step> {
        self.root().find_step(name)
    }

    /// Resolved resources of the root graph.
    pub fn resources(&self) -> &ResolvedResourceSet {
        self.root().resources()
    }
}
