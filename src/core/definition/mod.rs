//! core::definition
//!
//! Loading transformations from definition files.
//!
//! # Overview
//!
//! Loading turns a definition document into a [`Transformation`]:
//! 1. Parse and version-check the document ([`schema::parse_definition`])
//! 2. Check every step type against the [`StepRegistry`]
//! 3. Build each graph, resolving hop endpoints
//! 4. Merge declared resources with the [`SharedResourcePool`]
//! 5. Load every linked sub-graph file once, then check composite entry and
//!    exit references against the embedded graphs
//!
//! Loading is all-or-nothing: on error no transformation is returned.
//!
//! # Sub-graphs
//!
//! A composite step either embeds its sub-graph inline
//! (`[steps.mapping.transformation]`) or links a file (`path = "..."`),
//! resolved relative to the directory of the declaring file. Each linked
//! file is loaded once and identified by its canonical path, so two
//! composite steps linking the same file share one graph.
//!
//! # Example
//!
//! ```no_run
//! use translineage::core::definition::Loader;
//! use translineage::core::resources::SharedResourcePool;
//! use translineage::steps::StepRegistry;
//! use std::path::Path;
//!
//! let registry = StepRegistry::with_builtins();
//! let pool = SharedResourcePool::new();
//! let transformation = Loader::new(&registry, &pool)
//!     .load_file(Path::new("etl/orders.toml"))
//!     .unwrap();
//! println!("databases: {:?}", transformation.resources().database_names());
//! ```

pub mod schema;

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use self::schema::{check_envelope, parse_definition, GraphDocument, MappingEntry, StepEntry};
use super::graph::{
    FieldRename, Graph, GraphError, HopSpec, MappingDefinition, Step, StepConfig,
    COMPOSITE_STEP_TYPE,
};
use super::resources::{
    ResolvedResourceSet, ResourceCategory, ResourceDeclaration, SharedResourcePool,
};
use super::transformation::Transformation;
use super::types::{GraphId, StepName};
use crate::steps::StepRegistry;

/// A step whose type tag the registry does not know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingPlugin {
    pub step: String,
    pub step_type: String,
}

impl fmt::Display for MissingPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.step, self.step_type)
    }
}

fn join_missing(missing: &[MissingPlugin]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors from loading a definition.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read definition file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed definition '{origin}': {message}")]
    Malformed { origin: String, message: String },

    #[error("graph '{graph}' uses unknown step types: {}", join_missing(.missing))]
    MissingPlugin {
        graph: GraphId,
        missing: Vec<MissingPlugin>,
    },

    #[error("graph '{graph}': {detail}")]
    UnknownStepReference {
        graph: GraphId,
        /// The step name that could not be found
        reference: String,
        detail: String,
    },
}

impl LoadError {
    fn malformed(origin: &str, message: impl Into<String>) -> Self {
        LoadError::Malformed {
            origin: origin.to_string(),
            message: message.into(),
        }
    }
}

/// Loads definition files against a registry and a shared pool.
#[derive(Debug, Clone, Copy)]
pub struct Loader<'a> {
    registry: &'a StepRegistry,
    pool: &'a SharedResourcePool,
}

impl<'a> Loader<'a> {
    pub fn new(registry: &'a StepRegistry, pool: &'a SharedResourcePool) -> Self {
        Self { registry, pool }
    }

    /// Load a definition file and every file it links.
    ///
    /// The root graph id is the canonical path of `path`.
    ///
    /// # Errors
    ///
    /// See [`LoadError`].
    pub fn load_file(&self, path: &Path) -> Result<Transformation, LoadError> {
        let canonical = canonicalize(path)?;
        let root = graph_id_for_path(&canonical)?;

        let mut session = Session::new(*self);
        session.seen.insert(root.clone());
        session.load_linked(&root, &canonical)?;
        session.finish(root)
    }

    /// Load a definition from a string.
    ///
    /// The root graph id is the document's `name`. Linked files are
    /// resolved relative to `base_dir`, or the current directory.
    pub fn load_str(
        &self,
        contents: &str,
        base_dir: Option<&Path>,
    ) -> Result<Transformation, LoadError> {
        let doc = parse_definition(contents)
            .map_err(|e| LoadError::malformed("<string>", e.to_string()))?;
        let root = GraphId::new(doc.name.clone())
            .map_err(|e| LoadError::malformed("<string>", e.to_string()))?;
        let base_dir = match base_dir {
            Some(dir) => dir.to_path_buf(),
            None => std::env::current_dir().map_err(|e| LoadError::Read {
                path: PathBuf::from("."),
                source: e,
            })?,
        };

        let mut session = Session::new(*self);
        session.seen.insert(root.clone());
        session.build_graph(root.clone(), &doc, &base_dir, "<string>")?;
        session.drain_pending()?;
        session.finish(root)
    }
}

/// State of one load call.
struct Session<'a> {
    loader: Loader<'a>,
    graphs: Vec<Graph>,
    seen: HashSet<GraphId>,
    pending: VecDeque<(GraphId, PathBuf)>,
}

impl<'a> Session<'a> {
    fn new(loader: Loader<'a>) -> Self {
        Self {
            loader,
            graphs: Vec::new(),
            seen: HashSet::new(),
            pending: VecDeque::new(),
        }
    }

    /// Read, parse and build a linked file, then everything it links.
    fn load_linked(&mut self, id: &GraphId, path: &Path) -> Result<(), LoadError> {
        self.load_one(id, path)?;
        self.drain_pending()
    }

    fn drain_pending(&mut self) -> Result<(), LoadError> {
        while let Some((id, path)) = self.pending.pop_front() {
            self.load_one(&id, &path)?;
        }
        Ok(())
    }

    fn load_one(&mut self, id: &GraphId, path: &Path) -> Result<(), LoadError> {
        let contents = fs::read_to_string(path).map_err(|e| LoadError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let origin = path.display().to_string();
        let doc = parse_definition(&contents).map_err(|e| LoadError::malformed(&origin, e.to_string()))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        self.build_graph(id.clone(), &doc, base_dir, &origin)
    }

    /// Build one graph (and its inline sub-graphs) from a document.
    fn build_graph(
        &mut self,
        id: GraphId,
        doc: &GraphDocument,
        base_dir: &Path,
        origin: &str,
    ) -> Result<(), LoadError> {
        check_envelope(doc.kind.as_deref(), doc.schema_version)
            .map_err(|e| LoadError::malformed(origin, e.to_string()))?;

        let missing: Vec<MissingPlugin> = doc
            .steps
            .iter()
            .filter(|s| !self.loader.registry.is_known(&s.step_type))
            .map(|s| MissingPlugin {
                step: s.name.clone(),
                step_type: s.step_type.clone(),
            })
            .collect();
        if !missing.is_empty() {
            return Err(LoadError::MissingPlugin { graph: id, missing });
        }

        let mut steps = Vec::with_capacity(doc.steps.len());
        for entry in &doc.steps {
            steps.push(self.build_step(&id, entry, base_dir, origin)?);
        }

        let hops = doc
            .hops
            .iter()
            .map(|h| HopSpec {
                from: h.from.clone(),
                to: h.to.clone(),
                enabled: h.enabled,
            })
            .collect();

        let resources = ResolvedResourceSet::merge(self.loader.pool, &declarations(doc, origin)?);

        let graph = Graph::new(id.clone(), doc.name.clone(), steps, hops, resources).map_err(
            |e| match e {
                GraphError::DuplicateStepName(name) => {
                    LoadError::malformed(origin, format!("duplicate step name '{name}'"))
                }
                GraphError::UnknownHopEndpoint { from, to, missing } => {
                    LoadError::UnknownStepReference {
                        graph: id.clone(),
                        reference: missing.clone(),
                        detail: format!("hop {from} -> {to} references unknown step '{missing}'"),
                    }
                }
            },
        )?;

        tracing::debug!(
            graph = %id,
            steps = graph.steps().len(),
            hops = graph.hops().len(),
            "built graph"
        );
        self.graphs.push(graph);
        Ok(())
    }

    fn build_step(
        &mut self,
        graph: &GraphId,
        entry: &StepEntry,
        base_dir: &Path,
        origin: &str,
    ) -> Result<Step, LoadError> {
        let name = StepName::new(entry.name.clone())
            .map_err(|e| LoadError::malformed(origin, e.to_string()))?;

        if entry.step_type != COMPOSITE_STEP_TYPE {
            if entry.mapping.is_some() {
                return Err(LoadError::malformed(
                    origin,
                    format!("step '{name}' of type '{}' cannot declare a mapping", entry.step_type),
                ));
            }
            return Ok(Step::plain(
                name,
                entry.step_type.clone(),
                StepConfig::new(entry.config.clone()),
            ));
        }

        let mapping = entry.mapping.as_ref().ok_or_else(|| {
            LoadError::malformed(origin, format!("composite step '{name}' has no [mapping] table"))
        })?;
        if !entry.config.is_empty() {
            return Err(LoadError::malformed(
                origin,
                format!("composite step '{name}' cannot carry a config table"),
            ));
        }

        let target = self.embedded_graph(graph, &name, mapping, base_dir, origin)?;
        Ok(Step::composite(
            name,
            MappingDefinition {
                graph: target,
                entry_step: mapping.input_step.clone(),
                exit_step: mapping.output_step.clone(),
                renames: mapping
                    .renames
                    .iter()
                    .map(|r| FieldRename {
                        parent: r.parent.clone(),
                        child: r.child.clone(),
                    })
                    .collect(),
            },
        ))
    }

    /// Build or schedule the graph a composite step embeds.
    fn embedded_graph(
        &mut self,
        graph: &GraphId,
        step: &StepName,
        mapping: &MappingEntry,
        base_dir: &Path,
        origin: &str,
    ) -> Result<GraphId, LoadError> {
        match (&mapping.path, &mapping.transformation) {
            (Some(_), Some(_)) | (None, None) => Err(LoadError::malformed(
                origin,
                format!("composite step '{step}' must set exactly one of 'path' or 'transformation'"),
            )),
            (None, Some(inline)) => {
                let child = graph.child(step.as_str());
                self.build_graph(child.clone(), inline, base_dir, origin)?;
                Ok(child)
            }
            (Some(path), None) => {
                let canonical = canonicalize(&base_dir.join(path))?;
                let id = graph_id_for_path(&canonical)?;
                if self.seen.insert(id.clone()) {
                    tracing::debug!(graph = %id, "scheduling linked sub-graph");
                    self.pending.push_back((id.clone(), canonical));
                }
                Ok(id)
            }
        }
    }

    /// Check composite references and assemble the transformation.
    fn finish(self, root: GraphId) -> Result<Transformation, LoadError> {
        for graph in &self.graphs {
            for step in graph.composite_steps() {
                let Some(mapping) = step.mapping() else {
                    continue;
                };
                let Some(embedded) = self.graphs.iter().find(|g| g.id() == &mapping.graph) else {
                    return Err(LoadError::UnknownStepReference {
                        graph: graph.id().clone(),
                        reference: mapping.graph.to_string(),
                        detail: format!(
                            "composite step '{}' embeds unknown graph '{}'",
                            step.name(),
                            mapping.graph
                        ),
                    });
                };
                for (role, name) in [("input", &mapping.entry_step), ("output", &mapping.exit_step)] {
                    if embedded.find_step(name).is_none() {
                        return Err(LoadError::UnknownStepReference {
                            graph: graph.id().clone(),
                            reference: name.clone(),
                            detail: format!(
                                "composite step '{}' names {role} step '{name}', which graph '{}' does not declare",
                                step.name(),
                                embedded.id()
                            ),
                        });
                    }
                }
            }
        }

        let count = self.graphs.len();
        let transformation = Transformation::new(root.clone(), self.graphs).ok_or_else(|| {
            LoadError::malformed(root.as_str(), "root graph missing after load")
        })?;
        tracing::debug!(root = %root, graphs = count, "loaded transformation");
        Ok(transformation)
    }
}

/// Private resource declarations of a document, in declaration order.
///
/// Blank names are rejected here, as the shared pool rejects them.
fn declarations(
    doc: &GraphDocument,
    origin: &str,
) -> Result<Vec<ResourceDeclaration>, LoadError> {
    let blank = |category: ResourceCategory| {
        LoadError::malformed(origin, format!("{category} declared with a blank name"))
    };

    let mut out = Vec::new();
    for db in &doc.databases {
        if db.name.trim().is_empty() {
            return Err(blank(ResourceCategory::Database));
        }
        let decl = if db.shared {
            ResourceDeclaration::shared(ResourceCategory::Database, db.name.clone())
        } else {
            ResourceDeclaration::private(ResourceCategory::Database, db.name.clone())
        };
        out.push(decl.with_parameters(db.parameters.clone()));
    }
    let others = [
        (ResourceCategory::PartitionSchema, &doc.partition_schemas),
        (ResourceCategory::ClusterSchema, &doc.cluster_schemas),
        (ResourceCategory::SlaveServer, &doc.slave_servers),
    ];
    for (category, entries) in others {
        for entry in entries {
            if entry.name.trim().is_empty() {
                return Err(blank(category));
            }
            out.push(
                ResourceDeclaration::private(category, entry.name.clone())
                    .with_parameters(entry.parameters.clone()),
            );
        }
    }
    Ok(out)
}

fn canonicalize(path: &Path) -> Result<PathBuf, LoadError> {
    fs::canonicalize(path).map_err(|e| LoadError::Read {
        path: path.to_path_buf(),
        source: e,
    })
}

fn graph_id_for_path(path: &Path) -> Result<GraphId, LoadError> {
    GraphId::new(path.display().to_string())
        .map_err(|e| LoadError::malformed(&path.display().to_string(), e.to_string()))
}
