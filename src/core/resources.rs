//! core::resources
//!
//! Shared and private resource definitions, and the scope merge between them.
//!
//! # Scopes
//!
//! - **Shared**: definitions in a [`SharedResourcePool`] usable by any graph.
//!   The pool's lifecycle belongs to the caller; it is passed in explicitly.
//! - **Private**: definitions declared in one graph's definition file.
//!
//! # Merge
//!
//! For each [`ResourceCategory`] independently, the pool's entries come
//! first, tagged shared. Each private declaration then either replaces the
//! entry with the same (case-insensitive) name in place, or is appended.
//! The result is immutable once built.
//!
//! # Example
//!
//! ```
//! use translineage::core::resources::{
//!     ResolvedResourceSet, ResourceCategory, ResourceDeclaration, SharedResourcePool,
//! };
//!
//! let mut pool = SharedResourcePool::new();
//! pool.add(ResourceCategory::Database, "shared", Default::default()).unwrap();
//!
//! let private = vec![ResourceDeclaration::private(ResourceCategory::Database, "test")];
//! let set = ResolvedResourceSet::merge(&pool, &private);
//!
//! assert_eq!(set.database_names(), vec!["shared", "test"]);
//! assert!(set.databases()[0].is_shared());
//! assert!(!set.databases()[1].is_shared());
//! assert_eq!(set.private_database_names(), &["test".to_string()]);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the shared resource pool.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to read shared resources file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse shared resources file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("duplicate shared {category} '{name}'")]
    Duplicate {
        category: ResourceCategory,
        name: String,
    },

    #[error("shared {category} has an empty name")]
    EmptyName { category: ResourceCategory },
}

/// Kind of resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    Database,
    PartitionSchema,
    ClusterSchema,
    SlaveServer,
}

impl ResourceCategory {
    pub const ALL: [ResourceCategory; 4] = [
        ResourceCategory::Database,
        ResourceCategory::PartitionSchema,
        ResourceCategory::ClusterSchema,
        ResourceCategory::SlaveServer,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ResourceCategory::Database => "database connection",
            ResourceCategory::PartitionSchema => "partition schema",
            ResourceCategory::ClusterSchema => "cluster schema",
            ResourceCategory::SlaveServer => "slave server",
        }
    }

    /// Table name used in definition and shared-resource files.
    pub fn section(&self) -> &'static str {
        match self {
            ResourceCategory::Database => "databases",
            ResourceCategory::PartitionSchema => "partition_schemas",
            ResourceCategory::ClusterSchema => "cluster_schemas",
            ResourceCategory::SlaveServer => "slave_servers",
        }
    }

    fn slot(&self) -> usize {
        match self {
            ResourceCategory::Database => 0,
            ResourceCategory::PartitionSchema => 1,
            ResourceCategory::ClusterSchema => 2,
            ResourceCategory::SlaveServer => 3,
        }
    }
}

impl std::fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A resolved resource with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceDefinition {
    name: String,
    category: ResourceCategory,
    is_shared: bool,
    parameters: toml::Table,
}

impl ResourceDefinition {
    pub fn new(
        category: ResourceCategory,
        name: impl Into<String>,
        is_shared: bool,
        parameters: toml::Table,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            is_shared,
            parameters,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> ResourceCategory {
        self.category
    }

    /// Whether this definition came from the shared pool.
    pub fn is_shared(&self) -> bool {
        self.is_shared
    }

    pub fn parameters(&self) -> &toml::Table {
        &self.parameters
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A resource as declared in a definition file, before merging.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDeclaration {
    pub category: ResourceCategory,
    pub name: String,
    /// Origin marker carried by database declarations. `true` means the file
    /// refers to a definition exported to the shared pool.
    pub shared: bool,
    pub parameters: toml::Table,
}

impl ResourceDeclaration {
    /// A private declaration with no parameters.
    pub fn private(category: ResourceCategory, name: impl Into<String>) -> Self {
        Self {
            category,
            name: name.into(),
            shared: false,
            parameters: toml::Table::new(),
        }
    }

    /// A declaration marked as referring to a shared definition.
    pub fn shared(category: ResourceCategory, name: impl Into<String>) -> Self {
        Self {
            shared: true,
            ..Self::private(category, name)
        }
    }

    pub fn with_parameters(mut self, parameters: toml::Table) -> Self {
        self.parameters = parameters;
        self
    }
}

/// On-disk shape of a shared resources file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SharedResourcesFile {
    databases: Vec<SharedEntry>,
    partition_schemas: Vec<SharedEntry>,
    cluster_schemas: Vec<SharedEntry>,
    slave_servers: Vec<SharedEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SharedEntry {
    name: String,
    #[serde(default)]
    parameters: toml::Table,
}

/// Process-wide pool of shared resource definitions.
///
/// Read-only while graphs are loaded and resolved; it is safe to share one
/// pool between threads.
#[derive(Debug, Clone, Default)]
pub struct SharedResourcePool {
    entries: [Vec<ResourceDefinition>; 4],
}

impl SharedResourcePool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a pool from a shared resources TOML file.
    ///
    /// # Example
    ///
    /// ```toml
    /// [[databases]]
    /// name = "shared"
    /// [databases.parameters]
    /// host = "db.internal"
    ///
    /// [[slave_servers]]
    /// name = "carte-1"
    /// ```
    pub fn load(path: &Path) -> Result<Self, ResourceError> {
        let contents = fs::read_to_string(path).map_err(|e| ResourceError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&contents, path)
    }

    /// Parse a pool from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ResourceError> {
        Self::parse(contents, Path::new("<string>"))
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, ResourceError> {
        let file: SharedResourcesFile =
            toml::from_str(contents).map_err(|e| ResourceError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let mut pool = Self::new();
        let sections = [
            (ResourceCategory::Database, file.databases),
            (ResourceCategory::PartitionSchema, file.partition_schemas),
            (ResourceCategory::ClusterSchema, file.cluster_schemas),
            (ResourceCategory::SlaveServer, file.slave_servers),
        ];
        for (category, entries) in sections {
            for entry in entries {
                pool.add(category, entry.name, entry.parameters)?;
            }
        }

        tracing::debug!(
            path = %path.display(),
            databases = pool.definitions(ResourceCategory::Database).len(),
            "loaded shared resource pool"
        );
        Ok(pool)
    }

    /// Add a shared definition.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::Duplicate` if the category already holds the
    /// name, or `ResourceError::EmptyName` for a blank name.
    pub fn add(
        &mut self,
        category: ResourceCategory,
        name: impl Into<String>,
        parameters: toml::Table,
    ) -> Result<(), ResourceError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ResourceError::EmptyName { category });
        }
        if self.find(category, &name).is_some() {
            return Err(ResourceError::Duplicate { category, name });
        }
        self.entries[category.slot()].push(ResourceDefinition::new(
            category, name, true, parameters,
        ));
        Ok(())
    }

    /// Definitions of one category in insertion order.
    pub fn definitions(&self, category: ResourceCategory) -> &[ResourceDefinition] {
        &self.entries[category.slot()]
    }

    /// Case-insensitive lookup.
    pub fn find(&self, category: ResourceCategory, name: &str) -> Option<&ResourceDefinition> {
        self.definitions(category).iter().find(|d| d.is_named(name))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Vec::is_empty)
    }
}

/// Final resource lists of one graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedResourceSet {
    databases: Vec<ResourceDefinition>,
    partition_schemas: Vec<ResourceDefinition>,
    cluster_schemas: Vec<ResourceDefinition>,
    slave_servers: Vec<ResourceDefinition>,
    private_databases: Vec<String>,
}

impl ResolvedResourceSet {
    /// Merge the shared pool with a graph's declarations.
    ///
    /// Declarations are applied in order. A private declaration replaces an
    /// entry with the same name in place (keeping its position) and clears
    /// the shared flag; unknown names are appended. A database declaration
    /// marked `shared` keeps the pooled definition when the pool has it and
    /// is appended as shared otherwise; if it replaces an earlier private
    /// declaration, that name is no longer listed as private.
    pub fn merge(pool: &SharedResourcePool, declarations: &[ResourceDeclaration]) -> Self {
        let mut lists: [Vec<ResourceDefinition>; 4] = Default::default();
        for category in ResourceCategory::ALL {
            lists[category.slot()] = pool.definitions(category).to_vec();
        }
        let mut private_databases: Vec<String> = Vec::new();

        for decl in declarations {
            let list = &mut lists[decl.category.slot()];
            let existing = list.iter().position(|d| d.is_named(&decl.name));
            let refers_to_shared = decl.shared && decl.category == ResourceCategory::Database;

            if refers_to_shared {
                match existing {
                    Some(i) if list[i].is_shared() => {
                        tracing::trace!(name = %decl.name, "declaration refers to pooled definition");
                    }
                    Some(i) => {
                        list[i] = ResourceDefinition::new(
                            decl.category,
                            decl.name.clone(),
                            true,
                            decl.parameters.clone(),
                        );
                        private_databases.retain(|n| !n.eq_ignore_ascii_case(&decl.name));
                    }
                    None => list.push(ResourceDefinition::new(
                        decl.category,
                        decl.name.clone(),
                        true,
                        decl.parameters.clone(),
                    )),
                }
                continue;
            }

            let definition = ResourceDefinition::new(
                decl.category,
                decl.name.clone(),
                false,
                decl.parameters.clone(),
            );
            match existing {
                Some(i) => {
                    if list[i].is_shared() {
                        tracing::debug!(
                            category = %decl.category,
                            name = %decl.name,
                            "private declaration overrides shared definition"
                        );
                    }
                    list[i] = definition;
                }
                None => list.push(definition),
            }

            if decl.category == ResourceCategory::Database
                && !private_databases
                    .iter()
                    .any(|n| n.eq_ignore_ascii_case(&decl.name))
            {
                private_databases.push(decl.name.clone());
            }
        }

        let [databases, partition_schemas, cluster_schemas, slave_servers] = lists;
        Self {
            databases,
            partition_schemas,
            cluster_schemas,
            slave_servers,
            private_databases,
        }
    }

    /// Definitions of one category in resolved order.
    pub fn definitions(&self, category: ResourceCategory) -> &[ResourceDefinition] {
        match category {
            ResourceCategory::Database => &self.databases,
            ResourceCategory::PartitionSchema => &self.partition_schemas,
            ResourceCategory::ClusterSchema => &self.cluster_schemas,
            ResourceCategory::SlaveServer => &self.slave_servers,
        }
    }

    /// Names of one category in resolved order.
    pub fn names(&self, category: ResourceCategory) -> Vec<&str> {
        self.definitions(category).iter().map(|d| d.name()).collect()
    }

    /// Case-insensitive lookup.
    pub fn find(&self, category: ResourceCategory, name: &str) -> Option<&ResourceDefinition> {
        self.definitions(category).iter().find(|d| d.is_named(name))
    }

    pub fn databases(&self) -> &[ResourceDefinition] {
        &self.databases
    }

    pub fn database_names(&self) -> Vec<&str> {
        self.names(ResourceCategory::Database)
    }

    pub fn partition_schema_names(&self) -> Vec<&str> {
        self.names(ResourceCategory::PartitionSchema)
    }

    pub fn cluster_schema_names(&self) -> Vec<&str> {
        self.names(ResourceCategory::ClusterSchema)
    }

    pub fn slave_server_names(&self) -> Vec<&str> {
        self.names(ResourceCategory::SlaveServer)
    }

    /// Names of databases declared privately by the definition file, in
    /// declaration order.
    pub fn private_database_names(&self) -> &[String] {
        &self.private_databases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_with(category: ResourceCategory, names: &[&str]) -> SharedResourcePool {
        let mut pool = SharedResourcePool::new();
        for name in names {
            pool.add(category, *name, toml::Table::new()).unwrap();
        }
        pool
    }

    #[test]
    fn shared_entries_come_first() {
        let pool = pool_with(ResourceCategory::Database, &["shared"]);
        let set = ResolvedResourceSet::merge(
            &pool,
            &[ResourceDeclaration::private(ResourceCategory::Database, "test")],
        );

        assert_eq!(set.database_names(), vec!["shared", "test"]);
        assert!(set.databases()[0].is_shared());
        assert!(!set.databases()[1].is_shared());
    }

    #[test]
    fn private_override_keeps_position() {
        let pool = pool_with(ResourceCategory::Database, &["first", "shared", "last"]);
        let set = ResolvedResourceSet::merge(
            &pool,
            &[
                ResourceDeclaration::private(ResourceCategory::Database, "test"),
                ResourceDeclaration::private(ResourceCategory::Database, "SHARED"),
            ],
        );

        assert_eq!(set.database_names(), vec!["first", "SHARED", "last", "test"]);
        let flags: Vec<_> = set.databases().iter().map(|d| d.is_shared()).collect();
        assert_eq!(flags, vec![true, false, true, false]);
        assert_eq!(set.private_database_names(), &["test", "SHARED"]);
    }

    #[test]
    fn shared_marker_keeps_pooled_definition() {
        let mut pool = SharedResourcePool::new();
        let mut params = toml::Table::new();
        params.insert("host".into(), toml::Value::String("pool-host".into()));
        pool.add(ResourceCategory::Database, "shared", params).unwrap();

        let mut file_params = toml::Table::new();
        file_params.insert("host".into(), toml::Value::String("file-host".into()));
        let set = ResolvedResourceSet::merge(
            &pool,
            &[ResourceDeclaration::shared(ResourceCategory::Database, "shared")
                .with_parameters(file_params)],
        );

        assert_eq!(set.database_names(), vec!["shared"]);
        assert!(set.databases()[0].is_shared());
        assert_eq!(
            set.databases()[0].parameters()["host"].as_str(),
            Some("pool-host")
        );
        assert!(set.private_database_names().is_empty());
    }

    #[test]
    fn shared_marker_without_pool_entry_is_appended_as_shared() {
        let set = ResolvedResourceSet::merge(
            &SharedResourcePool::new(),
            &[ResourceDeclaration::shared(ResourceCategory::Database, "exported")],
        );
        assert_eq!(set.database_names(), vec!["exported"]);
        assert!(set.databases()[0].is_shared());
    }

    #[test]
    fn shared_marker_after_private_declaration_drops_private_name() {
        let set = ResolvedResourceSet::merge(
            &SharedResourcePool::new(),
            &[
                ResourceDeclaration::private(ResourceCategory::Database, "x"),
                ResourceDeclaration::private(ResourceCategory::Database, "y"),
                ResourceDeclaration::shared(ResourceCategory::Database, "X"),
            ],
        );
        assert_eq!(set.database_names(), vec!["X", "y"]);
        assert!(set.databases()[0].is_shared());
        assert!(!set.databases()[1].is_shared());
        assert_eq!(set.private_database_names(), &["y"]);

        // Every listed private name is backed by a non-shared definition.
        for name in set.private_database_names() {
            let def = set.databases().iter().find(|d| d.is_named(name)).unwrap();
            assert!(!def.is_shared());
        }
    }

    #[test]
    fn categories_merge_independently() {
        let pool = pool_with(ResourceCategory::SlaveServer, &["carte"]);
        let set = ResolvedResourceSet::merge(
            &pool,
            &[
                ResourceDeclaration::private(ResourceCategory::PartitionSchema, "test"),
                ResourceDeclaration::private(ResourceCategory::ClusterSchema, "test"),
                ResourceDeclaration::private(ResourceCategory::SlaveServer, "test"),
            ],
        );

        assert_eq!(set.partition_schema_names(), vec!["test"]);
        assert_eq!(set.cluster_schema_names(), vec!["test"]);
        assert_eq!(set.slave_server_names(), vec!["carte", "test"]);
        assert!(set.database_names().is_empty());
        assert!(set.private_database_names().is_empty());
    }

    #[test]
    fn repeated_private_declaration_replaces_earlier_one() {
        let mut second = toml::Table::new();
        second.insert("port".into(), toml::Value::Integer(5433));
        let set = ResolvedResourceSet::merge(
            &SharedResourcePool::new(),
            &[
                ResourceDeclaration::private(ResourceCategory::Database, "test"),
                ResourceDeclaration::private(ResourceCategory::Database, "other"),
                ResourceDeclaration::private(ResourceCategory::Database, "Test")
                    .with_parameters(second),
            ],
        );
        assert_eq!(set.database_names(), vec!["Test", "other"]);
        assert_eq!(set.databases()[0].parameters()["port"].as_integer(), Some(5433));
        assert_eq!(set.private_database_names(), &["test", "other"]);
    }

    #[test]
    fn merge_does_not_touch_pool() {
        let pool = pool_with(ResourceCategory::Database, &["shared"]);
        let _ = ResolvedResourceSet::merge(
            &pool,
            &[ResourceDeclaration::private(ResourceCategory::Database, "shared")],
        );
        assert!(pool.definitions(ResourceCategory::Database)[0].is_shared());
    }

    #[test]
    fn pool_rejects_duplicates() {
        let mut pool = pool_with(ResourceCategory::Database, &["shared"]);
        let err = pool
            .add(ResourceCategory::Database, "SHARED", toml::Table::new())
            .unwrap_err();
        assert!(matches!(err, ResourceError::Duplicate { .. }));
        assert!(pool
            .add(ResourceCategory::ClusterSchema, "shared", toml::Table::new())
            .is_ok());
    }

    #[test]
    fn pool_parses_toml() {
        let pool = SharedResourcePool::from_toml_str(
            r#"
            [[databases]]
            name = "shared"
            [databases.parameters]
            host = "db.internal"

            [[slave_servers]]
            name = "carte-1"
            "#,
        )
        .unwrap();

        let db = pool.find(ResourceCategory::Database, "Shared").unwrap();
        assert!(db.is_shared());
        assert_eq!(db.parameters()["host"].as_str(), Some("db.internal"));
        assert_eq!(pool.definitions(ResourceCategory::SlaveServer).len(), 1);
    }

    #[test]
    fn pool_rejects_unknown_sections() {
        let err = SharedResourcePool::from_toml_str("[[queues]]\nname = \"x\"").unwrap_err();
        assert!(matches!(err, ResourceError::ParseError { .. }));
    }
}
