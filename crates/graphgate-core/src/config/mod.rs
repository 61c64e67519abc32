//! Configuration system for graphgate.
//!
//! Settings come from a file (TOML, JSON, or YAML, picked by extension) and
//! are then overridden by `GRAPHGATE_*` environment variables:
//!
//! ```toml
//! [graphstore]
//! database = "neo4j"
//!
//! [neo4j]
//! url = "bolt://localhost:7687"
//! username = "neo4j"
//! password = "password"
//! ```
//!
//! Per-backend blocks are optional. Whether the block for the selected
//! backend is actually present is checked by [`Settings::graph_backend`].

use std::path::Path;
use std::str::FromStr;

use secrecy::SecretString;
use serde::Deserialize;
use strum::VariantNames;
use tracing::debug;

use crate::error::{GraphGateError, GraphResult};
use crate::traits::GraphStoreDatabase;

const ENV_PREFIX: &str = "GRAPHGATE_";

/// Graph store selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct GraphStoreSettings {
    /// Backend to connect to.
    pub database: GraphStoreDatabase,
}

/// Connection settings for Neo4j.
#[derive(Debug, Clone, Deserialize)]
pub struct Neo4jSettings {
    /// Bolt URL.
    #[serde(default = "default_neo4j_url")]
    pub url: String,
    /// Username for authentication.
    #[serde(default)]
    pub username: Option<String>,
    /// Password for authentication.
    #[serde(default)]
    pub password: Option<SecretString>,
    /// Database name.
    #[serde(default)]
    pub database: Option<String>,
    /// Label used for entity nodes.
    #[serde(default)]
    pub node_label: Option<String>,
}

fn default_neo4j_url() -> String {
    "bolt://localhost:7687".to_string()
}

impl Default for Neo4jSettings {
    fn default() -> Self {
        Self {
            url: default_neo4j_url(),
            username: None,
            password: None,
            database: None,
            node_label: None,
        }
    }
}

/// Connection settings for FalkorDB.
#[derive(Debug, Clone, Deserialize)]
pub struct FalkorDbSettings {
    /// Redis-protocol URL.
    #[serde(default = "default_falkordb_url")]
    pub url: String,
    /// Username for authentication.
    #[serde(default)]
    pub username: Option<String>,
    /// Password for authentication.
    #[serde(default)]
    pub password: Option<SecretString>,
    /// Graph key.
    #[serde(default)]
    pub database: Option<String>,
    /// Label used for entity nodes.
    #[serde(default)]
    pub node_label: Option<String>,
    /// Decode bulk string replies as UTF-8 text instead of raw bytes.
    #[serde(default)]
    pub decode_responses: bool,
}

fn default_falkordb_url() -> String {
    "redis://localhost:6379".to_string()
}

impl Default for FalkorDbSettings {
    fn default() -> Self {
        Self {
            url: default_falkordb_url(),
            username: None,
            password: None,
            database: None,
            node_label: None,
            decode_responses: false,
        }
    }
}

/// Application settings consumed by the graph store component.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graph store selection (unset disables the graph store).
    pub graphstore: Option<GraphStoreSettings>,
    /// Neo4j connection block.
    pub neo4j: Option<Neo4jSettings>,
    /// FalkorDB connection block.
    pub falkordb: Option<FalkorDbSettings>,
}

/// The selected backend together with its validated settings block.
#[derive(Debug, Clone)]
pub enum GraphBackend {
    /// No graph store configured.
    Unset,
    /// Neo4j with its connection settings.
    Neo4j(Neo4jSettings),
    /// FalkorDB with its connection settings.
    FalkorDb(FalkorDbSettings),
}

impl GraphBackend {
    /// The backend kind, if one is selected.
    pub fn database(&self) -> Option<GraphStoreDatabase> {
        match self {
            Self::Unset => None,
            Self::Neo4j(_) => Some(GraphStoreDatabase::Neo4j),
            Self::FalkorDb(_) => Some(GraphStoreDatabase::FalkorDb),
        }
    }
}

impl Settings {
    /// Load settings from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> GraphResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());
        debug!(path = %path.as_ref().display(), "Loading settings");

        match ext {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| GraphGateError::configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| GraphGateError::configuration(e.to_string())),
            _ => Err(GraphGateError::configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml",
            )),
        }
    }

    /// Parse settings from a TOML document.
    pub fn from_toml_str(content: &str) -> GraphResult<Self> {
        toml::from_str(content).map_err(|e| GraphGateError::configuration(e.to_string()))
    }

    /// Load settings from environment variables only.
    pub fn from_env() -> GraphResult<Self> {
        Self::default().with_env()
    }

    /// Load settings from an optional file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> GraphResult<Self> {
        let settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.with_env()
    }

    /// Apply `GRAPHGATE_*` environment overrides.
    pub fn with_env(self) -> GraphResult<Self> {
        self.with_env_lookup(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`, keyed by full variable name.
    ///
    /// A backend block is only created when at least one of its variables is
    /// set; an empty `GRAPHGATE_GRAPHSTORE_DATABASE` clears the selection.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> GraphResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(database) = var("GRAPHSTORE_DATABASE") {
            let database = database.trim();
            self.graphstore = if database.is_empty() {
                None
            } else {
                Some(GraphStoreSettings {
                    database: parse_database(database)?,
                })
            };
        }

        let neo4j_vars = [
            var("NEO4J_URL"),
            var("NEO4J_USERNAME"),
            var("NEO4J_PASSWORD"),
            var("NEO4J_DATABASE"),
        ];
        if neo4j_vars.iter().any(Option::is_some) {
            let [url, username, password, database] = neo4j_vars;
            let neo4j = self.neo4j.get_or_insert_with(Neo4jSettings::default);
            if let Some(url) = url {
                neo4j.url = url;
            }
            if username.is_some() {
                neo4j.username = username;
            }
            if let Some(password) = password {
                neo4j.password = Some(SecretString::new(password));
            }
            if database.is_some() {
                neo4j.database = database;
            }
        }

        let falkordb_vars = [
            var("FALKORDB_URL"),
            var("FALKORDB_USERNAME"),
            var("FALKORDB_PASSWORD"),
            var("FALKORDB_DATABASE"),
        ];
        if falkordb_vars.iter().any(Option::is_some) {
            let [url, username, password, database] = falkordb_vars;
            let falkordb = self.falkordb.get_or_insert_with(FalkorDbSettings::default);
            if let Some(url) = url {
                falkordb.url = url;
            }
            if username.is_some() {
                falkordb.username = username;
            }
            if let Some(password) = password {
                falkordb.password = Some(SecretString::new(password));
            }
            if database.is_some() {
                falkordb.database = database;
            }
        }

        Ok(self)
    }

    /// The selected backend kind, if any.
    pub fn selected_database(&self) -> Option<GraphStoreDatabase> {
        self.graphstore.map(|g| g.database)
    }

    /// Resolve the selection into a backend paired with its settings block.
    ///
    /// Fails when a backend is selected but its block is absent.
    pub fn graph_backend(&self) -> GraphResult<GraphBackend> {
        match self.selected_database() {
            None => Ok(GraphBackend::Unset),
            Some(GraphStoreDatabase::Neo4j) => self
                .neo4j
                .clone()
                .map(GraphBackend::Neo4j)
                .ok_or_else(|| {
                    GraphGateError::missing_backend_settings(
                        GraphStoreDatabase::Neo4j.product_name(),
                    )
                }),
            Some(GraphStoreDatabase::FalkorDb) => self
                .falkordb
                .clone()
                .map(GraphBackend::FalkorDb)
                .ok_or_else(|| {
                    GraphGateError::missing_backend_settings(
                        GraphStoreDatabase::FalkorDb.product_name(),
                    )
                }),
        }
    }

    /// Build settings using builder pattern.
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }
}

fn parse_database(value: &str) -> GraphResult<GraphStoreDatabase> {
    GraphStoreDatabase::from_str(value).map_err(|_| {
        GraphGateError::configuration(format!(
            "Graph store database {} not supported. Expected one of: {}",
            value,
            GraphStoreDatabase::VARIANTS.join(", ")
        ))
    })
}

/// Builder for Settings.
#[derive(Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    /// Select the graph store backend.
    pub fn graphstore(mut self, database: GraphStoreDatabase) -> Self {
        self.settings.graphstore = Some(GraphStoreSettings { database });
        self
    }

    /// Set the Neo4j connection block.
    pub fn neo4j(mut self, settings: Neo4jSettings) -> Self {
        self.settings.neo4j = Some(settings);
        self
    }

    /// Set the FalkorDB connection block.
    pub fn falkordb(mut self, settings: FalkorDbSettings) -> Self {
        self.settings.falkordb = Some(settings);
        self
    }

    /// Build the settings.
    pub fn build(self) -> Settings {
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_has_no_backend() {
        let settings = Settings::default();
        assert_eq!(settings.selected_database(), None);
        assert!(matches!(settings.graph_backend().unwrap(), GraphBackend::Unset));
    }

    #[test]
    fn test_toml_neo4j() {
        let settings = Settings::from_toml_str(
            r#"
            [graphstore]
            database = "neo4j"

            [neo4j]
            url = "bolt://graph:7687"
            username = "neo4j"
            password = "hunter2"
            "#,
        )
        .unwrap();

        assert_eq!(settings.selected_database(), Some(GraphStoreDatabase::Neo4j));
        match settings.graph_backend().unwrap() {
            GraphBackend::Neo4j(neo4j) => {
                assert_eq!(neo4j.url, "bolt://graph:7687");
                assert_eq!(neo4j.username.as_deref(), Some("neo4j"));
                assert_eq!(neo4j.password.unwrap().expose_secret(), "hunter2");
                assert!(neo4j.database.is_none());
            }
            other => panic!("unexpected backend: {:?}", other),
        }
    }

    #[test]
    fn test_toml_falkordb_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            [graphstore]
            database = "falkordb"

            [falkordb]
            "#,
        )
        .unwrap();

        let falkordb = settings.falkordb.unwrap();
        assert_eq!(falkordb.url, "redis://localhost:6379");
        assert!(!falkordb.decode_responses);
    }

    #[test]
    fn test_unknown_database_in_file_is_configuration_error() {
        let err = Settings::from_toml_str(
            r#"
            [graphstore]
            database = "memgraph"
            "#,
        )
        .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("memgraph"));
    }

    #[test]
    fn test_selected_backend_without_block_fails() {
        let settings = Settings::builder()
            .graphstore(GraphStoreDatabase::FalkorDb)
            .build();
        let err = settings.graph_backend().unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(err.code(), ErrorCode::CfgMissingBackend);
        assert!(err.to_string().contains("FalkorDB settings not found"));

        let malformed = Settings::from_toml_str("[graphstore").unwrap_err();
        assert_eq!(malformed.code(), ErrorCode::CfgInvalid);
    }

    #[test]
    fn test_database_name_is_case_sensitive_in_file_and_env() {
        let from_file = Settings::from_toml_str(
            r#"
            [graphstore]
            database = "FalkorDB"
            "#,
        )
        .unwrap_err();
        assert!(from_file.is_configuration());

        let from_env = Settings::default()
            .with_env_lookup(lookup(&[("GRAPHGATE_GRAPHSTORE_DATABASE", "FalkorDB")]))
            .unwrap_err();
        assert!(from_env.is_configuration());
        assert!(from_env.to_string().contains("FalkorDB not supported"));
    }

    #[test]
    fn test_password_is_redacted_in_debug() {
        let settings = Neo4jSettings {
            password: Some(SecretString::new("hunter2".to_string())),
            ..Default::default()
        };
        assert!(!format!("{:?}", settings).contains("hunter2"));
    }

    #[test]
    fn test_env_selects_backend_and_creates_block() {
        let settings = Settings::default()
            .with_env_lookup(lookup(&[
                ("GRAPHGATE_GRAPHSTORE_DATABASE", "falkordb"),
                ("GRAPHGATE_FALKORDB_DATABASE", "knowledge"),
            ]))
            .unwrap();

        assert_eq!(
            settings.selected_database(),
            Some(GraphStoreDatabase::FalkorDb)
        );
        let falkordb = settings.falkordb.unwrap();
        assert_eq!(falkordb.database.as_deref(), Some("knowledge"));
        assert_eq!(falkordb.url, "redis://localhost:6379");
        assert!(settings.neo4j.is_none());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let settings = Settings::from_toml_str(
            r#"
            [neo4j]
            url = "bolt://file:7687"
            username = "file-user"
            "#,
        )
        .unwrap()
        .with_env_lookup(lookup(&[("GRAPHGATE_NEO4J_URL", "bolt://env:7687")]))
        .unwrap();

        let neo4j = settings.neo4j.unwrap();
        assert_eq!(neo4j.url, "bolt://env:7687");
        assert_eq!(neo4j.username.as_deref(), Some("file-user"));
    }

    #[test]
    fn test_env_empty_database_clears_selection() {
        let settings = Settings::builder()
            .graphstore(GraphStoreDatabase::Neo4j)
            .build()
            .with_env_lookup(lookup(&[("GRAPHGATE_GRAPHSTORE_DATABASE", "")]))
            .unwrap();
        assert!(settings.graphstore.is_none());
    }

    #[test]
    fn test_env_unknown_database_fails() {
        let err = Settings::default()
            .with_env_lookup(lookup(&[("GRAPHGATE_GRAPHSTORE_DATABASE", "kuzu")]))
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("neo4j, falkordb"));
    }

    #[test]
    fn test_from_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("settings.yaml");
        std::fs::write(&yaml, "graphstore:\n  database: neo4j\nneo4j:\n  username: neo4j\n")
            .unwrap();
        let settings = Settings::from_file(&yaml).unwrap();
        assert_eq!(settings.selected_database(), Some(GraphStoreDatabase::Neo4j));

        let json = dir.path().join("settings.json");
        std::fs::write(&json, r#"{"falkordb": {"url": "redis://cache:6379"}}"#).unwrap();
        let settings = Settings::from_file(&json).unwrap();
        assert_eq!(settings.falkordb.unwrap().url, "redis://cache:6379");

        let ini = dir.path().join("settings.ini");
        std::fs::write(&ini, "").unwrap();
        assert!(Settings::from_file(&ini).unwrap_err().is_configuration());
    }
}
