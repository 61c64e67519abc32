//! Command-line arguments and the commands they dispatch to.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value as JsonValue;

use graphgate_core::error::GraphGateError;
use graphgate_core::traits::GraphStore;
use graphgate_core::types::{Params, Row};
use graphgate_graph_stores::GraphStoreComponent;

#[derive(Debug, Parser)]
#[command(name = "graphgate", version, about = "Query the configured graph store")]
pub struct Cli {
    /// Settings file (TOML, JSON, or YAML); GRAPHGATE_* variables override it
    #[arg(short, long, env = "GRAPHGATE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show which graph store the settings select
    Check,

    /// Run a Cypher query and print each row as a JSON line
    Query {
        /// Cypher text
        cypher: String,

        /// Query parameter as NAME=VALUE; VALUE is read as JSON, else as a string
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, JsonValue)>,
    },

    /// Print relation paths leaving the given subjects
    RelMap {
        /// Entity ids to start from
        #[arg(required = true)]
        subjects: Vec<String>,

        /// Maximum hops per path
        #[arg(long, default_value_t = 2)]
        depth: usize,

        /// Maximum number of paths
        #[arg(long, default_value_t = 30)]
        limit: usize,
    },

    /// Print node labels and relationship types
    Schema {
        /// Bypass the cached schema
        #[arg(long)]
        refresh: bool,
    },
}

/// Run `command` against the component's graph store.
pub async fn run(command: &Command, component: &GraphStoreComponent) -> anyhow::Result<()> {
    if let Command::Check = command {
        match component.backend() {
            Some(backend) => println!("graph store: {}", backend),
            None => println!("graph store: disabled"),
        }
        return Ok(());
    }

    let store = graph_store(component)?;
    match command {
        Command::Check => {}
        Command::Query { cypher, params } => {
            let params: Params = params.iter().cloned().collect();
            let rows = store
                .query(cypher, &params)
                .await
                .context("query failed")?;
            for row in rows {
                println!("{}", row_to_json(row));
            }
        }
        Command::RelMap {
            subjects,
            depth,
            limit,
        } => {
            let rel_map = store.get_rel_map(subjects, *depth, *limit).await?;
            println!("{}", serde_json::to_string_pretty(&rel_map)?);
        }
        Command::Schema { refresh } => {
            println!("{}", store.get_schema(*refresh).await?);
        }
    }
    Ok(())
}

fn graph_store(component: &GraphStoreComponent) -> Result<Arc<dyn GraphStore>, GraphGateError> {
    component
        .graph_store()
        .ok_or_else(|| GraphGateError::state("GraphStore not defined in settings"))
}

/// Parse `NAME=VALUE`, reading VALUE as JSON and falling back to a plain string.
pub fn parse_param(raw: &str) -> Result<(String, JsonValue), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing parameter name in '{}'", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| JsonValue::from(value));
    Ok((name.to_string(), value))
}

fn row_to_json(row: Row) -> JsonValue {
    JsonValue::Object(row.into_inner().into_iter().collect())
}
