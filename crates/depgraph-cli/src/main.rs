//! Dependency graph CLI.
//!
//! Provides the `depgraph` binary for inspecting a persisted graph and for
//! running one differentiation round from a JSON changeset. Output goes to
//! stdout as JSON; logs go to stderr and are controlled by `RUST_LOG`.

mod changeset;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use depgraph_core::codec::JsonCodec;
use depgraph_core::{OriginId, Symbol, SymbolId};
use depgraph_differentiate::{DifferentiateError, Differentiator, SignatureRule};
use depgraph_graph::{
    Graph, GraphConfiguration, GraphError, GraphView, RelativePathMapper, SharedGraph,
    DEPENDING_NODES,
};
use depgraph_storage::{SqliteStore, StorageError};

use crate::changeset::{Changeset, ChangesetError};

/// Incremental build dependency graph tools.
#[derive(Parser)]
#[command(name = "depgraph", about = "Incremental build dependency graph tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List the symbols depending on a symbol.
    Dependents {
        /// Path to the graph database file.
        #[arg(short, long)]
        db: String,

        /// Symbol identifier to look up.
        symbol: String,

        /// Index to query.
        #[arg(long, default_value = DEPENDING_NODES)]
        index: String,
    },

    /// List all origins, or the origins that produced one symbol.
    Origins {
        /// Path to the graph database file.
        #[arg(short, long)]
        db: String,

        #[arg(short, long)]
        symbol: Option<String>,

        /// Print origins as paths under this directory.
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Differentiate a changeset and integrate it.
    Apply {
        /// Path to the graph database file.
        #[arg(short, long)]
        db: String,

        /// JSON changeset file.
        #[arg(short, long)]
        changeset: PathBuf,

        /// Print the outcome without writing to the graph.
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Differentiate(#[from] DifferentiateError),

    #[error(transparent)]
    Changeset(#[from] ChangesetError),

    #[error("no index named '{0}'")]
    UnknownIndex(String),

    #[error("failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    /// 1 = graph or differentiation failure, 3 = I/O error.
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Storage(_) | CliError::Changeset(ChangesetError::Io(_)) => 3,
            _ => 1,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Dependents { db, symbol, index } => run_dependents(&db, &symbol, &index),
        Commands::Origins { db, symbol, root } => run_origins(&db, symbol.as_deref(), root),
        Commands::Apply {
            db,
            changeset,
            dry_run,
        } => run_apply(&db, &changeset, dry_run),
    };

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        process::exit(err.exit_code());
    }
}

fn open_graph(db_path: &str) -> Result<Graph<Symbol>, CliError> {
    let store = SqliteStore::open(db_path)?;
    Ok(Graph::open(
        Arc::new(store),
        Arc::new(JsonCodec::<Symbol>::new()),
        Vec::new(),
    )?)
}

fn print_json(value: &impl serde::Serialize) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_dependents(db_path: &str, symbol: &str, index: &str) -> Result<(), CliError> {
    let graph = open_graph(db_path)?;
    let index = graph
        .index(index)
        .ok_or_else(|| CliError::UnknownIndex(index.to_string()))?;
    let dependents = index.dependencies(&SymbolId::from(symbol))?;
    print_json(&dependents)
}

fn run_origins(db_path: &str, symbol: Option<&str>, root: Option<PathBuf>) -> Result<(), CliError> {
    let graph = open_graph(db_path)?;
    let origins = match symbol {
        Some(symbol) => graph.sources(&SymbolId::from(symbol))?,
        None => graph.origins()?,
    };
    match root {
        Some(root) => {
            let config = GraphConfiguration::new(
                SharedGraph::new(graph),
                Arc::new(RelativePathMapper::new(root)),
            );
            let paths: Vec<PathBuf> = origins
                .iter()
                .map(|origin| config.path_mapper().to_path(origin))
                .collect();
            print_json(&paths)
        }
        None => print_json(&origins),
    }
}

fn run_apply(db_path: &str, changeset_path: &Path, dry_run: bool) -> Result<(), CliError> {
    let changeset = Changeset::load(changeset_path)?;
    let shared = SharedGraph::new(open_graph(db_path)?);
    let params = changeset.params.clone().unwrap_or_default();
    let engine = Differentiator::new(params).with_rule(SignatureRule);

    let outcome = {
        let graph = shared.read()?;
        let delta = changeset.to_delta(&graph)?;
        engine.differentiate(&*graph, delta, &changeset.failed)?
    };
    print_json(&outcome.summary())?;

    if dry_run {
        tracing::info!("dry run, graph left untouched");
    } else if outcome.is_integrable() {
        shared.integrate(&outcome)?;
        let affected: Vec<&OriginId> = outcome.affected_origins().iter().collect();
        tracing::info!(?affected, "integrated changeset");
    } else {
        tracing::info!("outcome is not integrable, graph left untouched");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_changeset(dir: &Path, name: &str, json: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn apply_persists_only_when_not_dry_run() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("graph.db");
        let db = db.to_str().unwrap();
        let changeset = write_changeset(
            dir.path(),
            "round1.json",
            r#"{
                "records": [
                    { "origin": "a.rs", "symbol": { "id": "A", "kind": "struct", "signature": "struct A" } },
                    { "origin": "b.rs", "symbol": { "id": "B", "kind": "struct", "signature": "struct B",
                      "usages": [ { "target": "A" } ] } }
                ]
            }"#,
        );

        run_apply(db, &changeset, true).unwrap();
        assert!(open_graph(db).unwrap().origins().unwrap().is_empty());

        run_apply(db, &changeset, false).unwrap();
        let graph = open_graph(db).unwrap();
        assert_eq!(
            graph.depending_nodes(&SymbolId::from("A")).unwrap(),
            [SymbolId::from("B")].into_iter().collect()
        );
        assert_eq!(graph.origins().unwrap().len(), 2);
    }

    #[test]
    fn missing_changeset_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("graph.db");
        let err = run_apply(db.to_str().unwrap(), &dir.path().join("absent.json"), false)
            .unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
