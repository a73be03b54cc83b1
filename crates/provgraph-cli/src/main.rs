//! CLI entry point for the provgraph provenance store.
//!
//! Designed for subprocess invocation: command arguments and results are
//! JSON on stdin/stdout, logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::{fmt, EnvFilter};

use provgraph_core::{GraphContext, SourceRef, StoreConfig};
use provgraph_store::{Action, CommandDispatcher, GraphStore, StoreError};

#[derive(Parser)]
#[command(name = "provgraph")]
#[command(about = "Property graph store with content-hashed provenance")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: provgraph).
    #[arg(short, long, default_value = "provgraph", global = true)]
    config: String,

    /// Override the database path from config.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run a store action with a JSON argument object (from --args or stdin).
    Exec {
        /// Action name, e.g. get_context.
        action: String,
        /// JSON arguments; read from stdin when omitted.
        #[arg(long)]
        args: Option<String>,
    },
    /// Export the whole graph to a file (a fresh temp file by default).
    Export {
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Merge a previously exported graph file into the store.
    Import { file: PathBuf },
    /// Print the distinct node labels and relationship types.
    Schema,
    /// Print the content hash of a file.
    Hash { file: PathBuf },
    /// Check a file against a recorded content hash.
    Verify {
        file: PathBuf,
        #[arg(long)]
        hash: String,
    },
    /// List the actions accepted by `exec`.
    Actions,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let output = run(&cli)?;
    println!("{}", serde_json::to_string(&output)?);

    if output.get("verified") == Some(&Value::Bool(false)) {
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(cli: &Cli) -> anyhow::Result<Value> {
    match &cli.command {
        Command::Exec { action, args } => {
            let raw = match args {
                Some(raw) => raw.clone(),
                None => std::io::read_to_string(std::io::stdin())?,
            };
            let args = parse_args(&raw)?;
            with_store(cli, |store| Ok(CommandDispatcher::new(store).execute(action, args)?))
        }
        Command::Export { out } => with_store(cli, |store| export(store, out.as_deref())),
        Command::Import { file } => {
            let context = GraphContext::from_file(file)
                .with_context(|| format!("reading graph from {}", file.display()))?;
            with_store(cli, |store| Ok(json!(store.import_graph(&context)?)))
        }
        Command::Schema => with_store(cli, |store| {
            Ok(CommandDispatcher::new(store).execute(Action::GetSchema.as_str(), Value::Null)?)
        }),
        Command::Hash { file } => {
            let bytes = read_file(file)?;
            Ok(json!({ "content_hash": SourceRef::compute_hash(&bytes) }))
        }
        Command::Verify { file, hash } => {
            let bytes = read_file(file)?;
            let source = SourceRef::new("cli", "file", file.display().to_string())
                .with_content_hash(hash.clone());
            Ok(json!({ "verified": source.verify(&bytes) }))
        }
        Command::Actions => {
            let names: Vec<&str> = Action::ALL.iter().map(Action::as_str).collect();
            Ok(json!({ "actions": names }))
        }
    }
}

/// Open the configured store, run `f`, and always release the store.
fn with_store<T>(cli: &Cli, f: impl FnOnce(&GraphStore) -> anyhow::Result<T>) -> anyhow::Result<T> {
    let store = open_store(cli)?;
    let result = f(&store);
    settle(result, store.cleanup())
}

/// Combine an operation's result with the store's close result.
///
/// The operation's own error wins; a close failure after it is only logged.
fn settle<T>(result: anyhow::Result<T>, closed: Result<(), StoreError>) -> anyhow::Result<T> {
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e).context("closing graph store"),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            tracing::warn!(error = %close_err, "Failed to close graph store after an error");
            Err(e)
        }
    }
}

fn export(store: &GraphStore, out: Option<&Path>) -> anyhow::Result<Value> {
    let context = store.export_graph()?;
    let path = match out {
        Some(path) => {
            context.to_file(path)?;
            path.to_path_buf()
        }
        None => context.to_temp_file()?,
    };
    tracing::info!(path = %path.display(), nodes = context.nodes.len(), "Graph exported");
    Ok(json!({
        "path": path.display().to_string(),
        "nodes": context.nodes.len(),
        "edges": context.edges.len(),
    }))
}

fn open_store(cli: &Cli) -> anyhow::Result<GraphStore> {
    let mut config = StoreConfig::load(&cli.config)
        .with_context(|| format!("loading store config from {}", cli.config))?;
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    Ok(GraphStore::initialize(&config)?)
}

/// Empty input means "no arguments".
fn parse_args(raw: &str) -> anyhow::Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(raw).context("arguments are not valid JSON")
}

fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}
