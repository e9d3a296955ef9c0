use anyhow::{Context, Result};
use bianzheng::KnowledgeBase;
use bianzheng_core::{
    init_tracing, load_records, FsSource, LoadReport, PatternCatalog, Settings, SyndromePattern,
};
use bianzheng_graph::GraphBuilder;
use bianzheng_match::{MatchResult, Selection};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde_json::{json, Value};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bianzheng")]
#[command(about = "Bianzheng - syndrome pattern matching and evolution graph tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (json, pretty)
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Configuration directory (defaults to ./config, then the current directory)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Environment name selecting `{env}.toml`
    #[arg(long, global = true)]
    env: Option<String>,

    /// Override `data.root`
    #[arg(long, global = true)]
    data_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the pattern catalog for broken references, cycles and duplicate compositions
    Validate,

    /// Derive the evolution graph from the patterns' evolution links and write it
    BuildGraph {
        /// Output path (defaults to `data.root` joined with `data.evolution_graph`)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Match a syndrome-element selection against the catalog
    Match {
        /// Location element ids, comma-separated, in selection order
        #[arg(short, long, value_delimiter = ',')]
        location: Vec<String>,

        /// Nature element ids, comma-separated, in selection order
        #[arg(short, long, value_delimiter = ',')]
        nature: Vec<String>,
    },

    /// Counts of loaded records and graph statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = cli.config_dir.clone().unwrap_or_else(Settings::default_config_dir);
    let env_name = cli.env.clone().unwrap_or_else(|| Settings::default().env);
    let mut settings = Settings::load_from_sources(&config_dir, &env_name)
        .context("Failed to load configuration")?;
    if let Some(root) = &cli.data_root {
        settings.data.root = root.clone();
    }
    init_tracing(&settings.logging)?;

    match execute_command(&cli, &settings).await {
        Ok(Outcome { output, failure }) => {
            print_output(&cli.output, &output)?;
            if let Some(reason) = failure {
                eprintln!("{} {}", "Error:".red().bold(), reason);
                std::process::exit(1);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// Command output, printed in full even when the command reports a failure.
struct Outcome {
    output: Value,
    failure: Option<String>,
}

impl From<Value> for Outcome {
    fn from(output: Value) -> Self {
        Self { output, failure: None }
    }
}

async fn execute_command(cli: &Cli, settings: &Settings) -> Result<Outcome> {
    let source = FsSource::new(&settings.data.root);
    match &cli.command {
        Commands::Validate => execute_validate(&source, settings).await,
        Commands::BuildGraph { out } => execute_build_graph(&source, settings, out.clone())
            .await
            .map(Outcome::from),
        Commands::Match { location, nature } => execute_match(&source, settings, location, nature)
            .await
            .map(Outcome::from),
        Commands::Stats => execute_stats(&source, settings).await.map(Outcome::from),
    }
}

async fn execute_validate(source: &FsSource, settings: &Settings) -> Result<Outcome> {
    let kb = KnowledgeBase::load(source, settings).await;
    let summary = kb.validation_summary();

    let failure = (!summary.passed())
        .then(|| format!("validation failed with {} error(s)", summary.errors.len()));
    let mut output = serde_json::to_value(&summary)?;
    if let Value::Object(map) = &mut output {
        map.insert(
            "status".to_string(),
            json!(if summary.passed() { "ok" } else { "failed" }),
        );
    }

    Ok(Outcome { output, failure })
}

async fn execute_build_graph(
    source: &FsSource,
    settings: &Settings,
    out: Option<PathBuf>,
) -> Result<Value> {
    let data = &settings.data;
    let patterns: LoadReport<SyndromePattern> =
        load_records(source, &data.zhengxing_dir, &data.zhengxing_files).await;
    let catalog = PatternCatalog::with_policy(patterns.records, settings.matching.duplicate_compositions);

    let document = GraphBuilder::new(&catalog).build();
    let path = out.unwrap_or_else(|| data.root.join(&data.evolution_graph));
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(&path, document.to_json_pretty()?)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(json!({
        "output": path.display().to_string(),
        "total_nodes": document.statistics.total_nodes,
        "total_edges": document.statistics.total_edges,
        "critical_nodes": document.statistics.critical_nodes,
        "evolution_chains": document.statistics.evolution_chains,
    }))
}

async fn execute_match(
    source: &FsSource,
    settings: &Settings,
    location: &[String],
    nature: &[String],
) -> Result<Value> {
    let kb = KnowledgeBase::load(source, settings).await;
    let selection = Selection::new(location.iter().cloned(), nature.iter().cloned());
    let outcome = kb.match_selection(&selection);

    let (status, id, name) = match &outcome.result {
        MatchResult::NoSelection => ("no_selection", None, None),
        MatchResult::Matched(p) => ("matched", Some(p.id.clone()), Some(p.name.clone())),
        MatchResult::Inferred(name) => ("inferred", None, Some(name.clone())),
    };

    Ok(json!({
        "status": status,
        "id": id,
        "name": name,
        "selection": selection.summary(kb.registry()),
        "unresolved": outcome.unresolved,
    }))
}

async fn execute_stats(source: &FsSource, settings: &Settings) -> Result<Value> {
    let kb = KnowledgeBase::load(source, settings).await;
    let graph = match kb.graph().as_loaded() {
        Some(graph) => serde_json::to_value(graph.computed_statistics())?,
        None => json!({ "unavailable": kb.graph().unavailable_reason() }),
    };

    Ok(json!({
        "elements": kb.registry().len(),
        "patterns": kb.catalog().len(),
        "comparison_pairs": kb.pairs().len(),
        "skipped": kb.skipped().len(),
        "graph": graph,
    }))
}

fn print_output(format: &OutputFormat, value: &Value) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Pretty => print_pretty(value, 0),
    }
    Ok(())
}

fn print_pretty(value: &Value, indent: usize) {
    let pad = "  ".repeat(indent);
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                let key_colored = key.cyan().bold();
                match val {
                    Value::String(s) => println!("{}{}: {}", pad, key_colored, s.green()),
                    Value::Number(n) => println!("{}{}: {}", pad, key_colored, n.to_string().yellow()),
                    Value::Null => println!("{}{}: {}", pad, key_colored, "-".dimmed()),
                    Value::Array(items) if items.is_empty() => {
                        println!("{}{}: {}", pad, key_colored, "[]".dimmed())
                    }
                    Value::Object(_) | Value::Array(_) => {
                        println!("{}{}:", pad, key_colored);
                        print_pretty(val, indent + 1);
                    }
                    _ => println!("{}{}: {}", pad, key_colored, val),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(s) => println!("{}- {}", pad, s),
                    _ => print_pretty(item, indent),
                }
            }
        }
        _ => println!("{}{}", pad, value),
    }
}
