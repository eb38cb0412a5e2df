//! druid-panel CLI
//!
//! Command-line interface for panel queries:
//! - Run a panel file against the engine
//! - Print the payloads a panel would send
//! - Inspect the granularity chosen for a range
//! - Generate a default config file

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use druid_panel::config::Config;
use druid_panel::engine::HttpEngine;
use druid_panel::model::{Series, TimeBound};
use druid_panel::panel::{plan_panel, PanelQueryRunner, PanelRequest};
use druid_panel::query::{compute_granularity, Granularity, VariableMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "druid-panel")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build and run dashboard panel queries against a Druid broker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations, then environment)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a panel request file and print the resulting series
    Run {
        /// Path to a panel request JSON file
        panel: PathBuf,
    },

    /// Print the engine payloads for a panel request without running them
    Plan {
        /// Path to a panel request JSON file
        panel: PathBuf,
    },

    /// Show the bucket size chosen for a range
    Granularity {
        /// Range start: "now-6h", ISO 8601, or epoch milliseconds
        #[arg(long)]
        from: String,
        /// Range end (default: now)
        #[arg(long, default_value = "now")]
        to: String,
        /// Maximum number of points
        #[arg(long, default_value = "1000")]
        max_points: u32,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "druid_panel=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run { panel } => {
            let config = load_config(cli.config.as_deref())?;
            let request = read_panel(&panel)?;
            let engine = Arc::new(HttpEngine::new(&config.engine)?);
            let runner = PanelQueryRunner::new(engine);

            let series = runner.run(&request).await?;

            match cli.format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&series)?),
                _ => print_series_table(&series),
            }
        }

        Commands::Plan { panel } => {
            let request = read_panel(&panel)?;
            let templates = VariableMap::from(request.variables.clone());
            let plan = plan_panel(&request, Utc::now(), &templates)?;

            println!("Interval: {}", plan.range.interval());
            for (index, query) in plan.queries.iter().enumerate() {
                println!();
                println!(
                    "Target {} ({}), metrics: {}",
                    index,
                    query.payload.query_type(),
                    query.metric_names.join(", ")
                );
                println!("{}", serde_json::to_string_pretty(&query.payload)?);
            }
        }

        Commands::Granularity {
            from,
            to,
            max_points,
        } => {
            let now = Utc::now();
            let from = parse_bound(&from).resolve(now)?;
            let to = parse_bound(&to).resolve(now)?;
            if from >= to {
                anyhow::bail!("--from must be before --to");
            }

            let granularity = compute_granularity(from, to, max_points);
            let span_ms = (to - from).num_milliseconds();

            match cli.format.as_str() {
                "json" => println!(
                    "{}",
                    serde_json::json!({
                        "granularity": granularity,
                        "buckets": granularity.buckets_for(span_ms),
                        "max_points": max_points,
                    })
                ),
                _ => {
                    println!("Granularity: {}", granularity);
                    println!(
                        "Buckets:     {} (max {})",
                        granularity.buckets_for(span_ms),
                        max_points
                    );
                    println!();
                    println!("{:<16} {:>10}", "CANDIDATE", "BUCKETS");
                    for candidate in Granularity::ALL {
                        let marker = if candidate == granularity { " <" } else { "" };
                        println!(
                            "{:<16} {:>10}{}",
                            candidate.as_str(),
                            candidate.buckets_for(span_ms),
                            marker
                        );
                    }
                }
            }
        }

        Commands::Config { output } => {
            let config = druid_panel::config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Ok(Config::load_with_env(path)?),
        None => Ok(Config::load_default()),
    }
}

fn read_panel(path: &Path) -> anyhow::Result<PanelRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read panel file {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid panel request in {:?}", path))
}

fn parse_bound(s: &str) -> TimeBound {
    match s.parse::<i64>() {
        Ok(ms) => TimeBound::Millis(ms),
        Err(_) => TimeBound::Expr(s.to_string()),
    }
}

fn print_series_table(series: &[Series]) {
    if series.is_empty() {
        println!("No series returned");
        return;
    }

    println!("{:<40} {:>8} {:>14} {:>14}", "SERIES", "POINTS", "FIRST", "LAST");
    for s in series {
        let first = s.points.first().and_then(|p| p.value());
        let last = s.points.last().and_then(|p| p.value());
        println!(
            "{:<40} {:>8} {:>14} {:>14}",
            s.name,
            s.len(),
            format_value(first),
            format_value(last)
        );
    }
}

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}
