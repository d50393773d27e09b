//! Jarvis CLI - autonomous evolution engine.

use anyhow::Result;
use clap::{Parser, Subcommand};
use jarvis_core::{EngineStatus, EvolutionCycle, Trigger};
use jarvis_server::{init_logging, inspect_engine, open_engine, AppConfig, Server};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "jarvis")]
#[command(about = "Autonomous evolution engine", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "JARVIS_CONFIG")]
    config: Option<String>,

    /// Directory holding the evolution history
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server and the evolution scheduler
    Serve {
        /// Listen address
        #[arg(short, long)]
        listen: Option<SocketAddr>,
    },
    /// Run one evolution cycle now
    Trigger,
    /// Show engine status
    Status,
    /// Show evolution history, newest first
    History {
        /// Number of cycles to show
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Only cycles touching this module
        #[arg(long)]
        module: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = dir;
    }

    init_logging(&config.logging)?;

    match cli.command {
        Commands::Serve { listen } => {
            if let Some(addr) = listen {
                config.server.listen_addr = addr;
            }
            println!(
                "J.A.R.V.I.S evolution engine v{}\n  Listening: {}\n  History: {}",
                env!("CARGO_PKG_VERSION"),
                config.server.listen_addr,
                config.storage.data_dir.display(),
            );
            Server::new(config).await?.run().await?;
        }
        Commands::Trigger => {
            let engine = open_engine(&config).await?;
            let report = engine.run_cycle(Trigger::Manual).await?;
            print_cycle(&report.cycle);
            println!("  Log size: {}", report.evolution_log_size);
            println!("  Learning patterns: {}", report.learning_patterns);
            info!("Completed evolution cycle {}", report.cycle.cycle_id);
        }
        Commands::Status => {
            let engine = inspect_engine(&config).await?;
            print_status(&engine.status());
        }
        Commands::History { limit, module } => {
            let engine = inspect_engine(&config).await?;
            let cycles = match module.as_deref() {
                Some(module) => engine.history_for_module(module, limit).await?,
                None => engine.history(limit).await?,
            };

            println!("Evolution history ({})", cycles.len());
            for cycle in &cycles {
                let improvement = cycle
                    .primary_improvement()
                    .map(|i| format!("{} {} on {}", i.priority, i.kind, i.target_module))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "  {} | {} | {} | {}/{} | {}",
                    cycle.cycle_id,
                    cycle.completed_at.format("%Y-%m-%d %H:%M:%S"),
                    if cycle.success() { "OK" } else { "FAILED" },
                    cycle.applied_count(),
                    cycle.candidates_identified.len(),
                    improvement,
                );
            }
        }
    }

    Ok(())
}

fn print_cycle(cycle: &EvolutionCycle) {
    println!("Evolution cycle: {}", cycle.cycle_id);
    println!("  Success: {}", cycle.success());
    if let Some(error) = &cycle.error {
        println!("  Error: {}", error.message);
    }
    println!("  Identified: {}", cycle.candidates_identified.len());
    for applied in &cycle.candidates_applied {
        let outcome = cycle.outcomes.get(&applied.id);
        let result = match outcome {
            Some(o) if o.success => "applied".to_string(),
            Some(o) => format!("failed: {}", o.error.as_deref().unwrap_or("unknown")),
            None => "pending".to_string(),
        };
        println!(
            "  - [{}] {} on {}: {} ({})",
            applied.priority, applied.kind, applied.target_module, applied.description, result
        );
    }
    for deferred in cycle.deferred() {
        println!("  ~ [{}] {} (deferred)", deferred.priority, deferred.description);
    }
}

fn print_status(status: &EngineStatus) {
    println!("Jarvis Evolution Status");
    println!("  Evolutions: {}", status.total_evolutions);
    println!("  Learning patterns: {}", status.learning_patterns);
    println!("  Performance score: {:.2}", status.performance_score);
    println!(
        "  Applications: {}/{} succeeded",
        status.applications_succeeded, status.applications_attempted
    );
    match status.last_evolution {
        Some(at) => println!("  Last evolution: {}", at.format("%Y-%m-%d %H:%M:%S")),
        None => println!("  Last evolution: never"),
    }
    if !status.improvement_suggestions.is_empty() {
        println!("  Suggestions:");
        for suggestion in &status.improvement_suggestions {
            println!("    - {}", suggestion);
        }
    }
}
