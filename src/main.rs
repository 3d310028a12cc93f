//! Quantum swarm portfolio optimizer CLI

use clap::{Parser, Subcommand};
use quantum_swarm::{config::Config, runner, QuantumSwarmOptimizer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "qswarm")]
#[command(about = "Quantum-perturbed particle swarm portfolio optimizer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "optimizer.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize one context file
    Optimize {
        /// Context JSON file
        context: PathBuf,
        /// Seed for a reproducible run (overrides config)
        #[arg(long)]
        seed: Option<u64>,
        /// Write the result JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check a context file without optimizing
    Validate {
        /// Context JSON file
        context: PathBuf,
    },
    /// Optimize several context files concurrently
    Batch {
        /// Context JSON files
        #[arg(required = true)]
        contexts: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging; logs go to stderr so results can be piped
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Optimize {
            context,
            seed,
            output,
        } => optimize(config, context, seed, output).await,
        Commands::Validate { context } => validate(context),
        Commands::Batch { contexts } => batch(config, contexts).await,
    }
}

async fn optimize(
    mut config: Config,
    path: PathBuf,
    seed: Option<u64>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    if seed.is_some() {
        config.optimizer.seed = seed;
    }

    let context = runner::load_context(&path)?;
    let optimizer = QuantumSwarmOptimizer::new(config.optimizer)?;

    tracing::info!("Optimizing {} assets from {}", context.dimensions(), path.display());
    let result = tokio::task::spawn_blocking(move || optimizer.optimize(&context)).await??;

    let json = serde_json::to_string_pretty(&result)?;
    match output {
        Some(out) => {
            std::fs::write(&out, json)?;
            println!("✅ Result written to {}", out.display());
        }
        None => println!("{}", json),
    }

    if !result.constraints.is_satisfied() {
        tracing::warn!(
            "Allocation breaches {} declared constraint(s)",
            result.constraints.violations.len()
        );
    }

    Ok(())
}

fn validate(path: PathBuf) -> anyhow::Result<()> {
    let context = runner::load_context(&path)?;
    context.validate()?;

    println!(
        "✅ {} is valid: {} assets, {} periods, regime {:?}",
        path.display(),
        context.dimensions(),
        context.historical_data.periods(),
        context.market_regime
    );
    Ok(())
}

async fn batch(config: Config, paths: Vec<PathBuf>) -> anyhow::Result<()> {
    let optimizer = Arc::new(QuantumSwarmOptimizer::new(config.optimizer)?);

    let mut contexts = Vec::with_capacity(paths.len());
    for path in &paths {
        contexts.push((path.display().to_string(), runner::load_context(path)?));
    }

    tracing::info!("Running batch of {} contexts", contexts.len());
    let outcomes = runner::run_batch(optimizer, contexts).await;

    let mut failures = 0;
    for outcome in outcomes {
        let line = match &outcome.result {
            Ok(result) => serde_json::json!({
                "context": outcome.label,
                "run_id": result.run_id,
                "allocation": result.weights_by_symbol(),
                "expected_return": result.expected_return,
                "sharpe_ratio": result.metrics.sharpe_ratio,
                "volatility": result.metrics.volatility,
                "max_drawdown": result.metrics.max_drawdown,
                "confidence": result.confidence,
                "iterations": result.iterations,
            }),
            Err(e) => {
                failures += 1;
                serde_json::json!({ "context": outcome.label, "error": e.to_string() })
            }
        };
        println!("{}", line);
    }

    if failures > 0 {
        anyhow::bail!("{} of {} contexts failed", failures, paths.len());
    }
    Ok(())
}
