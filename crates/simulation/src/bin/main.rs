//! Shield Simulator CLI
//!
//! Runs seeded workloads against the shield keeper and checks that replicas
//! agree on the final state.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use shield_simulation::{run_replicas, SimulatorConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shield-sim")]
#[command(about = "Deterministic workload simulator for the shield keeper")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the default configuration as TOML
    Config,

    /// Run a seeded simulation
    Run {
        /// TOML configuration file; defaults apply to missing keys
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the configured seed
        #[arg(long)]
        seed: Option<u64>,

        /// Override the configured number of steps
        #[arg(long)]
        steps: Option<u64>,

        /// Independent replicas that must reach the same digest
        #[arg(long, default_value = "2")]
        replicas: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config => {
            // No tracing here, output goes to stdout
            let toml = toml::to_string_pretty(&SimulatorConfig::default())
                .context("serializing default configuration")?;
            print!("{}", toml);
        }

        Commands::Run {
            config,
            seed,
            steps,
            replicas,
        } => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                )
                .init();

            let mut config = match config {
                Some(path) => SimulatorConfig::load(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => SimulatorConfig::default(),
            };
            if let Some(seed) = seed {
                config = config.with_seed(seed);
            }
            if let Some(steps) = steps {
                config = config.with_steps(steps);
            }

            let reports = run_replicas(&config, replicas.max(1))?;
            let first = &reports[0];
            if let Some(diverged) = reports.iter().position(|r| r.digest != first.digest) {
                bail!(
                    "replica {} diverged: {} != {}",
                    diverged,
                    reports[diverged].digest_hex(),
                    first.digest_hex()
                );
            }

            println!("seed:          {}", first.seed);
            println!("steps:         {}", first.steps);
            println!("accepted:      {}", first.stats.accepted);
            for (kind, count) in &first.stats.rejected {
                println!("rejected:      {} {}", count, kind);
            }
            println!("pools created: {}", first.stats.pools_created);
            println!("pools closed:  {}", first.stats.pools_closed);
            println!("open pools:    {}", first.open_pools);
            println!(
                "withdrawals:   {} queued, {} completed",
                first.stats.withdrawals_queued, first.stats.withdrawals_completed
            );
            println!("premium:       {}", first.premium_collected);
            println!("replicas:      {}", reports.len());
            println!("digest:        {}", first.digest_hex());
        }
    }

    Ok(())
}
