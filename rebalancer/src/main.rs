//! CLI entry point for the shadowfolio rebalancer.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use shadowfolio_rebalancer::config::{Config, Method};
use shadowfolio_rebalancer::error::Error;
use shadowfolio_rebalancer::execution::{self, Amounts, PlanOptions};

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Shadow portfolio rebalancer: reference + holdings CSV -> order sheet")]
#[command(version)]
struct Cli {
    /// Path to config.toml (defaults apply when the file is absent)
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute the rebalance plan, confirm, and write the order file
    Plan {
        /// Reference table CSV (ticker, price, PE, notes)
        reference: PathBuf,

        /// Holdings table CSV (symbol, value, quantity)
        holdings: PathBuf,

        /// New money added to the portfolio
        #[arg(long, default_value_t = 0.0)]
        contribution: f64,

        /// Money spread over positions below target (defaults to --contribution)
        #[arg(long)]
        positive: Option<f64>,

        /// Money to raise by selling positions above target
        #[arg(long, default_value_t = 0.0)]
        negative: f64,

        /// Allocator variant: group-weighted or direct (overrides config)
        #[arg(long)]
        method: Option<Method>,

        /// Show plan without writing orders
        #[arg(long)]
        dry_run: bool,

        /// Skip confirmation prompt (for automation/cron)
        #[arg(long)]
        force: bool,

        /// Order file to write (overrides config)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show tiers and target percentages
    Weights {
        /// Reference table CSV
        reference: PathBuf,

        /// Holdings table CSV
        holdings: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load_or_default(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Plan {
            reference,
            holdings,
            contribution,
            positive,
            negative,
            method,
            dry_run,
            force,
            output,
        } => {
            let opts = PlanOptions {
                reference,
                holdings,
                method: method.unwrap_or(config.allocation.method),
                amounts: Amounts {
                    contribution,
                    positive,
                    negative,
                },
                dry_run,
                force,
                output,
            };
            execution::run(&config, &opts).map(|_| ())
        }
        Command::Weights {
            reference,
            holdings,
        } => execution::show_weights(&config, &reference, &holdings),
    };

    if let Err(e) = result {
        match &e {
            Error::Pipeline(err) => {
                eprintln!("\nAborted: {err}");
                if let Some(hint) = execution::failure_hint(err) {
                    eprintln!("Hint: {hint}");
                }
                process::exit(2);
            }
            Error::Aborted(msg) => {
                eprintln!("{msg}");
                process::exit(0);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}
