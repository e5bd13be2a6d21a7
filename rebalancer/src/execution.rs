//! Execution orchestrator: load → pipeline → plan → confirm → write.
//!
//! This is the main workflow that ties together all components.

use std::path::{Path, PathBuf};

use log::info;
use shadowfolio::pipeline::{self, PipelineResult};
use shadowfolio::{HoldingRow, MetadataRow, Portfolio, Rebalance, StageError};

use crate::audit::{self, AuditLog};
use crate::config::{Config, Method};
use crate::error::{Error, Result};
use crate::orders::{self, OrderLine, PlanSummary};
use crate::tables;

/// Dollar amounts for one plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Amounts {
    /// New money used to set dollar targets
    pub contribution: f64,
    /// Money spread over positions below target (defaults to `contribution`)
    pub positive: Option<f64>,
    /// Money to raise from positions above target, as a non-negative amount
    pub negative: f64,
}

impl Amounts {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("contribution", self.contribution),
            ("positive", self.positive_amount()),
            ("negative", self.negative),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Argument(format!(
                    "{name} must be a finite amount >= 0, got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn positive_amount(&self) -> f64 {
        self.positive.unwrap_or(self.contribution)
    }
}

/// Options for a `plan` run.
pub struct PlanOptions {
    pub reference: PathBuf,
    pub holdings: PathBuf,
    pub method: Method,
    pub amounts: Amounts,
    pub dry_run: bool,
    pub force: bool,
    pub output: Option<PathBuf>,
}

/// How a `plan` run ended when nothing went wrong.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Written { path: PathBuf, orders: usize },
    DryRun { orders: usize },
    NothingToDo,
    Declined,
}

/// Run the pipeline variant selected by `method`.
pub fn run_pipeline(
    method: Method,
    metadata: &[MetadataRow],
    holdings: &[HoldingRow],
    amounts: &Amounts,
    settings: &Rebalance,
) -> PipelineResult {
    match method {
        Method::GroupWeighted => pipeline::run_group_weighted(
            metadata,
            holdings,
            amounts.contribution,
            amounts.positive_amount(),
            -amounts.negative,
            settings,
        ),
        Method::Direct => pipeline::run_direct(
            metadata,
            holdings,
            amounts.positive_amount(),
            amounts.negative,
            settings,
        ),
    }
}

/// Suggest a fix for a pipeline failure the amounts alone can cause.
///
/// The direct variant's budgets are strict, so an empty decrease set (no
/// holdings above target) only succeeds with a `--negative` amount above 0.
pub fn failure_hint(err: &StageError) -> Option<&'static str> {
    match &err.source {
        shadowfolio::Error::InfeasibleAllocation {
            group: "decrease",
            size: 0,
            ..
        } => Some(
            "no position sits above its target, so nothing can be sold; \
             pass --negative with an amount above 0",
        ),
        shadowfolio::Error::InfeasibleAllocation {
            group: "decrease", ..
        } => Some(
            "the positions above target cannot raise --negative without \
             selling more shares than are held; lower --negative",
        ),
        shadowfolio::Error::InfeasibleAllocation {
            group: "increase", ..
        } => Some("pass --positive or --contribution with an amount above 0"),
        shadowfolio::Error::InfeasibleAllocation { .. } => {
            Some("no whole-share rounding fits the amounts; adjust --positive or --negative")
        }
        _ => None,
    }
}

/// Build the plan: load tables, run the pipeline, derive order lines.
///
/// Every step is recorded in `audit`. A failed pipeline never yields orders,
/// and neither does a plan that sells more shares than a position holds.
pub fn compute_plan(
    config: &Config,
    opts: &PlanOptions,
    audit: &mut AuditLog,
) -> Result<(Portfolio, Vec<OrderLine>)> {
    opts.amounts.validate()?;

    let metadata = tables::read_reference(&opts.reference)?;
    let holdings = tables::read_holdings(&opts.holdings, &metadata)?;

    let settings = config.rebalance();
    let portfolio = match run_pipeline(opts.method, &metadata, &holdings, &opts.amounts, &settings)
    {
        Ok(portfolio) => portfolio,
        Err(e) => {
            audit::log_run_failed(audit, &e)?;
            return Err(e.into());
        }
    };
    audit::log_weighted(audit, &portfolio)?;

    if let Err(e) = orders::enforce_held_shares(&portfolio) {
        audit.log("plan_rejected", serde_json::json!({"error": e.to_string()}))?;
        return Err(e);
    }

    let lines = orders::build_orders(&portfolio);
    let summary = orders::summarize(&lines);
    audit::log_plan(audit, &lines, &summary)?;
    info!("plan computed: {summary}");

    Ok((portfolio, lines))
}

/// Execute a full `plan` run.
pub fn run(config: &Config, opts: &PlanOptions) -> Result<Outcome> {
    let mut audit = AuditLog::open(&config.audit_path())?;
    audit::log_run_started(
        &mut audit,
        &opts.reference.display().to_string(),
        &opts.holdings.display().to_string(),
        &opts.method.to_string(),
    )?;

    let (portfolio, lines) = compute_plan(config, opts, &mut audit)?;

    display_weights(&portfolio);
    if lines.is_empty() {
        println!("\nNo orders needed: portfolio already sits on whole-share targets.");
        audit.log_simple("no_orders_needed")?;
        return Ok(Outcome::NothingToDo);
    }

    let summary = orders::summarize(&lines);
    display_plan(&lines, &summary);
    orders::enforce_max_orders_per_run(lines.len(), config.execution.max_orders_per_run)?;

    if opts.dry_run {
        println!("\n[DRY RUN] No order file written.");
        return Ok(Outcome::DryRun {
            orders: lines.len(),
        });
    }

    if !opts.force {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Write order file?")
            .default(false)
            .interact()
            .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))?;

        if !confirmed {
            println!("Aborted.");
            audit.log("user_confirmed", serde_json::json!({"approved": false}))?;
            return Ok(Outcome::Declined);
        }

        audit.log("user_confirmed", serde_json::json!({"approved": true}))?;
    }

    let path = opts
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.execution.orders_file));
    orders::write_orders(&path, &lines)?;
    audit::log_orders_written(&mut audit, &path, lines.len())?;
    println!(
        "\n{} orders written to {}. Audit logged to {}",
        lines.len(),
        path.display(),
        config.audit_path().display()
    );

    Ok(Outcome::Written {
        path,
        orders: lines.len(),
    })
}

/// Show tiers and target percentages without allocating.
pub fn show_weights(config: &Config, reference: &Path, holdings: &Path) -> Result<()> {
    let metadata = tables::read_reference(reference)?;
    let holdings = tables::read_holdings(holdings, &metadata)?;
    let portfolio = pipeline::run_weighting(&metadata, &holdings, &config.rebalance())?;
    display_weights(&portfolio);
    Ok(())
}

// === Display ===

fn display_weights(portfolio: &Portfolio) {
    println!("TARGET WEIGHTS (${:.2} held):", portfolio.held_total());
    println!(
        "  {:8} {:>4} {:>8} {:>8} {:>8}  Notes",
        "Ticker", "Tier", "PE", "Held", "Target"
    );
    for p in portfolio {
        let tier = p.tier.map(|t| t.to_string()).unwrap_or_default();
        let pe = if p.pe_ratio.is_finite() {
            format!("{:.1}", p.pe_ratio)
        } else {
            "nmf".to_string()
        };
        let notes: Vec<String> = p.flags.iter().map(|f| f.to_string()).collect();
        println!(
            "  {:8} {:>4} {:>8} {:>7.1}% {:>7.1}%  {}",
            p.ticker,
            tier,
            pe,
            p.held_percentage * 100.0,
            p.target_percentage.unwrap_or(0.0) * 100.0,
            notes.join("; "),
        );
    }
}

fn display_plan(lines: &[OrderLine], summary: &PlanSummary) {
    println!("\nREBALANCE ORDERS:");
    println!(
        "  {:>3}  {:6} {:8} {:>8} {:>10} {:>12}",
        "#", "Action", "Ticker", "Shares", "Price", "Notional"
    );

    for (i, order) in lines.iter().enumerate() {
        println!(
            "  {:>3}  {:6} {:8} {:>8} ${:>9.2} ${:>11.2}   ({})",
            i + 1,
            order.action.to_string(),
            order.ticker,
            order.shares,
            order.price,
            order.notional,
            order.description,
        );
    }

    println!("\n{summary}");
}
