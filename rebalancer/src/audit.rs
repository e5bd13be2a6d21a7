//! JSONL audit trail logging.
//!
//! Each rebalancer run appends events to an audit.jsonl file,
//! one JSON object per line.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shadowfolio::{Portfolio, StageError};

use crate::error::Result;
use crate::orders::{OrderLine, PlanSummary};

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }
}

/// Convenience: log a run start event.
pub fn log_run_started(
    audit: &mut AuditLog,
    reference_file: &str,
    holdings_file: &str,
    method: &str,
) -> Result<()> {
    audit.log(
        "run_started",
        serde_json::json!({
            "reference": reference_file,
            "holdings": holdings_file,
            "method": method,
        }),
    )
}

/// Convenience: log tiers and target percentages.
pub fn log_weighted(audit: &mut AuditLog, portfolio: &Portfolio) -> Result<()> {
    let rows: Vec<_> = portfolio
        .positions()
        .iter()
        .map(|p| {
            serde_json::json!({
                "ticker": p.ticker,
                "tier": p.tier.map(|t| t.to_string()),
                "held_pct": p.held_percentage,
                "target_pct": p.target_percentage,
            })
        })
        .collect();

    audit.log(
        "portfolio_weighted",
        serde_json::json!({
            "held_total": portfolio.held_total(),
            "positions": rows,
        }),
    )
}

/// Convenience: log the computed plan.
pub fn log_plan(audit: &mut AuditLog, orders: &[OrderLine], summary: &PlanSummary) -> Result<()> {
    let order_data: Vec<_> = orders
        .iter()
        .map(|o| {
            serde_json::json!({
                "ticker": o.ticker,
                "action": o.action.to_string(),
                "shares": o.shares,
                "price": o.price,
                "description": o.description,
            })
        })
        .collect();

    audit.log(
        "plan_computed",
        serde_json::json!({
            "orders": order_data,
            "buy_notional": summary.buy_notional,
            "sell_proceeds": summary.sell_proceeds,
            "net_cash": summary.net_cash(),
        }),
    )
}

/// Convenience: log the order file written.
pub fn log_orders_written(audit: &mut AuditLog, path: &Path, count: usize) -> Result<()> {
    audit.log(
        "orders_written",
        serde_json::json!({
            "path": path.display().to_string(),
            "orders": count,
        }),
    )
}

/// Convenience: log a pipeline failure with the stage that raised it.
pub fn log_run_failed(audit: &mut AuditLog, err: &StageError) -> Result<()> {
    audit.log(
        "run_failed",
        serde_json::json!({
            "stage": err.stage.to_string(),
            "error": err.source.to_string(),
        }),
    )
}
