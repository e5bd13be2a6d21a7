//! Order plan: turn an allocated portfolio into BUY/SELL lines.
//!
//! Share deltas come from [`Portfolio::order_deltas`], which already
//! accounts for whichever allocator ran. Lines are priced at the reference
//! price; the order submitter quotes the market itself.

use std::fs;
use std::path::Path;

use serde::Serialize;
use shadowfolio::{OrderDelta, Portfolio};

use crate::error::{Error, Result};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    Buy,
    Sell,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
        }
    }
}

/// A single order line in the plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLine {
    pub ticker: String,
    pub action: Action,
    /// Always positive; the direction is in `action`
    pub shares: i64,
    pub price: f64,
    pub notional: f64,
    pub description: &'static str,
}

/// Build order lines from the allocated portfolio, skipping zero deltas.
pub fn build_orders(portfolio: &Portfolio) -> Vec<OrderLine> {
    portfolio
        .order_deltas()
        .iter()
        .filter(|d| d.delta_quantity != 0)
        .map(to_line)
        .collect()
}

fn to_line(delta: &OrderDelta) -> OrderLine {
    let (action, description) = classify_trade(delta.held_quantity, delta.delta_quantity);
    let shares = delta.delta_quantity.abs();
    OrderLine {
        ticker: delta.ticker.clone(),
        action,
        shares,
        price: delta.price,
        notional: shares as f64 * delta.price,
        description,
    }
}

/// Classify a trade based on the current holding and desired change.
fn classify_trade(held_qty: i64, delta_qty: i64) -> (Action, &'static str) {
    match (held_qty, delta_qty) {
        (0, d) if d > 0 => (Action::Buy, "open"),
        (_, d) if d > 0 => (Action::Buy, "increase"),
        (h, d) if -d == h => (Action::Sell, "close"),
        _ => (Action::Sell, "decrease"),
    }
}

/// Refuse plans that sell more shares of a position than are held.
///
/// The group-weighted allocator spreads the negative amount by weight, so a
/// large enough amount can push a position's delta past its holding.
pub fn enforce_held_shares(portfolio: &Portfolio) -> Result<()> {
    for delta in portfolio.order_deltas() {
        if delta.delta_quantity < 0 && -delta.delta_quantity > delta.held_quantity {
            return Err(Error::Oversell {
                ticker: delta.ticker,
                shares: -delta.delta_quantity,
                held: delta.held_quantity,
            });
        }
    }
    Ok(())
}

/// Cash effect of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlanSummary {
    pub orders: usize,
    pub buy_notional: f64,
    pub sell_proceeds: f64,
}

impl PlanSummary {
    /// Cash required (positive) or released (negative) by the plan.
    pub fn net_cash(&self) -> f64 {
        self.buy_notional - self.sell_proceeds
    }
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} orders: ${:.2} buys - ${:.2} sells = ${:.2} net",
            self.orders,
            self.buy_notional,
            self.sell_proceeds,
            self.net_cash(),
        )
    }
}

pub fn summarize(orders: &[OrderLine]) -> PlanSummary {
    let mut summary = PlanSummary {
        orders: orders.len(),
        buy_notional: 0.0,
        sell_proceeds: 0.0,
    };
    for order in orders {
        match order.action {
            Action::Buy => summary.buy_notional += order.notional,
            Action::Sell => summary.sell_proceeds += order.notional,
        }
    }
    summary
}

/// Refuse plans with more orders than one run may submit.
pub fn enforce_max_orders_per_run(order_count: usize, max_orders_per_run: usize) -> Result<()> {
    if order_count > max_orders_per_run {
        return Err(Error::OrderLimit(format!(
            "{order_count} orders generated but max_orders_per_run is {max_orders_per_run}"
        )));
    }
    Ok(())
}

/// Row layout of the order-entry CSV.
#[derive(Serialize)]
struct OrderRecord<'a> {
    #[serde(rename = "Ticker")]
    ticker: &'a str,
    #[serde(rename = "Command")]
    command: String,
    #[serde(rename = "Shares")]
    shares: i64,
    #[serde(rename = "Price")]
    price: String,
}

/// Write the order-entry CSV (`Ticker,Command,Shares,Price`).
pub fn write_orders(path: &Path, orders: &[OrderLine]) -> Result<()> {
    let wrap = |source: csv::Error| Error::OrdersWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| wrap(e.into()))?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(wrap)?;
    for order in orders {
        writer
            .serialize(OrderRecord {
                ticker: &order.ticker,
                command: order.action.to_string(),
                shares: order.shares,
                price: format!("{:.2}", order.price),
            })
            .map_err(wrap)?;
    }
    writer.flush().map_err(|e| wrap(e.into()))?;
    log::info!("wrote {} orders to {}", orders.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(ticker: &str, action: Action, shares: i64, price: f64) -> OrderLine {
        OrderLine {
            ticker: ticker.into(),
            action,
            shares,
            price,
            notional: shares as f64 * price,
            description: "test",
        }
    }

    #[test]
    fn classify() {
        assert_eq!(classify_trade(0, 5), (Action::Buy, "open"));
        assert_eq!(classify_trade(10, 5), (Action::Buy, "increase"));
        assert_eq!(classify_trade(10, -4), (Action::Sell, "decrease"));
        assert_eq!(classify_trade(10, -10), (Action::Sell, "close"));
        assert_eq!(classify_trade(10, -12), (Action::Sell, "decrease"));
    }

    #[test]
    fn sell_beyond_holding_is_refused() {
        use shadowfolio::{HoldingRow, MetadataRow, Rebalance, pipeline};

        let metadata = vec![
            MetadataRow {
                ticker: "AAA".into(),
                price: 10.0,
                pe: "5".into(),
                notes: None,
            },
            MetadataRow {
                ticker: "BBB".into(),
                price: 10.0,
                pe: "nmf".into(),
                notes: None,
            },
        ];
        let holdings: Vec<HoldingRow> = ["AAA", "BBB"]
            .iter()
            .map(|s| HoldingRow {
                symbol: s.to_string(),
                value: 100.0,
                quantity: 10,
            })
            .collect();
        let settings = Rebalance::default();

        // raising $40 sells 4 of the 10 BBB shares
        let portfolio =
            pipeline::run_group_weighted(&metadata, &holdings, 0.0, 0.0, -40.0, &settings).unwrap();
        assert!(enforce_held_shares(&portfolio).is_ok());

        // raising $1000 would sell 100 of them
        let portfolio =
            pipeline::run_group_weighted(&metadata, &holdings, 0.0, 0.0, -1000.0, &settings)
                .unwrap();
        match enforce_held_shares(&portfolio) {
            Err(Error::Oversell {
                ticker,
                shares,
                held,
            }) => {
                assert_eq!(ticker, "BBB");
                assert_eq!((shares, held), (100, 10));
            }
            other => panic!("expected Oversell, got {other:?}"),
        }
    }

    #[test]
    fn summary_nets_cash() {
        let orders = vec![
            line("AAA", Action::Buy, 10, 10.0),
            line("BBB", Action::Sell, 2, 20.0),
        ];
        let summary = summarize(&orders);
        assert_eq!(summary.orders, 2);
        assert_eq!(summary.buy_notional, 100.0);
        assert_eq!(summary.sell_proceeds, 40.0);
        assert_eq!(summary.net_cash(), 60.0);
        assert_eq!(
            summary.to_string(),
            "2 orders: $100.00 buys - $40.00 sells = $60.00 net"
        );
    }

    #[test]
    fn max_orders() {
        assert!(enforce_max_orders_per_run(3, 5).is_ok());
        assert!(enforce_max_orders_per_run(5, 5).is_ok());
        match enforce_max_orders_per_run(10, 5) {
            Err(Error::OrderLimit(msg)) => {
                assert!(msg.contains("10 orders generated"));
                assert!(msg.contains("max_orders_per_run is 5"));
            }
            other => panic!("expected OrderLimit, got {other:?}"),
        }
    }

    #[test]
    fn writes_order_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("orders.csv");
        let orders = vec![
            line("AAA", Action::Buy, 10, 10.0),
            line("BBB", Action::Sell, 2, 20.5),
        ];

        write_orders(&path, &orders).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "Ticker,Command,Shares,Price");
        assert_eq!(lines[1], "AAA,BUY,10,10.00");
        assert_eq!(lines[2], "BBB,SELL,2,20.50");
    }
}
