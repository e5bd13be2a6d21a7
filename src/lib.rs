//! # shadowfolio
//!
//! Rebalance a shadow portfolio toward tiered target weights and round the
//! result to whole shares.
//!
//! ## Pipeline
//!
//! | Stage | Module | Adds |
//! |-------|--------|------|
//! | Merger | [`merge`] | positions with held amounts and percentages |
//! | TierWeighter | [`weighting`] | tier, target percentage, tier/PE order |
//! | Distributor | [`distribute`] | target and difference amounts |
//! | PolarSplitter | [`polarize`] | positive/negative groups and weights |
//! | CombinatorialAllocator | [`allocate`] | optimized quantities and amounts |
//!
//! Each stage takes the [`Portfolio`] by value and returns it; the first
//! failing stage halts the run.
//!
//! ## Quick Start
//!
//! ```
//! use shadowfolio::merge::{HoldingRow, MetadataRow};
//! use shadowfolio::pipeline::{run_direct, Rebalance};
//!
//! let metadata = vec![
//!     MetadataRow { ticker: "AAA*".into(), price: 10.0, pe: "5".into(), notes: None },
//!     MetadataRow { ticker: "BBB".into(), price: 20.0, pe: "nmf".into(), notes: None },
//! ];
//! let holdings = vec![
//!     HoldingRow { symbol: "AAA".into(), value: 100.0, quantity: 10 },
//!     HoldingRow { symbol: "BBB".into(), value: 100.0, quantity: 5 },
//! ];
//!
//! let portfolio = run_direct(&metadata, &holdings, 105.0, 15.0, &Rebalance::default()).unwrap();
//! for delta in portfolio.order_deltas() {
//!     println!("{} {:+}", delta.ticker, delta.delta_quantity);
//! }
//! ```
//!
//! ## Tiers
//!
//! | Tier | Rule | Weight |
//! |------|------|--------|
//! | 1 | unflagged, finite PE | linear from `max_tier1_ratio` toward 1 by PE |
//! | 2 | unflagged, PE not meaningful | `1 / tier1_to_tier2_ratio` |
//! | 3 | "Earnings probation" or "Exceeds size limit" | tier 2 weight `/ tier2_to_tier3_ratio` |
//!
//! ## Rounding
//!
//! Each group is rounded by scoring all `2^n` ways of moving every position
//! one share off its base count, so it is exponential in group size. Groups
//! wider than [`AllocatorSettings::max_group_size`] fail with
//! [`Error::GroupTooLarge`]. The `parallel` feature spreads the scan across
//! the rayon pool without changing which candidate wins.

pub mod allocate;
pub mod distribute;
mod error;
pub mod merge;
pub mod pipeline;
pub mod polarize;
pub mod portfolio;
pub mod weighting;

// Re-export public API
pub use allocate::{AllocatorSettings, SelectionRule};
pub use error::{Error, Result, Stage, StageError};
pub use merge::{HoldingRow, MetadataRow};
pub use pipeline::Rebalance;
pub use portfolio::{
    Flag, Group, GroupKind, OrderDelta, Polarity, Portfolio, Position, QuantityBasis, Tier,
};
pub use weighting::TierRatios;
