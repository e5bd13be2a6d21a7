//! The Portfolio aggregate threaded through every pipeline stage.
//!
//! A `Portfolio` is one ordered collection of [`Position`] records, so every
//! per-position field stays aligned by construction. Stages take the
//! aggregate by value, fill in their fields, and hand it back:
//!
//! ```ignore
//! use shadowfolio::{distribute, merge, polarize, weighting, TierRatios};
//!
//! let portfolio = merge::merge(&metadata, &holdings)?;
//! let portfolio = weighting::assign_targets(portfolio, &TierRatios::default())?;
//! let portfolio = distribute::distribute(portfolio, 1_000.0)?;
//! let portfolio = polarize::polarize(portfolio)?;
//! ```

pub mod position;

pub use position::{Flag, Polarity, Position, QuantityBasis, Tier};

use std::fmt;

/// Which subset of the portfolio a [`Group`] holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GroupKind {
    /// Target percentage at or above held percentage.
    Positive,
    /// Target percentage below held percentage.
    Negative,
    /// Direct split: `difference_amount >= 0`.
    Increase,
    /// Direct split: `difference_amount < 0`.
    Decrease,
}

impl GroupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupKind::Positive => "positive",
            GroupKind::Negative => "negative",
            GroupKind::Increase => "increase",
            GroupKind::Decrease => "decrease",
        }
    }
}

impl From<Polarity> for GroupKind {
    fn from(polarity: Polarity) -> Self {
        match polarity {
            Polarity::Positive => GroupKind::Positive,
            Polarity::Negative => GroupKind::Negative,
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A subset of positions sharing one allocation budget.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Group {
    pub kind: GroupKind,
    /// Indices into [`Portfolio::positions`], in portfolio order
    pub members: Vec<usize>,
    /// Per-member weight used to split the budget (sums to 1)
    pub weights: Vec<f64>,
    /// Budget handed to the allocator, once one has run
    pub budget: Option<f64>,
    /// Sum of the per-member target amounts the allocator aimed for
    pub target_total: Option<f64>,
}

impl Group {
    pub fn new(kind: GroupKind, members: Vec<usize>, weights: Vec<f64>) -> Self {
        debug_assert_eq!(members.len(), weights.len());
        Self {
            kind,
            members,
            weights,
            budget: None,
            target_total: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Per-position order delta handed to order construction.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderDelta {
    pub ticker: String,
    pub price: f64,
    pub held_quantity: i64,
    /// Shares to buy (positive) or sell (negative)
    pub delta_quantity: i64,
    pub optimized_quantity: i64,
    pub optimized_amount: f64,
}

/// Ordered collection of positions plus the groups and allocation basis
/// attached by later stages.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Portfolio {
    positions: Vec<Position>,
    groups: Vec<Group>,
    basis: Option<QuantityBasis>,
}

impl Portfolio {
    /// Wrap positions in a portfolio with no groups attached.
    pub fn new(positions: Vec<Position>) -> Self {
        Self {
            positions,
            groups: Vec::new(),
            basis: None,
        }
    }

    // === Queries ===

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Look up a position by ticker.
    pub fn get(&self, ticker: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.ticker == ticker)
    }

    pub fn tickers(&self) -> Vec<&str> {
        self.positions.iter().map(|p| p.ticker.as_str()).collect()
    }

    /// Total dollar value currently held.
    pub fn held_total(&self) -> f64 {
        self.positions.iter().map(|p| p.held_amount).sum()
    }

    /// Sum of target amounts, or `None` before the distributor has run.
    pub fn target_total(&self) -> Option<f64> {
        self.positions.iter().map(|p| p.target_amount).sum()
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, kind: GroupKind) -> Option<&Group> {
        self.groups.iter().find(|g| g.kind == kind)
    }

    /// How `optimized_quantity` should be read, once an allocator has run.
    pub fn basis(&self) -> Option<QuantityBasis> {
        self.basis
    }

    /// Per-position deltas versus current holdings.
    ///
    /// Empty until an allocator has populated `optimized_quantity`.
    pub fn order_deltas(&self) -> Vec<OrderDelta> {
        let Some(basis) = self.basis else {
            return Vec::new();
        };
        self.positions
            .iter()
            .filter_map(|p| {
                let delta = p.order_delta(basis)?;
                Some(OrderDelta {
                    ticker: p.ticker.clone(),
                    price: p.price,
                    held_quantity: p.held_quantity,
                    delta_quantity: delta,
                    optimized_quantity: p.optimized_quantity?,
                    optimized_amount: p.optimized_amount?,
                })
            })
            .collect()
    }

    // === Stage access ===

    pub(crate) fn positions_mut(&mut self) -> &mut [Position] {
        &mut self.positions
    }

    pub(crate) fn into_positions(self) -> Vec<Position> {
        self.positions
    }

    pub(crate) fn set_groups(&mut self, groups: Vec<Group>) {
        self.groups = groups;
    }

    pub(crate) fn set_basis(&mut self, basis: QuantityBasis) {
        self.basis = Some(basis);
    }
}

impl<'a> IntoIterator for &'a Portfolio {
    type Item = &'a Position;
    type IntoIter = std::slice::Iter<'a, Position>;

    fn into_iter(self) -> Self::IntoIter {
        self.positions.iter()
    }
}


#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn portfolio_json_roundtrip() {
        let mut pos = Position::new("AAA", 10.0, 7.5, vec![Flag::ExceedsSizeLimit]);
        pos.held_amount = 50.0;
        let portfolio = Portfolio::new(vec![pos]);

        let json = serde_json::to_string(&portfolio).unwrap();
        let back: Portfolio = serde_json::from_str(&json).unwrap();
        assert_eq!(back, portfolio);
    }
}
