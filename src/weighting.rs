//! TierWeighter: classify positions into tiers and derive target percentages.
//!
//! Tier 1 positions get a linear weight ramp from `max_tier1_ratio` toward 1
//! as PE rises. Tier 2 and tier 3 get a flat weight scaled down by the
//! configured tier-to-tier ratios. Weights are then normalized to sum to 1.

use crate::error::{Error, Result};
use crate::portfolio::{Portfolio, Position, Tier};

/// Ratios shaping the tiered weighting function.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TierRatios {
    /// Weight of the cheapest tier-1 position relative to the dearest
    pub max_tier1_ratio: f64,
    /// Tier-1 baseline weight over tier-2 weight
    pub tier1_to_tier2_ratio: f64,
    /// Tier-2 weight over tier-3 weight
    pub tier2_to_tier3_ratio: f64,
}

impl Default for TierRatios {
    fn default() -> Self {
        Self {
            max_tier1_ratio: 1.5,
            tier1_to_tier2_ratio: 3.0,
            tier2_to_tier3_ratio: 3.0,
        }
    }
}

impl TierRatios {
    pub fn validate(&self) -> Result<()> {
        if !self.max_tier1_ratio.is_finite() || self.max_tier1_ratio < 1.0 {
            return Err(Error::InvalidInput(format!(
                "max_tier1_ratio must be finite and >= 1, got {}",
                self.max_tier1_ratio
            )));
        }
        if !self.tier1_to_tier2_ratio.is_finite() || self.tier1_to_tier2_ratio <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "tier1_to_tier2_ratio must be finite and > 0, got {}",
                self.tier1_to_tier2_ratio
            )));
        }
        if !self.tier2_to_tier3_ratio.is_finite() || self.tier2_to_tier3_ratio <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "tier2_to_tier3_ratio must be finite and > 0, got {}",
                self.tier2_to_tier3_ratio
            )));
        }
        Ok(())
    }

    /// Flat weight of every tier-2 member.
    pub fn tier2_weight(&self) -> f64 {
        1.0 / self.tier1_to_tier2_ratio
    }

    /// Flat weight of every tier-3 member.
    pub fn tier3_weight(&self) -> f64 {
        1.0 / (self.tier1_to_tier2_ratio * self.tier2_to_tier3_ratio)
    }
}

/// `count` evenly spaced values from `first` toward `last`.
///
/// The step is `(last - first) / count` and `last` itself is not emitted,
/// so a single value is just `first` and zero values is an empty vector.
pub fn make_line(first: f64, last: f64, count: usize) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    let step = (last - first) / count as f64;
    (0..count).map(|i| first + step * i as f64).collect()
}

/// Raw (unnormalized) weights for positions already in tier order.
fn tier_weights(positions: &[Position], ratios: &TierRatios) -> Vec<f64> {
    let count = |tier: Tier| positions.iter().filter(|p| p.tier == Some(tier)).count();

    let mut weights = make_line(ratios.max_tier1_ratio, 1.0, count(Tier::One));
    weights.extend(make_line(ratios.tier2_weight(), ratios.tier2_weight(), count(Tier::Two)));
    weights.extend(make_line(ratios.tier3_weight(), ratios.tier3_weight(), count(Tier::Three)));
    weights
}

/// Sort, classify and weight the portfolio.
///
/// Positions come back ordered by tier, then by PE ascending. The sort is
/// stable, so equal PEs (and every infinite PE) keep reference-table order.
pub fn assign_targets(portfolio: Portfolio, ratios: &TierRatios) -> Result<Portfolio> {
    ratios.validate()?;
    if portfolio.is_empty() {
        return Err(Error::InvalidInput("portfolio has no positions".into()));
    }

    let mut positions = portfolio.into_positions();
    positions.sort_by(|a, b| a.pe_ratio.total_cmp(&b.pe_ratio));
    for p in &mut positions {
        p.tier = Some(p.classify());
    }
    positions.sort_by_key(|p| p.tier);

    let weights = tier_weights(&positions, ratios);
    let total: f64 = weights.iter().sum();
    for (p, w) in positions.iter_mut().zip(&weights) {
        p.target_percentage = Some(w / total);
    }

    log::debug!(
        "weighted {} positions: {} tier 1, {} tier 2, {} tier 3",
        positions.len(),
        positions.iter().filter(|p| p.tier == Some(Tier::One)).count(),
        positions.iter().filter(|p| p.tier == Some(Tier::Two)).count(),
        positions.iter().filter(|p| p.tier == Some(Tier::Three)).count(),
    );

    Ok(Portfolio::new(positions))
}
