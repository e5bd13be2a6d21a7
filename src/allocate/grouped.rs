//! Group-weighted allocator: split each polarity group's budget by its
//! normalized weights and round to whole-share deltas.

use super::{AllocatorSettings, Rounding, apply, require_finite};
use crate::allocate::search::{Budget, Step};
use crate::error::{Error, Result};
use crate::portfolio::{GroupKind, Portfolio, QuantityBasis};

/// Round each polarity group's share of its budget to whole shares.
///
/// Needs the groups attached by [`crate::polarize::polarize`]. Both budgets
/// are used as given; a negative budget yields negative deltas (sales).
/// `optimized_quantity` is the signed number of shares to trade.
pub fn allocate_groups(
    portfolio: Portfolio,
    positive_budget: f64,
    negative_budget: f64,
    settings: &AllocatorSettings,
) -> Result<Portfolio> {
    require_finite("positive budget", positive_budget)?;
    require_finite("negative budget", negative_budget)?;

    let mut roundings = Vec::with_capacity(2);
    for (kind, budget) in [
        (GroupKind::Positive, positive_budget),
        (GroupKind::Negative, negative_budget),
    ] {
        let group = portfolio.group(kind).ok_or_else(|| {
            Error::InvalidInput(format!("{kind} group missing; polarize the portfolio first"))
        })?;

        let prices: Vec<f64> = group
            .members
            .iter()
            .map(|&i| portfolio.positions()[i].price)
            .collect();
        let targets: Vec<f64> = group.weights.iter().map(|w| budget * w).collect();
        let base: Vec<i64> = targets
            .iter()
            .zip(&prices)
            .map(|(t, p)| (t / p).floor() as i64)
            .collect();
        let cap: f64 = targets.iter().sum();

        roundings.push(Rounding {
            kind,
            members: group.members.clone(),
            weights: group.weights.clone(),
            prices,
            targets,
            base,
            step: Step::Up,
            budget: Budget::AtMost(cap),
            long_only: false,
        });
    }

    let mut portfolio = apply(portfolio, roundings, settings)?;
    portfolio.set_basis(QuantityBasis::Delta);
    Ok(portfolio)
}
