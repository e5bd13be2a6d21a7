//! Direct-split allocator: split by the sign of the dollar difference and
//! round each side to absolute whole-share holdings.

use super::{AllocatorSettings, Rounding, apply, require_finite};
use crate::allocate::search::{Budget, Step};
use crate::error::{Error, Result};
use crate::portfolio::{GroupKind, Portfolio, QuantityBasis};

/// Round the portfolio to whole-share holdings directly from target
/// percentages.
///
/// Targets are recomputed as `(held total + positive_contribution) *
/// target_percentage`. Positions at or below target form the increase set,
/// which receives `positive_contribution`; the rest form the decrease set,
/// which gives up `negative_contribution`. Within a set the money is spread
/// by target percentage renormalized over the set.
///
/// The increase set rounds down and may add one share per position, with
/// its total held strictly below `held + positive_contribution`. The
/// decrease set rounds up and may shed one share per position, with its
/// total held strictly above `held - negative_contribution` and no share
/// count below zero. `optimized_quantity` is the share count to hold.
pub fn allocate_direct(
    mut portfolio: Portfolio,
    positive_contribution: f64,
    negative_contribution: f64,
    settings: &AllocatorSettings,
) -> Result<Portfolio> {
    require_finite("positive contribution", positive_contribution)?;
    require_finite("negative contribution", negative_contribution)?;

    let mut percentages = Vec::with_capacity(portfolio.len());
    for p in portfolio.positions() {
        percentages.push(p.target_percentage.ok_or_else(|| {
            Error::InvalidInput(format!("{}: target percentage not assigned", p.ticker))
        })?);
    }

    let total = portfolio.held_total() + positive_contribution;
    let (increase, decrease): (Vec<usize>, Vec<usize>) = (0..portfolio.len())
        .partition(|&i| total * percentages[i] - portfolio.positions()[i].held_amount >= 0.0);

    let sets = [
        (GroupKind::Increase, increase, positive_contribution, Step::Up),
        (GroupKind::Decrease, decrease, -negative_contribution, Step::Down),
    ];

    let mut roundings = Vec::with_capacity(2);
    for (kind, members, contribution, step) in sets {
        let positions = portfolio.positions();
        let pct_sum: f64 = members.iter().map(|&i| percentages[i]).sum();
        let weights: Vec<f64> = members.iter().map(|&i| percentages[i] / pct_sum).collect();
        let held: f64 = members.iter().map(|&i| positions[i].held_amount).sum();

        let prices: Vec<f64> = members.iter().map(|&i| positions[i].price).collect();
        let targets: Vec<f64> = members
            .iter()
            .zip(&weights)
            .map(|(&i, w)| positions[i].held_amount + contribution * w)
            .collect();
        let base: Vec<i64> = targets
            .iter()
            .zip(&prices)
            .map(|(t, p)| match step {
                Step::Up => (t / p).floor() as i64,
                Step::Down => (t / p).ceil() as i64,
            })
            .collect();
        let budget = match step {
            Step::Up => Budget::Below(held + contribution),
            Step::Down => Budget::Above(held + contribution),
        };

        roundings.push(Rounding {
            kind,
            members,
            weights,
            prices,
            targets,
            base,
            step,
            budget,
            long_only: step == Step::Down,
        });
    }

    for rounding in &roundings {
        let positions = portfolio.positions_mut();
        for (k, &i) in rounding.members.iter().enumerate() {
            let target = rounding.targets[k];
            positions[i].target_amount = Some(target);
            positions[i].difference_amount = Some(target - positions[i].held_amount);
        }
    }

    let mut portfolio = apply(portfolio, roundings, settings)?;
    portfolio.set_basis(QuantityBasis::Absolute);
    Ok(portfolio)
}
