//! PolarSplitter: partition positions by which side of target they sit on.

use crate::error::{Error, Result};
use crate::portfolio::{Group, GroupKind, Polarity, Portfolio};

/// Split the portfolio into `positive` and `negative` groups.
///
/// The split uses `target_percentage - held_percentage`, recomputed here
/// rather than read from `difference_amount`. Within each group those
/// differences are normalized to sum to 1. A group that is empty or sums
/// to zero has no usable weights and fails with `DegenerateGroup`.
pub fn polarize(mut portfolio: Portfolio) -> Result<Portfolio> {
    let mut diffs = Vec::with_capacity(portfolio.len());
    for p in portfolio.positions() {
        let target = p.target_percentage.ok_or_else(|| {
            Error::InvalidInput(format!("{}: target percentage not assigned", p.ticker))
        })?;
        diffs.push(target - p.held_percentage);
    }

    let mut groups = Vec::with_capacity(2);
    for polarity in [Polarity::Positive, Polarity::Negative] {
        let members: Vec<usize> = diffs
            .iter()
            .enumerate()
            .filter(|&(_, d)| polarity_of(*d) == polarity)
            .map(|(i, _)| i)
            .collect();

        if members.is_empty() {
            return Err(Error::DegenerateGroup {
                group: polarity.as_str(),
                reason: "group has no members".into(),
            });
        }
        let sum: f64 = members.iter().map(|&i| diffs[i]).sum();
        if sum == 0.0 || !sum.is_finite() {
            return Err(Error::DegenerateGroup {
                group: polarity.as_str(),
                reason: format!("percentage differences sum to {sum}"),
            });
        }

        let weights: Vec<f64> = members.iter().map(|&i| diffs[i] / sum).collect();
        for (&i, &w) in members.iter().zip(&weights) {
            let p = &mut portfolio.positions_mut()[i];
            p.polarity = Some(polarity);
            p.normalized_group_weight = Some(w);
        }
        groups.push(Group::new(GroupKind::from(polarity), members, weights));
    }

    log::debug!(
        "polarized: {} positive, {} negative",
        groups[0].len(),
        groups[1].len()
    );
    portfolio.set_groups(groups);
    Ok(portfolio)
}

fn polarity_of(diff: f64) -> Polarity {
    if diff >= 0.0 {
        Polarity::Positive
    } else {
        Polarity::Negative
    }
}
