//! CombinatorialAllocator: round fractional dollar targets to whole shares.
//!
//! Two variants share the [`search`] kernel:
//!
//! - [`grouped::allocate_groups`] splits a budget per polarity group using
//!   the normalized group weights and reports signed share deltas.
//! - [`direct::allocate_direct`] re-splits positions by the sign of their
//!   dollar difference and reports absolute share counts.

pub mod direct;
pub mod grouped;
pub mod search;

pub use direct::allocate_direct;
pub use grouped::allocate_groups;
pub use search::{Budget, Candidate, SearchSpace, SelectionRule, Step, DEFAULT_GROUP_CAP, MAX_GROUP_SIZE};

use crate::error::{Error, Result};
use crate::portfolio::{Group, GroupKind, Portfolio};

/// Knobs shared by both allocator variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AllocatorSettings {
    pub rule: SelectionRule,
    /// Largest group the exhaustive search will accept
    pub max_group_size: usize,
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        Self {
            rule: SelectionRule::default(),
            max_group_size: DEFAULT_GROUP_CAP,
        }
    }
}

impl AllocatorSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_group_size == 0 || self.max_group_size > MAX_GROUP_SIZE {
            return Err(Error::InvalidInput(format!(
                "max_group_size must be in [1, {MAX_GROUP_SIZE}], got {}",
                self.max_group_size
            )));
        }
        Ok(())
    }
}

/// One group's rounding problem with owned inputs.
#[derive(Clone, Debug)]
pub(crate) struct Rounding {
    pub kind: GroupKind,
    pub members: Vec<usize>,
    pub weights: Vec<f64>,
    pub prices: Vec<f64>,
    pub targets: Vec<f64>,
    pub base: Vec<i64>,
    pub step: Step,
    pub budget: Budget,
    pub long_only: bool,
}

impl Rounding {
    fn solve(&self, settings: &AllocatorSettings) -> Result<Candidate> {
        let space = SearchSpace {
            prices: &self.prices,
            targets: &self.targets,
            base: &self.base,
            step: self.step,
            budget: self.budget,
            long_only: self.long_only,
        };
        space.search(settings.rule, self.kind.as_str(), settings.max_group_size)
    }

    /// The group record attached to the portfolio once solved.
    fn into_group(self) -> Group {
        let target_total = self.targets.iter().sum();
        let mut group = Group::new(self.kind, self.members, self.weights);
        group.budget = Some(self.budget.limit());
        group.target_total = Some(target_total);
        group
    }
}

/// Solve every rounding, failing on the first group (in order) that fails.
#[cfg(not(feature = "parallel"))]
fn solve_all(roundings: &[Rounding], settings: &AllocatorSettings) -> Result<Vec<Candidate>> {
    roundings.iter().map(|r| r.solve(settings)).collect()
}

/// Solve every rounding, failing on the first group (in order) that fails.
#[cfg(feature = "parallel")]
fn solve_all(roundings: &[Rounding], settings: &AllocatorSettings) -> Result<Vec<Candidate>> {
    use rayon::prelude::*;

    let results: Vec<Result<Candidate>> =
        roundings.par_iter().map(|r| r.solve(settings)).collect();
    results.into_iter().collect()
}

/// Solve, then write each winner back onto its member positions.
fn apply(
    mut portfolio: Portfolio,
    roundings: Vec<Rounding>,
    settings: &AllocatorSettings,
) -> Result<Portfolio> {
    settings.validate()?;
    let winners = solve_all(&roundings, settings)?;

    let mut groups = Vec::with_capacity(roundings.len());
    for (rounding, winner) in roundings.into_iter().zip(winners) {
        log::debug!(
            "{} group: {} positions, total ${:.2} against budget ${:.2}",
            rounding.kind,
            rounding.members.len(),
            winner.total,
            rounding.budget.limit(),
        );
        let positions = portfolio.positions_mut();
        for (k, &i) in rounding.members.iter().enumerate() {
            positions[i].optimized_quantity = Some(winner.quantities[k]);
            positions[i].optimized_amount = Some(winner.amounts[k]);
        }
        groups.push(rounding.into_group());
    }

    portfolio.set_groups(groups);
    Ok(portfolio)
}

fn require_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("{name} must be finite, got {value}")))
    }
}
