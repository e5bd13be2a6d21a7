//! Exhaustive rounding search shared by both allocators.
//!
//! Each position in a group starts from a base share count and may move one
//! share (up or down). Every one of the `2^n` choices is scored, so the cost
//! is Θ(2ⁿ · n) per group and the group size must stay small.
//!
//! Candidate `s` assigns bit `(s >> (n - 1 - j)) & 1` to position `j`: the
//! first position is the most significant bit. Ties in the objective go to
//! the lowest candidate index, with or without the `parallel` feature.

use std::fmt;

use crate::error::{Error, Result};

/// Hard ceiling on group size: candidate indices are `u64`.
pub const MAX_GROUP_SIZE: usize = 63;

/// Group size cap used when none is configured.
pub const DEFAULT_GROUP_CAP: usize = 20;

/// How to rank admissible candidates by their squared error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum SelectionRule {
    /// Keep the admissible candidate with the largest squared error.
    #[default]
    LargestError,
    /// Keep the admissible candidate with the smallest squared error.
    SmallestError,
}

impl SelectionRule {
    /// True if `candidate` should replace `incumbent`. Equal scores never do.
    #[inline]
    fn prefers(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            SelectionRule::LargestError => candidate > incumbent,
            SelectionRule::SmallestError => candidate < incumbent,
        }
    }
}

impl fmt::Display for SelectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionRule::LargestError => write!(f, "largest-error"),
            SelectionRule::SmallestError => write!(f, "smallest-error"),
        }
    }
}

/// Inequality a candidate's total amount must satisfy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Budget {
    /// `total <= limit`
    AtMost(f64),
    /// `total < limit`
    Below(f64),
    /// `total > limit`
    Above(f64),
}

impl Budget {
    #[inline]
    pub fn admits(&self, total: f64) -> bool {
        match *self {
            Budget::AtMost(limit) => total <= limit,
            Budget::Below(limit) => total < limit,
            Budget::Above(limit) => total > limit,
        }
    }

    pub fn limit(&self) -> f64 {
        match *self {
            Budget::AtMost(x) | Budget::Below(x) | Budget::Above(x) => x,
        }
    }
}

/// Direction a set bit moves a position's share count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Buy one more share than the base.
    Up,
    /// Sell one more share than the base.
    Down,
}

/// The winning rounding for one group.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    /// Enumeration index of this candidate
    pub index: u64,
    pub quantities: Vec<i64>,
    pub amounts: Vec<f64>,
    pub total: f64,
    /// Sum of squared differences between target and candidate amounts
    pub objective: f64,
}

/// One group's rounding problem.
#[derive(Clone, Copy, Debug)]
pub struct SearchSpace<'a> {
    pub prices: &'a [f64],
    /// Target dollar amount per position
    pub targets: &'a [f64],
    /// Share count a zero bit maps to
    pub base: &'a [i64],
    pub step: Step,
    pub budget: Budget,
    /// Reject candidates holding a negative share count
    pub long_only: bool,
}

impl SearchSpace<'_> {
    #[inline]
    fn width(&self) -> usize {
        self.base.len()
    }

    #[inline]
    fn quantity(&self, state: u64, j: usize) -> i64 {
        let bit = ((state >> (self.width() - 1 - j)) & 1) as i64;
        match self.step {
            Step::Up => self.base[j] + bit,
            Step::Down => self.base[j] - bit,
        }
    }

    /// Objective of candidate `state`, or `None` if it is not admissible.
    fn score(&self, state: u64) -> Option<f64> {
        let mut total = 0.0;
        let mut objective = 0.0;
        for j in 0..self.width() {
            let qty = self.quantity(state, j);
            if self.long_only && qty < 0 {
                return None;
            }
            let amount = qty as f64 * self.prices[j];
            let miss = self.targets[j] - amount;
            total += amount;
            objective += miss * miss;
        }
        self.budget.admits(total).then_some(objective)
    }

    fn materialize(&self, index: u64, objective: f64) -> Candidate {
        let quantities: Vec<i64> = (0..self.width()).map(|j| self.quantity(index, j)).collect();
        let amounts: Vec<f64> = quantities
            .iter()
            .zip(self.prices)
            .map(|(&q, &p)| q as f64 * p)
            .collect();
        let total = amounts.iter().sum();
        Candidate {
            index,
            quantities,
            amounts,
            total,
            objective,
        }
    }

    /// Enumerate every candidate and return the one `rule` selects.
    ///
    /// `group` and `cap` are used for error reporting and the size check.
    pub fn search(&self, rule: SelectionRule, group: &'static str, cap: usize) -> Result<Candidate> {
        let n = self.width();
        debug_assert!(self.prices.len() == n && self.targets.len() == n);

        if n > cap.min(MAX_GROUP_SIZE) {
            return Err(Error::GroupTooLarge {
                group,
                size: n,
                cap: cap.min(MAX_GROUP_SIZE),
            });
        }

        let states = 1u64 << n;
        let best = self.best_of(states, rule);

        match best {
            Some((index, objective)) => {
                log::trace!("{group}: candidate {index} of {states} selected ({rule})");
                Ok(self.materialize(index, objective))
            }
            None => Err(Error::InfeasibleAllocation {
                group,
                size: n,
                budget: self.budget.limit(),
            }),
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn best_of(&self, states: u64, rule: SelectionRule) -> Option<(u64, f64)> {
        let mut best: Option<(u64, f64)> = None;
        for state in 0..states {
            let Some(objective) = self.score(state) else {
                continue;
            };
            if best.is_none_or(|(_, incumbent)| rule.prefers(objective, incumbent)) {
                best = Some((state, objective));
            }
        }
        best
    }

    #[cfg(feature = "parallel")]
    fn best_of(&self, states: u64, rule: SelectionRule) -> Option<(u64, f64)> {
        use rayon::prelude::*;

        (0..states)
            .into_par_iter()
            .filter_map(|state| self.score(state).map(|objective| (state, objective)))
            .reduce_with(|a, b| pick(rule, a, b))
    }
}

/// Order-independent choice between two scored candidates.
#[cfg(feature = "parallel")]
fn pick(rule: SelectionRule, a: (u64, f64), b: (u64, f64)) -> (u64, f64) {
    let (first, second) = if a.0 < b.0 { (a, b) } else { (b, a) };
    if rule.prefers(second.1, first.1) {
        second
    } else {
        first
    }
}
