//! Error types for the rebalancing pipeline.

use std::fmt;

/// Errors raised by a pipeline stage.
///
/// Every stage fails at its own boundary; a `Portfolio` coming out of a
/// failed stage is never handed to the next one.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    /// A metadata cell that cannot be interpreted.
    #[error("data error: {0}")]
    Data(String),

    /// A scalar parameter that is non-finite or outside its domain.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A polarity group whose percentage differences sum to zero.
    #[error("degenerate {group} group: {reason}")]
    DegenerateGroup { group: &'static str, reason: String },

    /// No rounding candidate satisfies the group budget.
    #[error("no admissible allocation for {group} group ({size} positions, budget {budget:.2})")]
    InfeasibleAllocation {
        group: &'static str,
        size: usize,
        budget: f64,
    },

    /// The group is wider than the configured search cap.
    #[error("{group} group has {size} positions, exceeding the search cap of {cap}")]
    GroupTooLarge {
        group: &'static str,
        size: usize,
        cap: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage names, used to report where a run halted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stage {
    Merge,
    Weight,
    Distribute,
    Polarize,
    Allocate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Merge => write!(f, "merge"),
            Stage::Weight => write!(f, "weight"),
            Stage::Distribute => write!(f, "distribute"),
            Stage::Polarize => write!(f, "polarize"),
            Stage::Allocate => write!(f, "allocate"),
        }
    }
}

/// An [`Error`] tagged with the stage that raised it.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    pub source: Error,
}

impl StageError {
    pub fn new(stage: Stage, source: Error) -> Self {
        Self { stage, source }
    }
}
