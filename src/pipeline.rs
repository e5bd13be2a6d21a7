//! Pipeline driver: run the stages in order over one owned Portfolio.
//!
//! Every stage takes the aggregate by value and hands it back, so no stage
//! can hold on to it after returning. The first failure halts the run and is
//! reported with the stage that raised it.

use crate::allocate::{self, AllocatorSettings};
use crate::error::{Error, Stage, StageError};
use crate::merge::{self, HoldingRow, MetadataRow};
use crate::portfolio::Portfolio;
use crate::weighting::{self, TierRatios};
use crate::{distribute, polarize};

/// Result of a pipeline run.
pub type PipelineResult = std::result::Result<Portfolio, StageError>;

/// Settings shared by both pipeline variants.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rebalance {
    pub ratios: TierRatios,
    pub allocator: AllocatorSettings,
}

/// Tag a stage's error with the stage name.
fn at<T>(stage: Stage, result: crate::error::Result<T>) -> Result<T, StageError> {
    result.map_err(|source: Error| {
        log::debug!("{stage} stage failed: {source}");
        StageError::new(stage, source)
    })
}

/// Merge and weight only: the portfolio with tiers and target percentages.
pub fn run_weighting(
    metadata: &[MetadataRow],
    holdings: &[HoldingRow],
    settings: &Rebalance,
) -> PipelineResult {
    let portfolio = at(Stage::Merge, merge::merge(metadata, holdings))?;
    at(Stage::Weight, weighting::assign_targets(portfolio, &settings.ratios))
}

/// Merge → weight → distribute → polarize → group-weighted allocation.
///
/// `contribution` sets the dollar targets; the two budgets are what the
/// allocator spreads over the positive and negative groups.
pub fn run_group_weighted(
    metadata: &[MetadataRow],
    holdings: &[HoldingRow],
    contribution: f64,
    positive_budget: f64,
    negative_budget: f64,
    settings: &Rebalance,
) -> PipelineResult {
    let portfolio = run_weighting(metadata, holdings, settings)?;
    let portfolio = at(Stage::Distribute, distribute::distribute(portfolio, contribution))?;
    let portfolio = at(Stage::Polarize, polarize::polarize(portfolio))?;
    at(
        Stage::Allocate,
        allocate::allocate_groups(portfolio, positive_budget, negative_budget, &settings.allocator),
    )
}

/// Merge → weight → distribute → direct-split allocation.
pub fn run_direct(
    metadata: &[MetadataRow],
    holdings: &[HoldingRow],
    positive_contribution: f64,
    negative_contribution: f64,
    settings: &Rebalance,
) -> PipelineResult {
    let portfolio = run_weighting(metadata, holdings, settings)?;
    let portfolio = at(
        Stage::Distribute,
        distribute::distribute(portfolio, positive_contribution),
    )?;
    at(
        Stage::Allocate,
        allocate::allocate_direct(
            portfolio,
            positive_contribution,
            negative_contribution,
            &settings.allocator,
        ),
    )
}
