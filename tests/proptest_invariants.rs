//! Property-based tests for pipeline invariants.
//!
//! These tests use proptest to check that weighting, splitting and rounding
//! hold their guarantees across randomly generated portfolios.

use proptest::prelude::*;
use shadowfolio::allocate::{Budget, SearchSpace, SelectionRule, Step};
use shadowfolio::merge::{self, HoldingRow, MetadataRow};
use shadowfolio::pipeline::{run_weighting, Rebalance};
use shadowfolio::{distribute, polarize, Tier};

/// A PE cell: mostly numeric, sometimes "nmf"
fn pe_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => (1u32..=80u32).prop_map(|pe| pe.to_string()),
        1 => Just("nmf".to_string()),
    ]
}

fn notes_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        4 => Just(None),
        1 => Just(Some("Earnings probation".to_string())),
        1 => Just(Some("Exceeds size limit".to_string())),
        1 => Just(Some("added this quarter".to_string())),
    ]
}

/// Reference rows plus matching holdings (some tickers not held).
fn tables_strategy() -> impl Strategy<Value = (Vec<MetadataRow>, Vec<HoldingRow>)> {
    prop::collection::vec(
        (1u32..=500u32, pe_strategy(), notes_strategy(), 0u32..=40u32),
        1..10,
    )
    .prop_map(|rows| {
        let mut metadata = Vec::new();
        let mut holdings = Vec::new();
        for (i, (price, pe, notes, qty)) in rows.into_iter().enumerate() {
            let ticker = format!("S{i:02}");
            if qty > 0 {
                holdings.push(HoldingRow {
                    symbol: ticker.clone(),
                    value: (price * qty) as f64,
                    quantity: qty as i64,
                });
            }
            metadata.push(MetadataRow {
                ticker: format!("{ticker}*"),
                price: price as f64,
                pe,
                notes,
            });
        }
        (metadata, holdings)
    })
}

/// Rounding inputs with whole-dollar prices and targets (exact in f64).
fn rounding_strategy() -> impl Strategy<Value = (Vec<f64>, Vec<f64>, i64)> {
    prop::collection::vec((1u32..=200u32, 0u32..=1_000u32), 1..8).prop_flat_map(|rows| {
        let prices: Vec<f64> = rows.iter().map(|&(p, _)| p as f64).collect();
        let targets: Vec<f64> = rows.iter().map(|&(_, t)| t as f64).collect();
        let total: i64 = rows.iter().map(|&(_, t)| t as i64).sum();
        (Just(prices), Just(targets), 0..=total + 200)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // ========================================================================
    // WEIGHTING
    // ========================================================================

    /// Target percentages sum to 1 for any tier mix, including empty tiers
    #[test]
    fn percentage_conservation((metadata, holdings) in tables_strategy()) {
        let portfolio = run_weighting(&metadata, &holdings, &Rebalance::default()).unwrap();
        let sum: f64 = portfolio.positions().iter().map(|p| p.target_percentage.unwrap()).sum();
        prop_assert!((sum - 1.0).abs() < 1e-9, "percentages sum to {}", sum);
    }

    /// Tier-1 weights never increase with PE; tiers come out in order
    #[test]
    fn tier_monotonicity((metadata, holdings) in tables_strategy()) {
        let portfolio = run_weighting(&metadata, &holdings, &Rebalance::default()).unwrap();
        let positions = portfolio.positions();

        for pair in positions.windows(2) {
            prop_assert!(pair[0].tier <= pair[1].tier);
            if pair[0].tier == Some(Tier::One) && pair[1].tier == Some(Tier::One) {
                prop_assert!(pair[0].pe_ratio <= pair[1].pe_ratio);
                prop_assert!(pair[0].target_percentage >= pair[1].target_percentage);
            }
        }
    }

    // ========================================================================
    // MERGER
    // ========================================================================

    /// Same tables in, identical portfolio out
    #[test]
    fn merger_is_idempotent((metadata, holdings) in tables_strategy()) {
        let a = merge::merge(&metadata, &holdings).unwrap();
        let b = merge::merge(&metadata, &holdings).unwrap();
        prop_assert_eq!(a, b);
    }

    // ========================================================================
    // POLAR SPLIT
    // ========================================================================

    /// Every position lands in exactly one polarity group
    #[test]
    fn partition_completeness((metadata, holdings) in tables_strategy(), contribution in 0u32..5_000u32) {
        let portfolio = run_weighting(&metadata, &holdings, &Rebalance::default()).unwrap();
        let portfolio = distribute::distribute(portfolio, contribution as f64).unwrap();
        let n = portfolio.len();

        if let Ok(split) = polarize::polarize(portfolio) {
            let mut seen = vec![0usize; n];
            for group in split.groups() {
                let sum: f64 = group.weights.iter().sum();
                prop_assert!((sum - 1.0).abs() < 1e-9);
                for &i in &group.members {
                    seen[i] += 1;
                }
            }
            prop_assert!(seen.iter().all(|&count| count == 1), "membership counts {:?}", seen);
        }
    }

    // ========================================================================
    // ROUNDING
    // ========================================================================

    /// The winner satisfies its budget exactly and no admissible candidate
    /// scores higher under the largest-error rule
    #[test]
    fn budget_respect((prices, targets, cap) in rounding_strategy()) {
        let base: Vec<i64> = targets
            .iter()
            .zip(&prices)
            .map(|(t, p)| (t / p).floor() as i64)
            .collect();
        let space = SearchSpace {
            prices: &prices,
            targets: &targets,
            base: &base,
            step: Step::Up,
            budget: Budget::AtMost(cap as f64),
            long_only: false,
        };

        match space.search(SelectionRule::LargestError, "positive", 20) {
            Ok(best) => {
                prop_assert!(best.total <= cap as f64);
                let total: f64 = best.quantities.iter().zip(&prices).map(|(&q, p)| q as f64 * p).sum();
                prop_assert_eq!(total, best.total);

                let n = prices.len();
                for state in 0..(1u64 << n) {
                    let qty: Vec<i64> = (0..n)
                        .map(|j| base[j] + ((state >> (n - 1 - j)) & 1) as i64)
                        .collect();
                    let total: f64 = qty.iter().zip(&prices).map(|(&q, p)| q as f64 * p).sum();
                    if total <= cap as f64 {
                        let objective: f64 = qty
                            .iter()
                            .zip(&prices)
                            .zip(&targets)
                            .map(|((&q, p), t)| (t - q as f64 * p).powi(2))
                            .sum();
                        prop_assert!(objective <= best.objective);
                        if objective == best.objective {
                            prop_assert!(state >= best.index);
                        }
                    }
                }
            }
            Err(_) => {
                // Only possible when even the all-base candidate is over the cap
                let floor_total: f64 = base.iter().zip(&prices).map(|(&q, p)| q as f64 * p).sum();
                prop_assert!(floor_total > cap as f64);
            }
        }
    }
}
