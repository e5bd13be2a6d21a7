//! A single portfolio line item and its classification enums.

use std::fmt;

/// Marker the reference table writes for a position on earnings probation.
pub const EARNINGS_PROBATION: &str = "Earnings probation";
/// Marker the reference table writes for a position above its size limit.
pub const EXCEEDS_SIZE_LIMIT: &str = "Exceeds size limit";

/// A qualitative note attached to a position.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Flag {
    EarningsProbation,
    ExceedsSizeLimit,
    /// Free text that carries no weighting meaning.
    Other(String),
}

impl Flag {
    /// Parse a free-text notes cell.
    ///
    /// The demoting markers are recognized anywhere in the text. Whatever is
    /// left once they are removed is kept as a single `Other` note.
    pub fn parse_notes(text: &str) -> Vec<Flag> {
        let mut flags = Vec::new();
        let mut rest = text.to_string();

        for (marker, flag) in [
            (EARNINGS_PROBATION, Flag::EarningsProbation),
            (EXCEEDS_SIZE_LIMIT, Flag::ExceedsSizeLimit),
        ] {
            if rest.contains(marker) {
                flags.push(flag);
                rest = rest.replace(marker, "");
            }
        }

        let rest = rest.trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '.'));
        if !rest.is_empty() {
            flags.push(Flag::Other(rest.to_string()));
        }
        flags
    }

    /// True for the flags that push a position into tier 3.
    pub fn is_demoting(&self) -> bool {
        matches!(self, Flag::EarningsProbation | Flag::ExceedsSizeLimit)
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flag::EarningsProbation => write!(f, "{EARNINGS_PROBATION}"),
            Flag::ExceedsSizeLimit => write!(f, "{EXCEEDS_SIZE_LIMIT}"),
            Flag::Other(text) => write!(f, "{text}"),
        }
    }
}

/// Priority class driving a position's weight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Tier {
    /// Unflagged, finite PE.
    One,
    /// Unflagged, PE not meaningful.
    Two,
    /// Flagged, regardless of PE.
    Three,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::One => write!(f, "1"),
            Tier::Two => write!(f, "2"),
            Tier::Three => write!(f, "3"),
        }
    }
}

/// Which side of its target a position sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Polarity {
    /// Needs more money (target percentage >= held percentage).
    Positive,
    /// Needs less money.
    Negative,
}

impl Polarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Positive => "positive",
            Polarity::Negative => "negative",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an allocator's `optimized_quantity` relates to current holdings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QuantityBasis {
    /// Shares to buy (positive) or sell (negative).
    Delta,
    /// Total shares to hold after rebalancing.
    Absolute,
}

/// One portfolio line item.
///
/// Fields below `held_percentage` start out empty and are filled in by the
/// pipeline stages in order.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    /// Ticker with provenance markers stripped
    pub ticker: String,
    /// Current unit price
    pub price: f64,
    /// Price/earnings ratio; `f64::INFINITY` when not meaningful
    pub pe_ratio: f64,
    pub flags: Vec<Flag>,
    /// Current dollar value held
    pub held_amount: f64,
    /// Current share count
    pub held_quantity: i64,
    /// `held_amount / total held`, rounded to 3 decimals
    pub held_percentage: f64,

    pub tier: Option<Tier>,
    pub target_percentage: Option<f64>,
    pub target_amount: Option<f64>,
    /// `target_amount - held_amount`
    pub difference_amount: Option<f64>,
    pub polarity: Option<Polarity>,
    /// This position's share of its polarity group's weight (group sums to 1)
    pub normalized_group_weight: Option<f64>,
    pub optimized_quantity: Option<i64>,
    pub optimized_amount: Option<f64>,
}

impl Position {
    /// Create a position with no holdings and no derived fields.
    pub fn new(ticker: impl Into<String>, price: f64, pe_ratio: f64, flags: Vec<Flag>) -> Self {
        Self {
            ticker: ticker.into(),
            price,
            pe_ratio,
            flags,
            held_amount: 0.0,
            held_quantity: 0,
            held_percentage: 0.0,
            tier: None,
            target_percentage: None,
            target_amount: None,
            difference_amount: None,
            polarity: None,
            normalized_group_weight: None,
            optimized_quantity: None,
            optimized_amount: None,
        }
    }

    /// True if any flag demotes this position to tier 3.
    pub fn is_flagged(&self) -> bool {
        self.flags.iter().any(Flag::is_demoting)
    }

    /// Tier by the classification rule: flagged → 3, finite PE → 1, else 2.
    pub fn classify(&self) -> Tier {
        if self.is_flagged() {
            Tier::Three
        } else if self.pe_ratio.is_finite() {
            Tier::One
        } else {
            Tier::Two
        }
    }

    /// Share delta versus current holdings, if an allocator has run.
    pub fn order_delta(&self, basis: QuantityBasis) -> Option<i64> {
        let quantity = self.optimized_quantity?;
        Some(match basis {
            QuantityBasis::Delta => quantity,
            QuantityBasis::Absolute => quantity - self.held_quantity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_notes() {
        assert!(Flag::parse_notes("").is_empty());
        assert!(Flag::parse_notes("   ").is_empty());
    }

    #[test]
    fn parse_markers_inside_text() {
        let flags = Flag::parse_notes("Exceeds size limit; watch margins");
        assert_eq!(
            flags,
            vec![
                Flag::ExceedsSizeLimit,
                Flag::Other("watch margins".into())
            ]
        );

        let flags = Flag::parse_notes("Earnings probation");
        assert_eq!(flags, vec![Flag::EarningsProbation]);
        assert!(flags[0].is_demoting());
    }

    #[test]
    fn free_text_is_not_demoting() {
        let pos = Position::new("AAA", 10.0, 5.0, Flag::parse_notes("new addition"));
        assert!(!pos.is_flagged());
        assert_eq!(pos.classify(), Tier::One);
    }

    #[test]
    fn classify_tiers() {
        let flagged = Position::new("A", 1.0, 4.0, vec![Flag::EarningsProbation]);
        let infinite = Position::new("B", 1.0, f64::INFINITY, vec![]);
        let finite = Position::new("C", 1.0, 12.0, vec![]);
        assert_eq!(flagged.classify(), Tier::Three);
        assert_eq!(infinite.classify(), Tier::Two);
        assert_eq!(finite.classify(), Tier::One);
    }

    #[test]
    fn order_delta_by_basis() {
        let mut pos = Position::new("A", 10.0, 5.0, vec![]);
        assert_eq!(pos.order_delta(QuantityBasis::Delta), None);

        pos.held_quantity = 7;
        pos.optimized_quantity = Some(10);
        assert_eq!(pos.order_delta(QuantityBasis::Delta), Some(10));
        assert_eq!(pos.order_delta(QuantityBasis::Absolute), Some(3));
    }
}
