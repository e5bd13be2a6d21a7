//! Distributor: turn target percentages plus a contribution into dollar targets.

use crate::error::{Error, Result};
use crate::portfolio::Portfolio;

/// Fill `target_amount` and `difference_amount` for every position.
///
/// `contribution` is new cash added to the portfolio; a negative value is a
/// net withdrawal and is applied as-is.
pub fn distribute(mut portfolio: Portfolio, contribution: f64) -> Result<Portfolio> {
    if !contribution.is_finite() {
        return Err(Error::InvalidInput(format!(
            "contribution must be finite, got {contribution}"
        )));
    }

    let total = portfolio.held_total() + contribution;
    for p in portfolio.positions_mut() {
        let pct = p.target_percentage.ok_or_else(|| {
            Error::InvalidInput(format!("{}: target percentage not assigned", p.ticker))
        })?;
        let target = total * pct;
        p.target_amount = Some(target);
        p.difference_amount = Some(target - p.held_amount);
    }

    log::debug!("distributed ${total:.2} across {} positions", portfolio.len());
    Ok(portfolio)
}
