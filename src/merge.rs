//! Merger: join reference metadata with current holdings.
//!
//! Pure given its two input tables. Row parsing (CSV, column names) belongs
//! to the loader; this module only sees already-split rows.

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::portfolio::{Flag, Portfolio, Position};

/// Marker the reference table uses for a PE ratio that is not meaningful.
pub const NOT_MEANINGFUL: &str = "nmf";

/// Characters the reference table appends to tickers to note provenance.
const PROVENANCE_MARKERS: &[char] = &['*'];

/// One row of the reference table.
#[derive(Clone, Debug, PartialEq)]
pub struct MetadataRow {
    pub ticker: String,
    pub price: f64,
    /// Raw PE cell: a number, or text containing [`NOT_MEANINGFUL`]
    pub pe: String,
    pub notes: Option<String>,
}

/// One row of the holdings table.
#[derive(Clone, Debug, PartialEq)]
pub struct HoldingRow {
    pub symbol: String,
    /// Dollar value held
    pub value: f64,
    pub quantity: i64,
}

/// Remove provenance markers and surrounding whitespace from a ticker.
pub fn strip_ticker(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !PROVENANCE_MARKERS.contains(c))
        .collect()
}

/// Parse a PE cell. "Not meaningful" maps to `f64::INFINITY`.
pub fn parse_pe(ticker: &str, cell: &str) -> Result<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Err(Error::Data(format!("{ticker}: PE ratio is missing")));
    }
    if cell.to_ascii_lowercase().contains(NOT_MEANINGFUL) {
        return Ok(f64::INFINITY);
    }
    match cell.parse::<f64>() {
        Ok(pe) if !pe.is_nan() => Ok(pe),
        _ => Err(Error::Data(format!(
            "{ticker}: PE ratio '{cell}' is neither numeric nor '{NOT_MEANINGFUL}'"
        ))),
    }
}

/// Round to 3 decimals, the precision held percentages are stored at.
fn round3(x: f64) -> f64 {
    (x * 1_000.0).round() / 1_000.0
}

/// Only holdings rows some reference ticker points at are checked; the
/// rest never enter the portfolio.
fn validate_holding(row: &HoldingRow) -> Result<()> {
    if !row.value.is_finite() || row.value < 0.0 {
        return Err(Error::InvalidInput(format!(
            "{}: held value must be finite and >= 0, got {}",
            row.symbol, row.value
        )));
    }
    if row.quantity < 0 {
        return Err(Error::InvalidInput(format!(
            "{}: held quantity must be >= 0, got {}",
            row.symbol, row.quantity
        )));
    }
    Ok(())
}

/// Build a Portfolio from the reference table and the holdings table.
///
/// Positions keep reference-table order. A ticker missing from the holdings
/// table is held at zero; when a symbol appears more than once in the
/// holdings, the first row wins.
pub fn merge(metadata: &[MetadataRow], holdings: &[HoldingRow]) -> Result<Portfolio> {
    if metadata.is_empty() {
        return Err(Error::Data("reference table has no rows".into()));
    }

    let mut held: FxHashMap<&str, &HoldingRow> = FxHashMap::default();
    for row in holdings {
        held.entry(row.symbol.trim()).or_insert(row);
    }

    let mut positions: Vec<Position> = Vec::with_capacity(metadata.len());
    for row in metadata {
        let ticker = strip_ticker(&row.ticker);
        if ticker.is_empty() {
            return Err(Error::Data(format!("empty ticker '{}'", row.ticker)));
        }
        if positions.iter().any(|p| p.ticker == ticker) {
            return Err(Error::Data(format!("duplicate ticker {ticker}")));
        }
        if !row.price.is_finite() || row.price <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "{ticker}: price must be finite and > 0, got {}",
                row.price
            )));
        }

        let pe_ratio = parse_pe(&ticker, &row.pe)?;
        let flags = row
            .notes
            .as_deref()
            .map(Flag::parse_notes)
            .unwrap_or_default();

        let mut position = Position::new(ticker, row.price, pe_ratio, flags);
        if let Some(h) = held.get(position.ticker.as_str()) {
            validate_holding(h)?;
            position.held_amount = h.value;
            position.held_quantity = h.quantity;
        }
        positions.push(position);
    }

    let total: f64 = positions.iter().map(|p| p.held_amount).sum();
    if total > 0.0 {
        for p in &mut positions {
            p.held_percentage = round3(p.held_amount / total);
        }
    }

    log::debug!(
        "merged {} positions ({} held, ${total:.2} total)",
        positions.len(),
        positions.iter().filter(|p| p.held_quantity > 0).count()
    );

    Ok(Portfolio::new(positions))
}
