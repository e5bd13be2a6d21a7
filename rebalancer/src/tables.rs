//! CSV ingestion for the reference and holdings tables.
//!
//! Headers are matched by name and any extra columns are ignored. Money
//! cells may carry a `$` sign and thousands separators. Holdings rows for
//! symbols outside the reference table (cash lines, totals) are skipped
//! without being parsed.

use std::path::Path;

use rustc_hash::FxHashSet;
use serde::Deserialize;
use shadowfolio::merge::strip_ticker;
use shadowfolio::{HoldingRow, MetadataRow};

use crate::error::{Error, Result};

/// One row of the reference table as it appears on disk.
#[derive(Debug, Deserialize)]
struct ReferenceRecord {
    #[serde(rename = "Ticker")]
    ticker: String,
    #[serde(rename = "CurrentPrice($)")]
    price: String,
    #[serde(rename = "Price-EarningsRatio(X)")]
    pe: String,
    #[serde(rename = "Notes", default)]
    notes: Option<String>,
}

/// One row of the holdings table as it appears on disk.
#[derive(Debug, Deserialize)]
struct HoldingRecord {
    #[serde(rename = "Symbol")]
    symbol: String,
    #[serde(rename = "Value $")]
    value: String,
    #[serde(rename = "Quantity")]
    quantity: String,
}

/// Parse a dollar cell such as `$1,234.50`.
pub fn parse_money(cell: &str) -> std::result::Result<f64, String> {
    let cleaned: String = cell
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    cleaned
        .parse::<f64>()
        .map_err(|_| format!("'{cell}' is not a dollar amount"))
}

/// Parse a share count. Whole-valued decimals like `10.0` are accepted.
pub fn parse_quantity(cell: &str) -> std::result::Result<i64, String> {
    let cleaned: String = cell.trim().chars().filter(|&c| c != ',').collect();
    if let Ok(qty) = cleaned.parse::<i64>() {
        return Ok(qty);
    }
    match cleaned.parse::<f64>() {
        Ok(qty) if qty.is_finite() && qty.fract() == 0.0 => Ok(qty as i64),
        _ => Err(format!("'{cell}' is not a whole share count")),
    }
}

fn read_records<T>(path: &Path) -> Result<Vec<(usize, T)>>
where
    T: for<'de> Deserialize<'de>,
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(|source| Error::TableRead {
            path: path.to_path_buf(),
            source,
        })?;

    let mut records = Vec::new();
    for (i, record) in reader.deserialize().enumerate() {
        let row = i + 1;
        let record: T = record.map_err(|e| Error::TableRow {
            path: path.to_path_buf(),
            row,
            message: e.to_string(),
        })?;
        records.push((row, record));
    }
    Ok(records)
}

fn row_error(path: &Path, row: usize) -> impl Fn(String) -> Error + '_ {
    move |message| Error::TableRow {
        path: path.to_path_buf(),
        row,
        message,
    }
}

/// Read the reference table (ticker, price, PE, notes).
pub fn read_reference(path: &Path) -> Result<Vec<MetadataRow>> {
    let records: Vec<(usize, ReferenceRecord)> = read_records(path)?;
    let mut rows = Vec::with_capacity(records.len());
    for (row, record) in records {
        let price = parse_money(&record.price).map_err(row_error(path, row))?;
        rows.push(MetadataRow {
            ticker: record.ticker,
            price,
            pe: record.pe,
            notes: record.notes.filter(|n| !n.trim().is_empty()),
        });
    }
    log::info!("read {} reference rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Read the holdings table (symbol, value, quantity), keeping only the
/// rows whose symbol appears in `reference`.
pub fn read_holdings(path: &Path, reference: &[MetadataRow]) -> Result<Vec<HoldingRow>> {
    let wanted: FxHashSet<String> = reference.iter().map(|r| strip_ticker(&r.ticker)).collect();
    let records: Vec<(usize, HoldingRecord)> = read_records(path)?;
    let mut rows = Vec::with_capacity(records.len());
    for (row, record) in records {
        if !wanted.contains(record.symbol.trim()) {
            log::debug!("{}, row {row}: skipping unreferenced '{}'", path.display(), record.symbol);
            continue;
        }
        let value = parse_money(&record.value).map_err(row_error(path, row))?;
        let quantity = parse_quantity(&record.quantity).map_err(row_error(path, row))?;
        rows.push(HoldingRow {
            symbol: record.symbol,
            value,
            quantity,
        });
    }
    log::info!("read {} holdings rows from {}", rows.len(), path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn reference(tickers: &[&str]) -> Vec<MetadataRow> {
        tickers
            .iter()
            .map(|t| MetadataRow {
                ticker: t.to_string(),
                price: 10.0,
                pe: "5".into(),
                notes: None,
            })
            .collect()
    }

    #[test]
    fn money_cells() {
        assert_eq!(parse_money("$1,234.50"), Ok(1234.5));
        assert_eq!(parse_money(" 12 "), Ok(12.0));
        assert!(parse_money("n/a").is_err());
    }

    #[test]
    fn quantity_cells() {
        assert_eq!(parse_quantity("10"), Ok(10));
        assert_eq!(parse_quantity("1,200.0"), Ok(1200));
        assert!(parse_quantity("2.5").is_err());
    }

    #[test]
    fn reads_reference_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "reference.csv",
            "Ticker,Company,CurrentPrice($),Price-EarningsRatio(X),Notes\n\
             AAA*,Alpha,$10.00,5.2,\n\
             BBB,Beta,\"$1,020.00\",nmf,Earnings probation\n",
        );

        let rows = read_reference(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ticker, "AAA*");
        assert_eq!(rows[0].price, 10.0);
        assert_eq!(rows[0].notes, None);
        assert_eq!(rows[1].price, 1020.0);
        assert_eq!(rows[1].pe, "nmf");
        assert_eq!(rows[1].notes.as_deref(), Some("Earnings probation"));
    }

    #[test]
    fn notes_column_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "reference.csv",
            "Ticker,CurrentPrice($),Price-EarningsRatio(X)\nAAA,10,5\n",
        );
        let rows = read_reference(&path).unwrap();
        assert_eq!(rows[0].notes, None);
    }

    #[test]
    fn reads_holdings_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "holdings.csv",
            "Symbol,Description,Quantity,Value $\nAAA,Alpha,10,$100.00\nBBB,Beta,5,\"$5,100\"\n",
        );

        let rows = read_holdings(&path, &reference(&["AAA", "BBB*"])).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].symbol, "AAA");
        assert_eq!(rows[0].quantity, 10);
        assert_eq!(rows[1].value, 5100.0);
    }

    #[test]
    fn bad_cell_reports_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "holdings.csv",
            "Symbol,Value $,Quantity\nAAA,100,10\nBBB,lots,5\n",
        );

        match read_holdings(&path, &reference(&["AAA", "BBB"])) {
            Err(Error::TableRow { row, message, .. }) => {
                assert_eq!(row, 2);
                assert!(message.contains("lots"));
            }
            other => panic!("expected TableRow error, got {other:?}"),
        }
    }

    #[test]
    fn unreferenced_holdings_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "holdings.csv",
            "Symbol,Value $,Quantity\nAAA,$100.00,10\nCash,$500,--\nTotal,n/a,\n",
        );

        let rows = read_holdings(&path, &reference(&["AAA"])).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "AAA");
        assert_eq!(rows[0].value, 100.0);
    }

    #[test]
    fn missing_column_reports_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "reference.csv", "Ticker,Notes\nAAA,\n");
        assert!(matches!(
            read_reference(&path),
            Err(Error::TableRow { row: 1, .. })
        ));
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_reference(&dir.path().join("nope.csv")),
            Err(Error::TableRead { .. })
        ));
    }
}
