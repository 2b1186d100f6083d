//! CSV loading for prices, orders and deals.
//!
//! Column names are matched case-insensitively, and a few historical
//! aliases are accepted (`deal_index`, `event_id` or `ticker` for the
//! identifier, `prc` for the price, `price_type` for the leg). Any row that
//! cannot be parsed fails the whole load with its file and line, before a
//! simulation ever starts.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use arblab_core::domain::{InstrumentKey, KeyShape, Leg, Order, PriceRecord};
use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::deals::{parse_date, Deal};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: missing required column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("{}:{line}: {reason}", path.display())]
    Malformed {
        path: PathBuf,
        line: u64,
        reason: String,
    },
}

const ID_COLUMNS: [&str; 4] = ["deal_id", "deal_index", "event_id", "ticker"];
const PRICE_COLUMNS: [&str; 2] = ["price", "prc"];
const LEG_COLUMNS: [&str; 2] = ["leg", "price_type"];

/// Header positions resolved once per file.
struct Columns {
    date: usize,
    id: usize,
    value: usize,
    leg: Option<usize>,
}

impl Columns {
    fn resolve(
        headers: &csv::StringRecord,
        path: &Path,
        value_names: &[&str],
    ) -> Result<Self, LoadError> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };
        let require = |names: &[&str]| {
            find(names).ok_or_else(|| LoadError::MissingColumn {
                path: path.to_path_buf(),
                column: names[0].to_string(),
            })
        };
        Ok(Self {
            date: require(&["date"][..])?,
            id: require(&ID_COLUMNS[..])?,
            value: require(value_names)?,
            leg: find(&LEG_COLUMNS[..]),
        })
    }
}

/// One parsed row, before the value column is interpreted.
struct Row<'r> {
    line: u64,
    date: NaiveDate,
    key: InstrumentKey,
    value: &'r str,
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input)
}

fn malformed(path: &Path, line: u64, reason: impl Into<String>) -> LoadError {
    LoadError::Malformed {
        path: path.to_path_buf(),
        line,
        reason: reason.into(),
    }
}

/// Walk the rows of a date/id/value file, building keys of `shape`.
fn read_keyed_rows<R, F>(
    input: R,
    path: &Path,
    shape: KeyShape,
    value_names: &[&str],
    mut on_row: F,
) -> Result<(), LoadError>
where
    R: Read,
    F: FnMut(Row<'_>) -> Result<(), LoadError>,
{
    let mut rdr = reader(input);
    let headers = rdr
        .headers()
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    let cols = Columns::resolve(&headers, path, value_names)?;

    if shape == KeyShape::Composite && cols.leg.is_none() {
        return Err(LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: "leg".into(),
        });
    }
    if shape == KeyShape::Single && cols.leg.is_some() {
        warn!(
            path = %path.display(),
            "leg column present but keys are single; legs of one id will share a key"
        );
    }

    for result in rdr.records() {
        let record = result.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let line = record.position().map_or(0, |p| p.line());
        let field = |idx: usize, name: &str| {
            record
                .get(idx)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| malformed(path, line, format!("missing {name}")))
        };

        let raw_date = field(cols.date, "date")?;
        let date = parse_date(raw_date)
            .ok_or_else(|| malformed(path, line, format!("unparseable date '{raw_date}'")))?;
        let id = field(cols.id, "identifier")?;
        let leg = match cols.leg {
            Some(idx) => record
                .get(idx)
                .filter(|s| !s.is_empty())
                .map(|raw| raw.parse::<Leg>())
                .transpose()
                .map_err(|e| malformed(path, line, e.to_string()))?,
            None => None,
        };
        let key = shape
            .key(id, leg)
            .ok_or_else(|| malformed(path, line, format!("missing leg for composite key '{id}'")))?;
        let value = field(cols.value, value_names[0])?;

        on_row(Row {
            line,
            date,
            key,
            value,
        })?;
    }
    Ok(())
}

/// Read price records from any CSV source. `path` is used only in errors.
pub fn read_prices<R: Read>(
    input: R,
    path: &Path,
    shape: KeyShape,
) -> Result<Vec<PriceRecord>, LoadError> {
    let mut records = Vec::new();
    read_keyed_rows(input, path, shape, &PRICE_COLUMNS[..], |row| {
        let price: f64 = row
            .value
            .parse()
            .map_err(|_| malformed(path, row.line, format!("unparseable price '{}'", row.value)))?;
        records.push(PriceRecord::new(row.date, row.key, price));
        Ok(())
    })?;
    debug!(path = %path.display(), rows = records.len(), "prices loaded");
    Ok(records)
}

pub fn load_prices(path: &Path, shape: KeyShape) -> Result<Vec<PriceRecord>, LoadError> {
    read_prices(open(path)?, path, shape)
}

/// Read orders from any CSV source. Share counts must be whole numbers;
/// `"100.0"` is accepted, `"100.5"` is not.
pub fn read_orders<R: Read>(
    input: R,
    path: &Path,
    shape: KeyShape,
) -> Result<Vec<Order>, LoadError> {
    let mut orders = Vec::new();
    read_keyed_rows(input, path, shape, &["shares"][..], |row| {
        let quantity = parse_shares(row.value).ok_or_else(|| {
            malformed(path, row.line, format!("unparseable shares '{}'", row.value))
        })?;
        orders.push(Order::new(row.date, row.key, quantity));
        Ok(())
    })?;
    debug!(path = %path.display(), rows = orders.len(), "orders loaded");
    Ok(orders)
}

pub fn load_orders(path: &Path, shape: KeyShape) -> Result<Vec<Order>, LoadError> {
    read_orders(open(path)?, path, shape)
}

fn parse_shares(raw: &str) -> Option<i64> {
    if let Ok(q) = raw.parse::<i64>() {
        return Some(q);
    }
    let f: f64 = raw.parse().ok()?;
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

/// Deal sheet row as it appears on disk.
#[derive(Debug, Deserialize)]
struct DealRow {
    deal_id: String,
    #[serde(rename = "Announce Date", default)]
    announce_date: Option<String>,
    #[serde(rename = "Completion/Termination Date", default)]
    completion_date: Option<String>,
    #[serde(rename = "Amendment Date", default)]
    amendment_date: Option<String>,
    #[serde(rename = "Payment Type", default)]
    payment_type: Option<String>,
    #[serde(rename = "Deal Type", default)]
    deal_type: Option<String>,
    #[serde(rename = "Cash Terms", default)]
    cash_terms: Option<String>,
    #[serde(rename = "Arb Spread (Gross)", default)]
    arb_spread: Option<String>,
    #[serde(rename = "Target Ticker", default)]
    target_ticker: Option<String>,
}

impl From<DealRow> for Deal {
    fn from(row: DealRow) -> Self {
        let non_empty = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
        Deal {
            deal_id: row.deal_id,
            announce_date: row.announce_date.as_deref().and_then(parse_date),
            completion_date: row.completion_date.as_deref().and_then(parse_date),
            amendment_date: row.amendment_date.as_deref().and_then(parse_date),
            payment_type: row.payment_type.unwrap_or_default(),
            deal_type: row.deal_type.unwrap_or_default(),
            cash_terms: non_empty(row.cash_terms),
            arb_spread: non_empty(row.arb_spread),
            target_ticker: non_empty(row.target_ticker),
        }
    }
}

/// Read the deal sheet. Unparseable dates become `None`; a row without a
/// `deal_id` is malformed.
pub fn read_deals<R: Read>(input: R, path: &Path) -> Result<Vec<Deal>, LoadError> {
    let mut rdr = reader(input);
    let mut deals = Vec::new();
    for result in rdr.deserialize::<DealRow>() {
        let row = result.map_err(|source| match source.position() {
            Some(pos) => malformed(path, pos.line(), source.to_string()),
            None => LoadError::Csv {
                path: path.to_path_buf(),
                source,
            },
        })?;
        deals.push(Deal::from(row));
    }
    let undated = deals.iter().filter(|d| d.announce_date.is_none()).count();
    if undated > 0 {
        warn!(path = %path.display(), undated, "deals without a parseable announce date");
    }
    debug!(path = %path.display(), rows = deals.len(), "deals loaded");
    Ok(deals)
}

pub fn load_deals(path: &Path) -> Result<Vec<Deal>, LoadError> {
    read_deals(open(path)?, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p() -> &'static Path {
        Path::new("test.csv")
    }

    #[test]
    fn prices_with_aliases() {
        let csv = "Date,deal_index,PRC\n2024-01-02,7,10.5\n2024-01-03 00:00:00,7,11\n";
        let records = read_prices(csv.as_bytes(), p(), KeyShape::Single).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, InstrumentKey::single("7"));
        assert_eq!(records[1].price, 11.0);
        assert_eq!(records[1].date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    }

    #[test]
    fn composite_prices_need_leg() {
        let csv = "date,deal_id,price,leg\n2024-01-02,1,10,target\n2024-01-02,1,20,acquirer\n";
        let records = read_prices(csv.as_bytes(), p(), KeyShape::Composite).unwrap();
        assert_eq!(records[1].key, InstrumentKey::composite("1", Leg::Acquirer));

        let no_leg = "date,deal_id,price\n2024-01-02,1,10\n";
        let err = read_prices(no_leg.as_bytes(), p(), KeyShape::Composite).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { ref column, .. } if column == "leg"));

        let blank_leg = "date,deal_id,price,leg\n2024-01-02,1,10,\n";
        let err = read_prices(blank_leg.as_bytes(), p(), KeyShape::Composite).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { line: 2, .. }));
    }

    #[test]
    fn malformed_rows_report_line() {
        let csv = "date,deal_id,price\n2024-01-02,1,10\n2024-01-03,1,abc\n";
        let err = read_prices(csv.as_bytes(), p(), KeyShape::Single).unwrap_err();
        match err {
            LoadError::Malformed { line, reason, .. } => {
                assert_eq!(line, 3);
                assert!(reason.contains("abc"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let bad_date = "date,deal_id,price\nyesterday,1,10\n";
        let err = read_prices(bad_date.as_bytes(), p(), KeyShape::Single).unwrap_err();
        assert!(err.to_string().starts_with("test.csv:2:"));
    }

    #[test]
    fn orders_accept_whole_floats_only() {
        let csv = "date,event_id,shares\n2024-01-02,AAPL,100\n2024-01-04,AAPL,-100.0\n";
        let orders = read_orders(csv.as_bytes(), p(), KeyShape::Single).unwrap();
        assert_eq!(orders[1].quantity, -100);

        let frac = "date,event_id,shares\n2024-01-02,AAPL,1.5\n";
        assert!(read_orders(frac.as_bytes(), p(), KeyShape::Single).is_err());
    }

    #[test]
    fn missing_identifier_column() {
        let csv = "date,symbol,price\n2024-01-02,X,1\n";
        let err = read_prices(csv.as_bytes(), p(), KeyShape::Single).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { ref column, .. } if column == "deal_id"));
    }

    #[test]
    fn deals_coerce_bad_dates() {
        let csv = "deal_id,Announce Date,Completion/Termination Date,Payment Type,Deal Type,Cash Terms,Arb Spread (Gross)\n\
                   1,2023-10-10,05/02/2024,Cash,M&A,157.0000/sh.,4.25%\n\
                   2,n/a,,Stock,M&A,,\n";
        let deals = read_deals(csv.as_bytes(), p()).unwrap();
        assert_eq!(deals.len(), 2);
        assert_eq!(deals[0].completion_date, NaiveDate::from_ymd_opt(2024, 5, 2));
        assert_eq!(deals[0].cash_terms.as_deref(), Some("157.0000/sh."));
        assert_eq!(deals[1].announce_date, None);
        assert_eq!(deals[1].cash_terms, None);
        assert!(deals[1].is_stock());
    }
}
