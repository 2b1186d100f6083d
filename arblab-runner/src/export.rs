//! Reporting and export — JSON, CSV, and HTML artifact generation.
//!
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: valuation trace, order schedule and fill log
//! - **HTML**: summary metrics plus the daily valuation table
//!
//! Unknown schema versions are rejected on load.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use arblab_core::domain::{Fill, Order};
use arblab_core::engine::ValuationTrace;

use crate::config::ExportFormat;
use crate::runner::{BacktestResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

fn finish_csv(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Holdings as `key=quantity` pairs joined by `;`, in key order.
fn format_holdings(record: &arblab_core::engine::ValuationRecord) -> String {
    record
        .holdings
        .iter()
        .map(|(key, qty)| format!("{key}={qty}"))
        .collect::<Vec<_>>()
        .join(";")
}

/// Columns: date, value, invested_capital, cash, holdings
pub fn export_trace_csv(trace: &ValuationTrace) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "value", "invested_capital", "cash", "holdings"])?;
    for r in trace {
        wtr.write_record([
            r.date.to_string(),
            r.value.to_string(),
            r.invested_capital.to_string(),
            r.cash.to_string(),
            format_holdings(r),
        ])?;
    }
    finish_csv(wtr)
}

/// Columns: date, deal_id, shares, plus leg when any order has a composite
/// key. Readable by the order loader.
pub fn export_orders_csv(orders: &[Order]) -> Result<String> {
    let with_leg = orders.iter().any(|o| o.key.leg().is_some());
    let mut wtr = csv::Writer::from_writer(vec![]);
    if with_leg {
        wtr.write_record(["date", "deal_id", "leg", "shares"])?;
    } else {
        wtr.write_record(["date", "deal_id", "shares"])?;
    }
    for o in orders {
        let mut row = vec![o.date.to_string(), o.key.id().to_string()];
        if with_leg {
            row.push(o.key.leg().map(|l| l.to_string()).unwrap_or_default());
        }
        row.push(o.quantity.to_string());
        wtr.write_record(&row)?;
    }
    finish_csv(wtr)
}

/// Columns: date, key, quantity, price, notional, position_after, cash_after
pub fn export_fills_csv(fills: &[Fill]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "key",
        "quantity",
        "price",
        "notional",
        "position_after",
        "cash_after",
    ])?;
    for f in fills {
        wtr.write_record([
            f.date.to_string(),
            f.key.to_string(),
            f.quantity.to_string(),
            f.price.to_string(),
            f.notional.to_string(),
            f.position_after.to_string(),
            f.cash_after.to_string(),
        ])?;
    }
    finish_csv(wtr)
}

/// Write an order schedule to `path`.
pub fn write_orders_csv(orders: &[Order], path: &Path) -> Result<()> {
    let csv = export_orders_csv(orders)?;
    std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
}

// ─── HTML report ────────────────────────────────────────────────────

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Generate a standalone HTML report for a single run.
pub fn generate_html_report(result: &BacktestResult) -> String {
    let m = &result.metrics;
    let mut html = String::with_capacity(4096 + result.trace.len() * 160);

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Portfolio Report</title>\n");
    html.push_str("<style>table{border-collapse:collapse}td,th{border:1px solid #ccc;padding:2px 8px;text-align:right}</style>\n");
    html.push_str("</head>\n<body>\n<h1>Portfolio Report</h1>\n");

    // Summary
    html.push_str("<h2>Summary</h2>\n<table>\n");
    let period = match (result.start_date, result.end_date) {
        (Some(s), Some(e)) => format!("{s} to {e}"),
        _ => "empty".to_string(),
    };
    let rows = [
        ("Run", escape_html(&result.run_id.to_string())),
        ("Source", result.source_label().to_string()),
        ("Period", period),
        ("Initial Capital", format!("{:.2}", result.params.initial_capital)),
        ("Final Value", format!("{:.2}", m.final_value)),
        ("Total Return", format!("{:.2}%", m.total_return * 100.0)),
        ("CAGR", format!("{:.2}%", m.cagr * 100.0)),
        ("Sharpe", format!("{:.3}", m.sharpe)),
        ("Sortino", format!("{:.3}", m.sortino)),
        ("Calmar", format!("{:.3}", m.calmar)),
        ("Max Drawdown", format!("{:.2}%", m.max_drawdown * 100.0)),
        ("Max Gross Exposure", format!("{:.2}", m.max_gross_exposure)),
        ("Orders", result.orders.len().to_string()),
        ("Days With Price Gaps", m.gap_days.to_string()),
    ];
    for (label, value) in rows {
        let _ = writeln!(html, "<tr><th>{label}</th><td>{value}</td></tr>");
    }
    html.push_str("</table>\n");

    // Daily table
    html.push_str("<h2>Daily Valuation</h2>\n<table>\n");
    html.push_str("<tr><th>Date</th><th>Value</th><th>Invested</th><th>Cash</th><th>Holdings</th></tr>\n");
    for r in &result.trace {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{}</td></tr>",
            r.date,
            r.value,
            r.invested_capital,
            r.cash,
            escape_html(&format_holdings(r)),
        );
    }
    html.push_str("</table>\n</body>\n</html>\n");
    html
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the requested artifacts for a single run.
///
/// Creates `{output_dir}/{run_id prefix}/` containing, per format:
/// - csv: `trace.csv`, `orders.csv`, and `fills.csv` when fills were recorded
/// - json: `result.json`
/// - html: `report.html`
///
/// Returns the path to the created directory.
pub fn save_artifacts(
    result: &BacktestResult,
    output_dir: &Path,
    formats: &[ExportFormat],
) -> Result<PathBuf> {
    let id = result.run_id.to_string();
    let run_dir = output_dir.join(&id[..id.len().min(16)]);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let write = |name: &str, content: String| -> Result<()> {
        let path = run_dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))
    };

    for format in formats {
        match format {
            ExportFormat::Csv => {
                write("trace.csv", export_trace_csv(&result.trace)?)?;
                write("orders.csv", export_orders_csv(&result.orders)?)?;
                if !result.fills.is_empty() {
                    write("fills.csv", export_fills_csv(&result.fills)?)?;
                }
            }
            ExportFormat::Json => write("result.json", export_json(result)?)?,
            ExportFormat::Html => write("report.html", generate_html_report(result))?,
        }
    }

    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's result.json.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
