//! Performance metrics — pure functions over the valuation trace.
//!
//! Every metric is a pure function: value series (and dates) in, scalar out.
//! Degenerate inputs (too few points, zero variance, non-positive values)
//! give 0.0 rather than NaN.

use arblab_core::engine::ValuationTrace;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const DAYS_PER_YEAR: f64 = 365.25;

/// Aggregate performance metrics for a single simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub cagr: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    pub max_drawdown: f64,
    pub max_gross_exposure: f64,
    pub final_value: f64,
    pub trading_days: usize,
    /// Days on which a held position had no price.
    pub gap_days: usize,
}

impl PerformanceMetrics {
    /// Compute all metrics from a trace, with an annual risk-free rate.
    pub fn compute(trace: &ValuationTrace, risk_free_rate: f64) -> Self {
        let values = trace.values();
        let dates = trace.dates();
        Self {
            total_return: total_return(&values),
            cagr: cagr(&values, &dates),
            sharpe: sharpe_ratio(&values, risk_free_rate),
            sortino: sortino_ratio(&values, risk_free_rate),
            calmar: calmar_ratio(&values, &dates),
            max_drawdown: max_drawdown(&values),
            max_gross_exposure: max_gross_exposure(trace),
            final_value: trace.final_value().unwrap_or(0.0),
            trading_days: trace.len(),
            gap_days: trace.iter().filter(|r| !r.unpriced.is_empty()).count(),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(&initial), Some(&last)) if values.len() >= 2 && initial > 0.0 => {
            (last - initial) / initial
        }
        _ => 0.0,
    }
}

/// Compound annual growth rate over calendar time.
///
/// Years = days between the first and last date / 365.25.
pub fn cagr(values: &[f64], dates: &[NaiveDate]) -> f64 {
    let (Some(&initial), Some(&last)) = (values.first(), values.last()) else {
        return 0.0;
    };
    let (Some(&start), Some(&end)) = (dates.first(), dates.last()) else {
        return 0.0;
    };
    if initial <= 0.0 || last <= 0.0 {
        return 0.0;
    }
    let years = (end - start).num_days() as f64 / DAYS_PER_YEAR;
    if years <= 0.0 {
        return 0.0;
    }
    (last / initial).powf(1.0 / years) - 1.0
}

/// Annualized Sharpe ratio from daily returns.
///
/// Sharpe = mean(daily returns - rf) / std(daily returns - rf) * sqrt(252),
/// with the sample standard deviation.
pub fn sharpe_ratio(values: &[f64], risk_free_rate: f64) -> f64 {
    let excess = excess_returns(values, risk_free_rate);
    if excess.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&excess);
    if std < 1e-15 {
        return 0.0;
    }
    (mean_f64(&excess) / std) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Annualized Sortino ratio (downside deviation only).
pub fn sortino_ratio(values: &[f64], risk_free_rate: f64) -> f64 {
    let excess = excess_returns(values, risk_free_rate);
    if excess.len() < 2 {
        return 0.0;
    }
    let downside_sq: f64 = excess.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    let downside_std = (downside_sq / excess.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    (mean_f64(&excess) / downside_std) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Calmar ratio: CAGR / |max_drawdown|.
///
/// Returns 0.0 if max drawdown is zero or CAGR is non-positive.
pub fn calmar_ratio(values: &[f64], dates: &[NaiveDate]) -> f64 {
    let c = cagr(values, dates);
    let dd = max_drawdown(values);
    if dd >= 0.0 || c <= 0.0 {
        return 0.0;
    }
    c / dd.abs()
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
pub fn max_drawdown(values: &[f64]) -> f64 {
    let Some(&first) = values.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &v in values {
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            max_dd = max_dd.min((v - peak) / peak);
        }
    }
    max_dd
}

/// Largest Σ |quantity × price| seen on any day.
pub fn max_gross_exposure(trace: &ValuationTrace) -> f64 {
    trace
        .iter()
        .map(|r| r.gross_exposure)
        .fold(0.0_f64, f64::max)
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Day-over-day returns. A non-positive base value gives a 0.0 return.
pub fn daily_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

fn excess_returns(values: &[f64], risk_free_rate: f64) -> Vec<f64> {
    let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
    daily_returns(values).into_iter().map(|r| r - daily_rf).collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn total_return_basic() {
        assert_eq!(total_return(&[100.0, 110.0]), 0.1);
        assert_eq!(total_return(&[100.0]), 0.0);
        assert_eq!(total_return(&[]), 0.0);
        assert_eq!(total_return(&[0.0, 10.0]), 0.0);
    }

    #[test]
    fn cagr_uses_calendar_days() {
        let dates = [d("2020-01-01"), d("2022-01-01")];
        // 731 days ≈ 2.0014 years
        let c = cagr(&[100.0, 121.0], &dates);
        let expected = 1.21_f64.powf(365.25 / 731.0) - 1.0;
        assert!((c - expected).abs() < 1e-12);
        assert_eq!(cagr(&[100.0, 121.0], &[d("2020-01-01"), d("2020-01-01")]), 0.0);
        assert_eq!(cagr(&[100.0, -5.0], &dates), 0.0);
    }

    #[test]
    fn sharpe_constant_growth_is_zero_variance() {
        assert_eq!(sharpe_ratio(&[100.0, 100.0, 100.0], 0.0), 0.0);
        assert_eq!(sharpe_ratio(&[100.0, 101.0], 0.0), 0.0);
    }

    #[test]
    fn sharpe_sign_follows_mean_return() {
        let up = [100.0, 102.0, 101.0, 104.0, 103.0, 106.0];
        let down: Vec<f64> = up.iter().rev().copied().collect();
        assert!(sharpe_ratio(&up, 0.0) > 0.0);
        assert!(sharpe_ratio(&down, 0.0) < 0.0);
    }

    #[test]
    fn sortino_without_losses_is_zero() {
        assert_eq!(sortino_ratio(&[100.0, 101.0, 103.0], 0.0), 0.0);
        assert!(sortino_ratio(&[100.0, 105.0, 104.0, 110.0], 0.0) > 0.0);
    }

    #[test]
    fn drawdown_from_running_peak() {
        let dd = max_drawdown(&[100.0, 120.0, 90.0, 130.0, 117.0]);
        assert!((dd - (-0.25)).abs() < 1e-12);
        assert_eq!(max_drawdown(&[100.0, 101.0, 102.0]), 0.0);
    }

    #[test]
    fn calmar_positive_cagr_with_drawdown() {
        let values = [100.0, 120.0, 90.0, 150.0];
        let dates = [d("2020-01-01"), d("2020-06-01"), d("2021-01-01"), d("2021-01-01")];
        let c = calmar_ratio(&values, &dates);
        assert!((c - cagr(&values, &dates) / 0.25).abs() < 1e-12);
        assert_eq!(calmar_ratio(&[100.0, 110.0], &dates[..2]), 0.0);
    }

    #[test]
    fn daily_returns_basic() {
        let r = daily_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(r.len(), 2);
        assert!((r[0] - 0.1).abs() < 1e-12);
        assert!((r[1] + 0.1).abs() < 1e-12);
    }
}
