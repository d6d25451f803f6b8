// src/services/core/analytics/statistics.rs

//! Statistical primitives shared by the aggregation, correlation and trend
//! components: growth and trend classification, descriptive statistics,
//! Pearson correlation, an approximate Student's t CDF and ordinary least
//! squares over a position-indexed series.

use crate::types::TrendDirection;
use crate::utils::{round_to_decimal_places, AnalyticsError, AnalyticsResult};

/// Growth above this percentage is `Increasing`, below its negation `Decreasing`.
pub const TREND_THRESHOLD_PERCENT: f64 = 5.0;

/// Percentage change from `previous` to `current`, rounded to one decimal.
///
/// A zero baseline yields `100` for positive growth, `-100` for negative
/// growth and `0` when both values are zero.
pub fn growth(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return if current > 0.0 {
            100.0
        } else if current < 0.0 {
            -100.0
        } else {
            0.0
        };
    }
    round_to_decimal_places(((current - previous) / previous) * 100.0, 1)
}

/// Maps a growth percentage onto a trend direction. The boundaries are stable.
pub fn classify(growth_percent: f64) -> TrendDirection {
    if growth_percent > TREND_THRESHOLD_PERCENT {
        TrendDirection::Increasing
    } else if growth_percent < -TREND_THRESHOLD_PERCENT {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by n).
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let avg = mean(values)?;
    let variance = values.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Pearson correlation of two equal-length slices.
///
/// Returns `Ok(None)` when either side has zero variance, leaving the
/// fallback to the caller.
#[allow(clippy::result_large_err)]
pub fn pearson(xs: &[f64], ys: &[f64]) -> AnalyticsResult<Option<f64>> {
    if xs.len() != ys.len() {
        return Err(AnalyticsError::validation_error(
            "Series must be the same length for correlation",
        ));
    }
    if xs.len() < 2 {
        return Err(AnalyticsError::insufficient_data(
            "Correlation requires at least 2 points",
            2,
            xs.len(),
        ));
    }

    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let covariance: f64 = xs
        .iter()
        .zip(ys.iter())
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    let sum_sq_x: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
    let sum_sq_y: f64 = ys.iter().map(|y| (y - mean_y).powi(2)).sum();

    let denominator = (sum_sq_x * sum_sq_y).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return Ok(None);
    }

    // Rounding can push |r| a hair past 1.
    Ok(Some((covariance / denominator).clamp(-1.0, 1.0)))
}

/// t statistic for a correlation coefficient over `n` pairs.
pub fn correlation_t_statistic(r: f64, n: usize) -> f64 {
    let df = n.saturating_sub(2) as f64;
    let denominator = 1.0 - r * r;
    if denominator <= 0.0 {
        return if r >= 0.0 { f64::INFINITY } else { f64::NEG_INFINITY };
    }
    r * (df / denominator).sqrt()
}

/// Error function, Abramowitz & Stegun 7.1.26 (|error| < 1.5e-7).
pub fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}

/// Standard normal CDF.
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Approximate Student's t CDF.
///
/// At or above `large_sample_df` degrees of freedom the t distribution is
/// treated as normal. Below it, t is mapped to an approximately normal
/// deviate with `z = t (1 - 1/(4 df)) / sqrt(1 + t^2 / (2 df))`.
pub fn student_t_cdf(t: f64, df: usize, large_sample_df: usize) -> f64 {
    if t.is_infinite() {
        return if t > 0.0 { 1.0 } else { 0.0 };
    }
    if df == 0 {
        return 0.5;
    }
    let v = df as f64;
    let z = if df >= large_sample_df {
        t
    } else {
        t * (1.0 - 1.0 / (4.0 * v)) / (1.0 + t * t / (2.0 * v)).sqrt()
    };
    normal_cdf(z)
}

/// Two-tailed p-value for a correlation coefficient over `n` pairs.
pub fn correlation_p_value(r: f64, n: usize, large_sample_df: usize) -> f64 {
    if n <= 2 {
        // Two points always fit a line exactly; no evidence either way.
        return 1.0;
    }
    let t = correlation_t_statistic(r, n);
    let p = 2.0 * (1.0 - student_t_cdf(t.abs(), n - 2, large_sample_df));
    p.clamp(0.0, 1.0)
}

/// Ordinary least squares of value against position.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// `None` when the series has no variance to explain.
    pub r_squared: Option<f64>,
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
}

/// Fits `value = intercept + slope * index`. Needs at least two points.
#[allow(clippy::result_large_err)]
pub fn linear_regression(values: &[f64]) -> AnalyticsResult<LinearFit> {
    if values.len() < 2 {
        return Err(AnalyticsError::insufficient_data(
            "Linear regression requires at least 2 points",
            2,
            values.len(),
        ));
    }

    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let fitted: Vec<f64> = (0..values.len())
        .map(|i| intercept + slope * i as f64)
        .collect();
    let residuals: Vec<f64> = values
        .iter()
        .zip(fitted.iter())
        .map(|(y, f)| y - f)
        .collect();

    let ss_res: f64 = residuals.iter().map(|r| r * r).sum();
    let ss_tot: f64 = values.iter().map(|y| (y - mean_y).powi(2)).sum();
    let r_squared = if ss_tot > 0.0 {
        Some(1.0 - ss_res / ss_tot)
    } else {
        None
    };

    Ok(LinearFit {
        slope,
        intercept,
        r_squared,
        fitted,
        residuals,
    })
}
