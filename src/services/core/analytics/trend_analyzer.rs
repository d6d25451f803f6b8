// src/services/core/analytics/trend_analyzer.rs

//! Trend & Anomaly Analyzer - least-squares trend over a position-indexed
//! series with outlier flagging.
//!
//! The regression uses the point's position as x. Irregular date gaps are
//! treated as evenly spaced; this is a known limitation kept for compatibility
//! with existing dashboards.

use super::statistics::{linear_regression, mean, population_std_dev};
use crate::types::{Anomaly, MetricSeries, TrendDirection, TrendReport};
use crate::utils::{all_finite, clamp, AnalyticsError, AnalyticsResult};
use serde::{Deserialize, Serialize};

/// Reference each point is compared against when scoring anomalies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyBaseline {
    /// Residuals against the series mean, scaled by the population
    /// standard deviation of the values.
    #[default]
    SeriesMean,
    /// Residuals against the fitted regression line, scaled by the
    /// population standard deviation of those residuals. A single large
    /// outlier near either end pulls the line toward itself and can hide.
    RegressionFit,
}

/// Trend Analyzer Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalyzerConfig {
    pub min_points: usize,
    /// Slopes with a smaller magnitude are `Stable`.
    pub stable_slope_epsilon: f64,
    pub anomaly_threshold_std_dev: f64,
    pub anomaly_baseline: AnomalyBaseline,
}

impl Default for TrendAnalyzerConfig {
    fn default() -> Self {
        Self {
            min_points: 3,
            stable_slope_epsilon: 0.01,
            anomaly_threshold_std_dev: 2.0,
            anomaly_baseline: AnomalyBaseline::SeriesMean,
        }
    }
}

impl TrendAnalyzerConfig {
    pub fn validate(&self) -> AnalyticsResult<()> {
        if self.min_points < 3 {
            return Err(AnalyticsError::configuration_error(
                "min_points must be at least 3",
            ));
        }
        if self.stable_slope_epsilon.is_nan() || self.stable_slope_epsilon < 0.0 {
            return Err(AnalyticsError::configuration_error(
                "stable_slope_epsilon must be non-negative",
            ));
        }
        if self.anomaly_threshold_std_dev.is_nan() || self.anomaly_threshold_std_dev <= 0.0 {
            return Err(AnalyticsError::configuration_error(
                "anomaly_threshold_std_dev must be greater than 0",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrendAnalyzer {
    config: TrendAnalyzerConfig,
}

impl TrendAnalyzer {
    pub fn new(config: TrendAnalyzerConfig) -> AnalyticsResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrendAnalyzerConfig {
        &self.config
    }

    pub fn analyze_series(&self, series: &MetricSeries) -> AnalyticsResult<TrendReport> {
        self.analyze(&series.values())
    }

    pub fn analyze(&self, values: &[f64]) -> AnalyticsResult<TrendReport> {
        if values.len() < self.config.min_points {
            return Err(AnalyticsError::insufficient_data(
                format!(
                    "Trend analysis needs at least {} points, found {}",
                    self.config.min_points,
                    values.len()
                ),
                self.config.min_points,
                values.len(),
            ));
        }
        if !all_finite(values) {
            return Err(AnalyticsError::degenerate_input(
                "Trend input contains non-finite values",
            ));
        }

        let fit = linear_regression(values)?;

        let direction = if fit.slope.abs() < self.config.stable_slope_epsilon {
            TrendDirection::Stable
        } else if fit.slope > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        };

        // A flat series has nothing to explain.
        let strength = fit.r_squared.map(|r2| clamp(r2.abs(), 0.0, 1.0)).unwrap_or(0.0);

        let anomalies = match self.config.anomaly_baseline {
            AnomalyBaseline::SeriesMean => {
                // values is non-empty here
                let expected = mean(values).unwrap_or(0.0);
                let deviations: Vec<f64> = values.iter().map(|v| v - expected).collect();
                let expected_values = vec![expected; values.len()];
                self.flag(values, &expected_values, &deviations)
            }
            AnomalyBaseline::RegressionFit => self.flag(values, &fit.fitted, &fit.residuals),
        };

        Ok(TrendReport {
            direction,
            strength,
            slope: fit.slope,
            intercept: fit.intercept,
            anomalies,
        })
    }

    fn flag(&self, actual: &[f64], expected: &[f64], residuals: &[f64]) -> Vec<Anomaly> {
        let sigma = population_std_dev(residuals).unwrap_or(0.0);
        if sigma == 0.0 {
            return Vec::new();
        }

        residuals
            .iter()
            .enumerate()
            .filter_map(|(index, residual)| {
                let deviation_score = residual.abs() / sigma;
                (deviation_score > self.config.anomaly_threshold_std_dev).then(|| Anomaly {
                    index,
                    expected: expected[index],
                    actual: actual[index],
                    deviation_score,
                })
            })
            .collect()
    }
}

/// Analyzes a series with the default configuration.
pub fn analyze_trend(values: &[f64]) -> AnalyticsResult<TrendReport> {
    TrendAnalyzer::default().analyze(values)
}
