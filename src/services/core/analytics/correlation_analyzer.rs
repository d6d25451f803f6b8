// src/services/core/analytics/correlation_analyzer.rs

//! Correlation Analyzer - Pearson correlation and two-tailed significance
//! between metric series aligned by date.
//!
//! Only dates present in both series are compared. A zero-variance series
//! does not produce NaN: the result falls back to `coefficient = 0.0`,
//! `significance = 1.0` and is marked `degenerate`.

use super::statistics::{correlation_p_value, pearson};
use crate::types::{CorrelationResult, MetricSeries};
use crate::utils::{all_finite, AnalyticsError, AnalyticsResult, ErrorKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Correlation Analyzer Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationAnalyzerConfig {
    /// Fewest aligned pairs accepted. Never below 2.
    pub min_sample_size: usize,
    /// Degrees of freedom from which the t distribution is treated as normal.
    pub large_sample_threshold: usize,
}

impl Default for CorrelationAnalyzerConfig {
    fn default() -> Self {
        Self {
            min_sample_size: 2,
            large_sample_threshold: 30,
        }
    }
}

impl CorrelationAnalyzerConfig {
    pub fn validate(&self) -> AnalyticsResult<()> {
        if self.min_sample_size < 2 {
            return Err(AnalyticsError::configuration_error(
                "min_sample_size must be at least 2",
            ));
        }
        if self.large_sample_threshold == 0 {
            return Err(AnalyticsError::configuration_error(
                "large_sample_threshold must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Values of two series on the dates they share, in date order.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPairs {
    pub dates: Vec<NaiveDate>,
    pub left: Vec<f64>,
    pub right: Vec<f64>,
}

impl AlignedPairs {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Inner-joins two series on date. Same-date values within a series are summed.
pub fn align_by_date(series_a: &MetricSeries, series_b: &MetricSeries) -> AlignedPairs {
    let mut left_by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for point in &series_a.points {
        *left_by_date.entry(point.date).or_insert(0.0) += point.value;
    }
    let mut right_by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for point in &series_b.points {
        *right_by_date.entry(point.date).or_insert(0.0) += point.value;
    }

    let mut aligned = AlignedPairs {
        dates: Vec::new(),
        left: Vec::new(),
        right: Vec::new(),
    };
    for (date, left) in left_by_date {
        if let Some(right) = right_by_date.get(&date) {
            aligned.dates.push(date);
            aligned.left.push(left);
            aligned.right.push(*right);
        }
    }
    aligned
}

#[derive(Debug, Clone, Default)]
pub struct CorrelationAnalyzer {
    config: CorrelationAnalyzerConfig,
}

impl CorrelationAnalyzer {
    pub fn new(config: CorrelationAnalyzerConfig) -> AnalyticsResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CorrelationAnalyzerConfig {
        &self.config
    }

    /// Correlates two series over their shared dates.
    pub fn correlate(
        &self,
        series_a: &MetricSeries,
        series_b: &MetricSeries,
    ) -> AnalyticsResult<CorrelationResult> {
        let aligned = align_by_date(series_a, series_b);
        self.correlate_values(&aligned.left, &aligned.right)
    }

    /// Correlates already aligned values.
    pub fn correlate_values(
        &self,
        left: &[f64],
        right: &[f64],
    ) -> AnalyticsResult<CorrelationResult> {
        if left.len() != right.len() {
            return Err(AnalyticsError::validation_error(
                "Aligned series must be the same length",
            ));
        }
        let sample_size = left.len();
        if sample_size < self.config.min_sample_size {
            return Err(AnalyticsError::insufficient_data(
                format!(
                    "Correlation needs at least {} aligned points, found {}",
                    self.config.min_sample_size, sample_size
                ),
                self.config.min_sample_size,
                sample_size,
            ));
        }
        if !all_finite(left) || !all_finite(right) {
            return Err(AnalyticsError::degenerate_input(
                "Correlation input contains non-finite values",
            ));
        }

        match pearson(left, right)? {
            Some(coefficient) => Ok(CorrelationResult {
                coefficient,
                significance: correlation_p_value(
                    coefficient,
                    sample_size,
                    self.config.large_sample_threshold,
                ),
                sample_size,
                degenerate: false,
            }),
            None => Ok(CorrelationResult {
                coefficient: 0.0,
                significance: 1.0,
                sample_size,
                degenerate: true,
            }),
        }
    }
}

/// Correlates two series with the default configuration.
pub fn correlate(
    series_a: &MetricSeries,
    series_b: &MetricSeries,
) -> AnalyticsResult<CorrelationResult> {
    CorrelationAnalyzer::default().correlate(series_a, series_b)
}

/// One cell of a correlation matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationEntry {
    pub left: String,
    pub right: String,
    pub result: Option<CorrelationResult>,
    /// Set when the pair could not be computed.
    pub error: Option<ErrorKind>,
}

/// Pairwise correlations across a set of named series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub metrics: Vec<String>,
    pub entries: Vec<CorrelationEntry>,
}

impl CorrelationMatrix {
    /// Looks a pair up in either order.
    pub fn get(&self, a: &str, b: &str) -> Option<&CorrelationEntry> {
        self.entries
            .iter()
            .find(|e| (e.left == a && e.right == b) || (e.left == b && e.right == a))
    }

    /// Computed pairs whose |r| is at least `threshold`, strongest first.
    pub fn strongest(&self, threshold: f64) -> Vec<&CorrelationEntry> {
        let mut strong: Vec<&CorrelationEntry> = self
            .entries
            .iter()
            .filter(|e| {
                e.result
                    .map(|r| !r.degenerate && r.coefficient.abs() >= threshold)
                    .unwrap_or(false)
            })
            .collect();
        strong.sort_by(|a, b| {
            let ra = a.result.map(|r| r.coefficient.abs()).unwrap_or(0.0);
            let rb = b.result.map(|r| r.coefficient.abs()).unwrap_or(0.0);
            rb.total_cmp(&ra)
        });
        strong
    }
}

impl CorrelationAnalyzer {
    /// Correlates every unordered pair. Pairs that fail are kept with their
    /// error kind so one sparse metric does not sink the matrix.
    pub fn correlation_matrix(&self, series: &[(String, MetricSeries)]) -> CorrelationMatrix {
        let mut entries = Vec::new();
        for i in 0..series.len() {
            for j in (i + 1)..series.len() {
                let (left_name, left) = &series[i];
                let (right_name, right) = &series[j];
                let (result, error) = match self.correlate(left, right) {
                    Ok(result) => (Some(result), None),
                    Err(e) => (None, Some(e.kind)),
                };
                entries.push(CorrelationEntry {
                    left: left_name.clone(),
                    right: right_name.clone(),
                    result,
                    error,
                });
            }
        }
        CorrelationMatrix {
            metrics: series.iter().map(|(name, _)| name.clone()).collect(),
            entries,
        }
    }
}
