// src/services/core/analytics/metrics_aggregator.rs

//! Metrics Aggregator - turns flat metric observations into the revenue,
//! orders and customers summaries shown on executive dashboards, plus the
//! per-metric date series consumed by correlation and trend analysis.
//!
//! Observations are narrowed to the requested categories and granularity,
//! then to the requested window. An empty window widens to every date
//! available for those categories so dashboards do not go blank; if that is
//! still empty the outcome is zeroed and flagged `Unavailable`.
//!
//! Growth compares the latest dated value with the one before it, not two
//! full windows. Callers must not read it as a rolling-window figure.

use super::statistics::{classify, growth};
use crate::types::{
    AggregatedMetricSummary, AggregationLevel, DateRange, MetricCategory, MetricObservation,
    MetricSeries, SeriesPoint,
};
use crate::utils::{logger::Logger, AnalyticsError, AnalyticsResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const REVENUE_METRIC: &str = "total_revenue";
pub const ORDERS_METRIC: &str = "total_orders";
pub const CUSTOMERS_METRIC: &str = "total_customers";

/// Metrics Aggregator Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsAggregatorConfig {
    pub revenue_metric: String,
    pub orders_metric: String,
    pub customers_metric: String,
    /// Fall back to all dates when nothing lands inside the requested window.
    pub widen_empty_window: bool,
}

impl Default for MetricsAggregatorConfig {
    fn default() -> Self {
        Self {
            revenue_metric: REVENUE_METRIC.to_string(),
            orders_metric: ORDERS_METRIC.to_string(),
            customers_metric: CUSTOMERS_METRIC.to_string(),
            widen_empty_window: true,
        }
    }
}

impl MetricsAggregatorConfig {
    pub fn validate(&self) -> AnalyticsResult<()> {
        for (field, value) in [
            ("revenue_metric", &self.revenue_metric),
            ("orders_metric", &self.orders_metric),
            ("customers_metric", &self.customers_metric),
        ] {
            if value.trim().is_empty() {
                return Err(AnalyticsError::configuration_error(format!(
                    "{} must not be empty",
                    field
                )));
            }
        }
        Ok(())
    }
}

/// What to aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationRequest {
    pub categories: Vec<MetricCategory>,
    pub granularity: AggregationLevel,
    pub range: DateRange,
}

impl AggregationRequest {
    pub fn new(
        categories: Vec<MetricCategory>,
        granularity: AggregationLevel,
        range: DateRange,
    ) -> Self {
        Self {
            categories,
            granularity,
            range,
        }
    }

    pub fn validate(&self) -> AnalyticsResult<()> {
        if self.categories.is_empty() {
            return Err(AnalyticsError::validation_error(
                "At least one category is required",
            ));
        }
        if !self.range.is_valid() {
            return Err(crate::analytics_error!(
                crate::utils::ErrorKind::ValidationError,
                "Start date must not be after end date",
                "start" => self.range.start.to_string(),
                "end" => self.range.end.to_string()
            )
            .with_status(400)
            .with_code("VALIDATION_ERROR"));
        }
        Ok(())
    }
}

/// Where the aggregated numbers came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Observations inside the requested window.
    InRange,
    /// Nothing inside the window; every available date was used.
    Widened,
    /// Nothing usable; the caller should try an alternative source.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationOutcome {
    pub revenue: AggregatedMetricSummary,
    pub orders: AggregatedMetricSummary,
    pub customers: AggregatedMetricSummary,
    pub per_metric_series: BTreeMap<String, MetricSeries>,
    pub source: DataSource,
    pub observations_used: usize,
}

impl AggregationOutcome {
    pub fn zeroed(source: DataSource) -> Self {
        Self {
            revenue: AggregatedMetricSummary::zeroed(),
            orders: AggregatedMetricSummary::zeroed(),
            customers: AggregatedMetricSummary::zeroed(),
            per_metric_series: BTreeMap::new(),
            source,
            observations_used: 0,
        }
    }

    pub fn needs_alternative_source(&self) -> bool {
        self.source == DataSource::Unavailable
    }

    pub fn series(&self, metric: &str) -> Option<&MetricSeries> {
        self.per_metric_series.get(metric)
    }
}

/// Metrics Aggregator for executive dashboards
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    config: MetricsAggregatorConfig,
    logger: Logger,
}

impl MetricsAggregator {
    pub fn new(config: MetricsAggregatorConfig) -> AnalyticsResult<Self> {
        config.validate()?;

        let logger = crate::utils::logger::logger().for_component("metrics_aggregator");

        Ok(Self { config, logger })
    }

    pub fn config(&self) -> &MetricsAggregatorConfig {
        &self.config
    }

    /// Aggregates observations for the request. Empty input yields zeroed
    /// summaries; only a malformed request is an error.
    pub fn aggregate(
        &self,
        observations: &[MetricObservation],
        request: &AggregationRequest,
    ) -> AnalyticsResult<AggregationOutcome> {
        request.validate()?;

        let selected: Vec<&MetricObservation> = observations
            .iter()
            .filter(|o| request.categories.contains(&o.category))
            .filter(|o| o.aggregation_level == request.granularity)
            .collect();

        let in_range: Vec<&MetricObservation> = selected
            .iter()
            .copied()
            .filter(|o| request.range.contains(o.date))
            .collect();

        let (used, source) = if !in_range.is_empty() {
            (in_range, DataSource::InRange)
        } else if self.config.widen_empty_window && !selected.is_empty() {
            self.logger.warn_with_meta(
                "No observations inside requested window, widening to all dates",
                Some(&serde_json::json!({
                    "start": request.range.start.to_string(),
                    "end": request.range.end.to_string(),
                    "available": selected.len(),
                })),
            );
            (selected, DataSource::Widened)
        } else {
            self.logger.warn_with_meta(
                "No observations available for requested categories",
                Some(&serde_json::json!({
                    "granularity": request.granularity.as_str(),
                    "categories": request.categories.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
                })),
            );
            return Ok(AggregationOutcome::zeroed(DataSource::Unavailable));
        };

        let per_metric_series = build_series(&used);

        let outcome = AggregationOutcome {
            revenue: summarize(per_metric_series.get(&self.config.revenue_metric)),
            orders: summarize(per_metric_series.get(&self.config.orders_metric)),
            customers: summarize(per_metric_series.get(&self.config.customers_metric)),
            observations_used: used.len(),
            per_metric_series,
            source,
        };

        self.logger.debug_with_meta(
            "Aggregated business metrics",
            Some(&serde_json::json!({
                "observations": outcome.observations_used,
                "metrics": outcome.per_metric_series.len(),
                "revenue_total": outcome.revenue.total,
            })),
        );

        Ok(outcome)
    }
}

/// Aggregates with the default metric names.
pub fn aggregate(
    observations: &[MetricObservation],
    categories: &[MetricCategory],
    granularity: AggregationLevel,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> AnalyticsResult<AggregationOutcome> {
    let aggregator = MetricsAggregator::new(MetricsAggregatorConfig::default())?;
    let request = AggregationRequest::new(
        categories.to_vec(),
        granularity,
        DateRange::new(start_date, end_date),
    );
    aggregator.aggregate(observations, &request)
}

fn build_series(observations: &[&MetricObservation]) -> BTreeMap<String, MetricSeries> {
    let mut grouped: BTreeMap<String, Vec<SeriesPoint>> = BTreeMap::new();
    for obs in observations {
        grouped.entry(obs.name.clone()).or_default().push(SeriesPoint {
            date: obs.date,
            value: obs.value,
        });
    }
    grouped
        .into_iter()
        .map(|(name, points)| {
            let series = MetricSeries::from_points(name.clone(), points);
            (name, series)
        })
        .collect()
}

fn summarize(series: Option<&MetricSeries>) -> AggregatedMetricSummary {
    let Some(series) = series else {
        return AggregatedMetricSummary::zeroed();
    };

    let total: f64 = series.points.iter().map(|p| p.value).sum();
    let growth_percent = match series.points.len() {
        0 | 1 => 0.0,
        n => growth(series.points[n - 1].value, series.points[n - 2].value),
    };

    AggregatedMetricSummary {
        total,
        growth: growth_percent,
        trend: classify(growth_percent),
    }
}
