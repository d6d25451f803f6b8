// src/services/core/analytics/mod.rs

//! Analytics Module - business metrics core for executive dashboards
//!
//! ## Components:
//!
//! 1. **statistics** - growth/trend classification, Pearson, t-distribution and OLS primitives
//! 2. **MetricsAggregator** - revenue, orders and customers summaries over flat observations
//! 3. **CorrelationAnalyzer** - date-aligned Pearson correlation with significance
//! 4. **TrendAnalyzer** - least-squares trend with anomaly flagging
//! 5. **ReportGenerator** - KPI cards, alerts, executive reports and schedules
//! 6. **BusinessMetricsService** - permission-checked orchestration over a metric store,
//!    guarded by a circuit breaker
//!
//! Everything except the service is synchronous and pure over already-fetched data.

pub mod analytics_coordinator;
pub mod correlation_analyzer;
pub mod metrics_aggregator;
pub mod report_generator;
pub mod statistics;
pub mod trend_analyzer;

pub use analytics_coordinator::{BusinessMetricsService, ExecutiveReportRequest};
pub use correlation_analyzer::{
    align_by_date, correlate, AlignedPairs, CorrelationAnalyzer, CorrelationAnalyzerConfig,
    CorrelationEntry, CorrelationMatrix,
};
pub use metrics_aggregator::{
    aggregate, AggregationOutcome, AggregationRequest, DataSource, MetricsAggregator,
    MetricsAggregatorConfig, CUSTOMERS_METRIC, ORDERS_METRIC, REVENUE_METRIC,
};
pub use report_generator::{
    AlertSeverity, AnalyticsAlert, ExecutiveReport, KpiCard, ReportFormat, ReportFrequency,
    ReportGenerator, ReportGeneratorConfig, ReportSchedule, TrendAnalysis,
};
pub use statistics::{classify, growth, TREND_THRESHOLD_PERCENT};
pub use trend_analyzer::{analyze_trend, AnomalyBaseline, TrendAnalyzer, TrendAnalyzerConfig};

use crate::services::core::infrastructure::circuit_breaker::CircuitBreakerConfig;
use crate::services::core::infrastructure::metric_store::DEFAULT_QUERY_LIMIT;
use crate::types::AggregationLevel;
use crate::utils::{AnalyticsError, AnalyticsResult};
use serde::{Deserialize, Serialize};

/// Analytics Module Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsModuleConfig {
    /// Rows requested per store query
    pub query_row_limit: usize,
    pub default_granularity: AggregationLevel,
    pub aggregator: MetricsAggregatorConfig,
    pub trend: TrendAnalyzerConfig,
    pub correlation: CorrelationAnalyzerConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub enable_report_generation: bool,
}

impl Default for AnalyticsModuleConfig {
    fn default() -> Self {
        Self {
            query_row_limit: DEFAULT_QUERY_LIMIT,
            default_granularity: AggregationLevel::Daily,
            aggregator: MetricsAggregatorConfig::default(),
            trend: TrendAnalyzerConfig::default(),
            correlation: CorrelationAnalyzerConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            enable_report_generation: true,
        }
    }
}

impl AnalyticsModuleConfig {
    /// Smaller pages and a quick-tripping breaker for latency-sensitive dashboards
    pub fn high_performance() -> Self {
        Self {
            query_row_limit: 90,
            circuit_breaker: CircuitBreakerConfig::high_performance(),
            ..Default::default()
        }
    }

    /// Full pages and a patient breaker for scheduled reporting
    pub fn high_reliability() -> Self {
        Self {
            query_row_limit: DEFAULT_QUERY_LIMIT,
            circuit_breaker: CircuitBreakerConfig::high_reliability(),
            ..Default::default()
        }
    }

    /// Reads overrides from the process environment and validates the result.
    pub fn from_env() -> AnalyticsResult<Self> {
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        crate::log_info!(
            "Analytics config loaded from environment",
            serde_json::json!({
                "query_row_limit": config.query_row_limit,
                "default_granularity": config.default_granularity.as_str(),
                "failure_threshold": config.circuit_breaker.failure_threshold,
                "timeout_seconds": config.circuit_breaker.timeout_seconds,
            })
        );
        Ok(config)
    }

    /// Builds a config from an arbitrary key lookup. Missing or unparsable
    /// values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> AnalyticsResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(limit) = parsed(&lookup, "EXEC_ANALYTICS_QUERY_ROW_LIMIT", |v| v.parse().ok()) {
            config.query_row_limit = limit;
        }
        if let Some(level) =
            parsed(&lookup, "EXEC_ANALYTICS_GRANULARITY", AggregationLevel::from_string)
        {
            config.default_granularity = level;
        }
        if let Some(threshold) =
            parsed(&lookup, "EXEC_ANALYTICS_FAILURE_THRESHOLD", |v| v.parse().ok())
        {
            config.circuit_breaker.failure_threshold = threshold;
        }
        if let Some(timeout) =
            parsed(&lookup, "EXEC_ANALYTICS_BREAKER_TIMEOUT_SECONDS", |v| v.parse().ok())
        {
            config.circuit_breaker.timeout_seconds = timeout;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AnalyticsResult<()> {
        if self.query_row_limit == 0 {
            return Err(AnalyticsError::configuration_error(
                "query_row_limit must be greater than 0",
            ));
        }
        self.aggregator.validate()?;
        self.trend.validate()?;
        self.correlation.validate()?;
        self.circuit_breaker.validate()?;
        Ok(())
    }
}

fn parsed<T, F, P>(lookup: &F, key: &str, parse: P) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    let raw = lookup(key)?;
    let value = parse(raw.trim());
    if value.is_none() {
        crate::log_warn!(
            "Ignoring unparsable config value",
            serde_json::json!({ "key": key, "value": raw })
        );
    }
    value
}
