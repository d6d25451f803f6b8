// src/services/core/analytics/analytics_coordinator.rs

//! Business Metrics Service - permission-checked entry point that fetches
//! observations from the metric store behind a circuit breaker and runs them
//! through the aggregation, correlation, trend and report components.
//!
//! Degradation rules:
//! - aggregation never fails on a store outage or open circuit; it returns
//!   zeroed summaries flagged `DataSource::Unavailable`,
//! - correlation and trend treat a failed fetch as no data, so the caller sees
//!   `InsufficientData` instead of a number computed from nothing.

use super::correlation_analyzer::{CorrelationAnalyzer, CorrelationMatrix};
use super::metrics_aggregator::{
    AggregationOutcome, AggregationRequest, DataSource, MetricsAggregator,
};
use super::report_generator::{
    ExecutiveReport, KpiCard, ReportGenerator, ReportGeneratorConfig, TrendAnalysis,
};
use super::trend_analyzer::TrendAnalyzer;
use super::AnalyticsModuleConfig;
use crate::middleware::rbac::{AnalyticsAction, PermissionChecker};
use crate::services::core::infrastructure::circuit_breaker::{
    CircuitBreaker, CircuitBreakerStateInfo, CircuitState,
};
use crate::services::core::infrastructure::metric_store::{
    MetricQuery, MetricStoreReader, ObservationUpdate, StoreError, StoreResult,
};
use crate::types::{
    AggregationLevel, CorrelationResult, DateRange, MetricCategory, MetricObservation,
    MetricSelector, MetricSeries, SeriesPoint,
};
use crate::utils::time::{days_in_range, today_utc, trailing_range};
use crate::utils::{logger::Logger, AnalyticsError, AnalyticsResult};
use futures::future::{join, join_all};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

/// What an executive report should cover
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveReportRequest {
    pub categories: Vec<MetricCategory>,
    pub granularity: AggregationLevel,
    pub period: DateRange,
    /// Metrics to run trend and anomaly analysis on
    pub trend_metrics: Vec<MetricSelector>,
    /// Metrics to correlate pairwise
    pub correlation_metrics: Vec<MetricSelector>,
}

impl ExecutiveReportRequest {
    pub fn new(
        categories: Vec<MetricCategory>,
        granularity: AggregationLevel,
        period: DateRange,
    ) -> Self {
        Self {
            categories,
            granularity,
            period,
            trend_metrics: Vec::new(),
            correlation_metrics: Vec::new(),
        }
    }

    /// Covers the trailing `days` days ending today (UTC).
    pub fn last_days(
        categories: Vec<MetricCategory>,
        granularity: AggregationLevel,
        days: i64,
    ) -> Self {
        Self::new(categories, granularity, trailing_range(today_utc(), days))
    }

    pub fn with_trend(mut self, metric: MetricSelector) -> Self {
        self.trend_metrics.push(metric);
        self
    }

    pub fn with_correlation(mut self, metric: MetricSelector) -> Self {
        self.correlation_metrics.push(metric);
        self
    }

    fn query_categories(&self) -> Vec<MetricCategory> {
        let mut categories = self.categories.clone();
        for selector in self.trend_metrics.iter().chain(&self.correlation_metrics) {
            if !categories.contains(&selector.category) {
                categories.push(selector.category);
            }
        }
        categories
    }
}

pub struct BusinessMetricsService {
    store: Arc<dyn MetricStoreReader>,
    permissions: Arc<dyn PermissionChecker>,
    breaker: Mutex<CircuitBreaker>,
    config: AnalyticsModuleConfig,
    aggregator: MetricsAggregator,
    correlation: CorrelationAnalyzer,
    trend: TrendAnalyzer,
    reports: ReportGenerator,
    logger: Logger,
}

impl BusinessMetricsService {
    pub fn new(
        store: Arc<dyn MetricStoreReader>,
        permissions: Arc<dyn PermissionChecker>,
        config: AnalyticsModuleConfig,
    ) -> AnalyticsResult<Self> {
        config.validate()?;

        let logger = crate::utils::logger::logger().for_component("business_metrics_service");

        Ok(Self {
            store,
            permissions,
            breaker: Mutex::new(CircuitBreaker::new(
                "metric_store",
                config.circuit_breaker.clone(),
            )?),
            aggregator: MetricsAggregator::new(config.aggregator.clone())?,
            correlation: CorrelationAnalyzer::new(config.correlation.clone())?,
            trend: TrendAnalyzer::new(config.trend.clone())?,
            reports: ReportGenerator::new(
                ReportGeneratorConfig::default(),
                config.aggregator.clone(),
            )?,
            config,
            logger,
        })
    }

    pub fn config(&self) -> &AnalyticsModuleConfig {
        &self.config
    }

    /// Aggregation request at the configured default granularity.
    pub fn aggregation_request(
        &self,
        categories: Vec<MetricCategory>,
        range: DateRange,
    ) -> AggregationRequest {
        AggregationRequest::new(categories, self.config.default_granularity, range)
    }

    /// Executive report request at the configured default granularity.
    pub fn report_request(
        &self,
        categories: Vec<MetricCategory>,
        period: DateRange,
    ) -> ExecutiveReportRequest {
        ExecutiveReportRequest::new(categories, self.config.default_granularity, period)
    }

    /// Revenue, orders and customers summaries for the request.
    pub async fn business_metrics(
        &self,
        subject: &str,
        request: &AggregationRequest,
    ) -> AnalyticsResult<AggregationOutcome> {
        self.authorize(subject, AnalyticsAction::ViewAnalytics)?;
        self.aggregate_for(request).await
    }

    /// KPI cards for the dashboard view.
    pub async fn dashboard_kpis(
        &self,
        subject: &str,
        request: &AggregationRequest,
    ) -> AnalyticsResult<Vec<KpiCard>> {
        self.authorize(subject, AnalyticsAction::ViewDashboard)?;
        let outcome = self.aggregate_for(request).await?;
        Ok(self.reports.kpi_cards(&outcome))
    }

    pub async fn correlate_metrics(
        &self,
        subject: &str,
        metric_a: &MetricSelector,
        metric_b: &MetricSelector,
        granularity: AggregationLevel,
        range: DateRange,
    ) -> AnalyticsResult<CorrelationResult> {
        self.authorize(subject, AnalyticsAction::ViewAnalytics)?;
        validate_range(&range)?;

        let query_a = self.query(vec![metric_a.category], granularity).with_date_range(range);
        let query_b = self.query(vec![metric_b.category], granularity).with_date_range(range);
        let (rows_a, rows_b) =
            join(self.fetch_or_empty(&query_a), self.fetch_or_empty(&query_b)).await;

        let series_a = series_for(&rows_a, metric_a, Some(&range));
        let series_b = series_for(&rows_b, metric_b, Some(&range));
        let result = self.correlation.correlate(&series_a, &series_b)?;

        self.logger.debug_with_meta(
            "Correlated metrics",
            Some(&serde_json::json!({
                "left": metric_a.key(),
                "right": metric_b.key(),
                "coefficient": result.coefficient,
                "significance": result.significance,
                "sample_size": result.sample_size,
            })),
        );
        Ok(result)
    }

    /// Every unordered pair of `metrics`. Pairs that cannot be computed keep
    /// their error kind instead of failing the matrix.
    pub async fn correlation_matrix(
        &self,
        subject: &str,
        metrics: &[MetricSelector],
        granularity: AggregationLevel,
        range: DateRange,
    ) -> AnalyticsResult<CorrelationMatrix> {
        self.authorize(subject, AnalyticsAction::ViewAnalytics)?;
        validate_range(&range)?;

        let mut categories: Vec<MetricCategory> = Vec::new();
        for selector in metrics {
            if !categories.contains(&selector.category) {
                categories.push(selector.category);
            }
        }

        let queries: Vec<MetricQuery> = categories
            .iter()
            .map(|c| self.query(vec![*c], granularity).with_date_range(range))
            .collect();
        let rows: Vec<MetricObservation> = join_all(queries.iter().map(|q| self.fetch_or_empty(q)))
            .await
            .into_iter()
            .flatten()
            .collect();

        Ok(self.correlation.correlation_matrix(&named_series(&rows, metrics, Some(&range))))
    }

    pub async fn trend_report(
        &self,
        subject: &str,
        metric: &MetricSelector,
        granularity: AggregationLevel,
        range: DateRange,
    ) -> AnalyticsResult<TrendAnalysis> {
        self.authorize(subject, AnalyticsAction::ViewAnalytics)?;
        validate_range(&range)?;

        let query = self.query(vec![metric.category], granularity).with_date_range(range);
        let rows = self.fetch_or_empty(&query).await;
        let series = series_for(&rows, metric, Some(&range));
        let report = self.trend.analyze_series(&series)?;

        if !report.anomalies.is_empty() {
            self.logger.info_with_meta(
                "Anomalies detected",
                Some(&serde_json::json!({
                    "metric": metric.key(),
                    "count": report.anomalies.len(),
                })),
            );
        }

        Ok(TrendAnalysis {
            metric: metric.key(),
            series,
            report,
        })
    }

    /// Administrative value/threshold change.
    pub async fn update_observation(
        &self,
        subject: &str,
        id: &str,
        update: &ObservationUpdate,
    ) -> AnalyticsResult<MetricObservation> {
        self.authorize(subject, AnalyticsAction::ManageMetrics)?;

        let updated = self.call_store("update", || self.store.update(id, update)).await?;
        self.logger.info_with_meta(
            "Observation updated",
            Some(&serde_json::json!({ "id": id, "subject": subject })),
        );
        Ok(updated)
    }

    pub async fn executive_report(
        &self,
        subject: &str,
        request: &ExecutiveReportRequest,
    ) -> AnalyticsResult<ExecutiveReport> {
        self.authorize(subject, AnalyticsAction::ExportReports)?;
        if !self.config.enable_report_generation {
            return Err(AnalyticsError::service_unavailable(
                "Report generation is disabled",
            ));
        }

        let aggregation = AggregationRequest::new(
            request.categories.clone(),
            request.granularity,
            request.period,
        );
        aggregation.validate()?;

        let fetched = self
            .fetch_window(request.query_categories(), &aggregation)
            .await;
        let rows = match fetched {
            Ok(rows) => Some(rows),
            Err(e) => {
                self.logger.warn_with_meta(
                    "Report built without store data",
                    Some(&serde_json::json!({ "error": e.to_string() })),
                );
                None
            }
        };

        let outcome = match &rows {
            Some(rows) => self.aggregator.aggregate(rows, &aggregation)?,
            None => AggregationOutcome::zeroed(DataSource::Unavailable),
        };
        let rows = rows.unwrap_or_default();

        let mut trends = Vec::new();
        for selector in &request.trend_metrics {
            let series = series_for(&rows, selector, Some(&request.period));
            match self.trend.analyze_series(&series) {
                Ok(report) => trends.push(TrendAnalysis {
                    metric: selector.key(),
                    series,
                    report,
                }),
                Err(e) => self.logger.debug_with_meta(
                    "Skipping trend for report",
                    Some(&serde_json::json!({
                        "metric": selector.key(),
                        "reason": e.to_string(),
                    })),
                ),
            }
        }

        let correlations = if request.correlation_metrics.len() >= 2 {
            self.correlation
                .correlation_matrix(&named_series(
                    &rows,
                    &request.correlation_metrics,
                    Some(&request.period),
                ))
                .entries
        } else {
            Vec::new()
        };

        self.logger.debug_with_meta(
            "Report inputs ready",
            Some(&serde_json::json!({
                "days": days_in_range(&request.period),
                "rows": rows.len(),
                "trends": trends.len(),
                "correlations": correlations.len(),
            })),
        );

        Ok(self
            .reports
            .build_report(request.period, &outcome, trends, correlations))
    }

    pub fn circuit_state(&self) -> CircuitBreakerStateInfo {
        self.breaker().state_info()
    }

    /// Operator override, e.g. to close the circuit once the store is known healthy.
    pub fn force_circuit_state(&self, state: CircuitState) {
        let mut breaker = self.breaker();
        let previous = breaker.state();
        breaker.force_state(state);
        drop(breaker);
        self.log_transition(previous, state);
    }

    fn authorize(&self, subject: &str, action: AnalyticsAction) -> AnalyticsResult<()> {
        if self.permissions.has_permission(subject, action) {
            return Ok(());
        }
        self.logger.warn_with_meta(
            "Permission denied",
            Some(&serde_json::json!({
                "subject": subject,
                "action": action.as_str(),
            })),
        );
        Err(AnalyticsError::access_denied(format!(
            "Subject '{}' is not allowed to {}",
            subject,
            action.as_str()
        )))
    }

    async fn aggregate_for(
        &self,
        request: &AggregationRequest,
    ) -> AnalyticsResult<AggregationOutcome> {
        request.validate()?;

        match self.fetch_window(request.categories.clone(), request).await {
            Ok(rows) => self.aggregator.aggregate(&rows, request),
            Err(e) => {
                self.logger.warn_with_meta(
                    "Metric fetch failed, returning zeroed summaries",
                    Some(&serde_json::json!({ "error": e.to_string() })),
                );
                Ok(AggregationOutcome::zeroed(DataSource::Unavailable))
            }
        }
    }

    /// Rows for `categories` inside the request window. When none of the
    /// request's own categories has a row there, the store is asked again
    /// without a date filter so the aggregator can widen.
    async fn fetch_window(
        &self,
        categories: Vec<MetricCategory>,
        request: &AggregationRequest,
    ) -> AnalyticsResult<Vec<MetricObservation>> {
        let windowed = self
            .query(categories, request.granularity)
            .with_date_range(request.range);
        let mut rows = self.fetch(&windowed).await?;
        if rows.iter().any(|o| request.categories.contains(&o.category)) {
            return Ok(rows);
        }

        self.logger.warn_with_meta(
            "Requested window is empty, fetching all dates",
            Some(&serde_json::json!({
                "start": request.range.start.to_string(),
                "end": request.range.end.to_string(),
            })),
        );
        let unfiltered = self.query(request.categories.clone(), request.granularity);
        rows.extend(self.fetch(&unfiltered).await?);
        Ok(rows)
    }

    fn query(&self, categories: Vec<MetricCategory>, granularity: AggregationLevel) -> MetricQuery {
        MetricQuery::new(categories, granularity).with_limit(self.config.query_row_limit)
    }

    async fn fetch(&self, query: &MetricQuery) -> AnalyticsResult<Vec<MetricObservation>> {
        self.call_store("query", || self.store.query(query)).await
    }

    async fn fetch_or_empty(&self, query: &MetricQuery) -> Vec<MetricObservation> {
        match self.fetch(query).await {
            Ok(rows) => rows,
            Err(e) => {
                self.logger.warn_with_meta(
                    "Metric fetch failed, continuing without data",
                    Some(&serde_json::json!({
                        "categories": query
                            .categories
                            .iter()
                            .map(|c| c.as_str())
                            .collect::<Vec<_>>(),
                        "error": e.to_string(),
                    })),
                );
                Vec::new()
            }
        }
    }

    /// Runs a store call behind the circuit breaker. Only `Unavailable`
    /// counts as a failure; other errors mean the store answered.
    async fn call_store<T, F, Fut>(&self, operation: &str, call: F) -> AnalyticsResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        {
            let mut breaker = self.breaker();
            let previous = breaker.state();
            let allowed = breaker.can_execute();
            let current = breaker.state();
            drop(breaker);
            self.log_transition(previous, current);

            if !allowed {
                return Err(AnalyticsError::service_unavailable(format!(
                    "Metric store circuit is open, skipping {}",
                    operation
                )));
            }
        }

        let result = call().await;

        let mut breaker = self.breaker();
        let previous = breaker.state();
        match &result {
            Err(StoreError::Unavailable(_)) => breaker.record_failure(),
            _ => breaker.record_success(),
        }
        let current = breaker.state();
        drop(breaker);
        self.log_transition(previous, current);

        result.map_err(|e| {
            let meta = serde_json::json!({ "operation": operation });
            match &e {
                // the store answered with rows it could not decode
                StoreError::Serialization(_) => self.logger.add_error(&e, Some(&meta)),
                _ => self.logger.warn_with_meta(
                    "Metric store call failed",
                    Some(&serde_json::json!({
                        "operation": operation,
                        "error": e.to_string(),
                    })),
                ),
            }
            AnalyticsError::from(e)
        })
    }

    fn breaker(&self) -> MutexGuard<'_, CircuitBreaker> {
        self.breaker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn log_transition(&self, previous: CircuitState, current: CircuitState) {
        if previous != current {
            self.logger.info_with_meta(
                "Metric store circuit changed state",
                Some(&serde_json::json!({
                    "from": previous.as_str(),
                    "to": current.as_str(),
                })),
            );
        }
    }
}

fn validate_range(range: &DateRange) -> AnalyticsResult<()> {
    if range.is_valid() {
        Ok(())
    } else {
        Err(AnalyticsError::validation_error(
            "Start date must not be after end date",
        ))
    }
}

fn series_for(
    rows: &[MetricObservation],
    selector: &MetricSelector,
    range: Option<&DateRange>,
) -> MetricSeries {
    MetricSeries::from_points(
        selector.key(),
        rows.iter()
            .filter(|o| o.category == selector.category && o.name == selector.name)
            .filter(|o| range.map(|r| r.contains(o.date)).unwrap_or(true))
            .map(|o| SeriesPoint {
                date: o.date,
                value: o.value,
            }),
    )
}

fn named_series(
    rows: &[MetricObservation],
    selectors: &[MetricSelector],
    range: Option<&DateRange>,
) -> Vec<(String, MetricSeries)> {
    selectors
        .iter()
        .map(|s| (s.key(), series_for(rows, s, range)))
        .collect()
}
