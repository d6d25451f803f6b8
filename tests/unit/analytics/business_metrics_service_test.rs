use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use exec_analytics::middleware::rbac::RoleBasedPermissionChecker;
use exec_analytics::services::core::infrastructure::{
    CircuitState, InMemoryMetricStore, MetricQuery, MetricStoreReader, ObservationUpdate,
    StoreError, StoreResult,
};
use exec_analytics::{
    AggregationLevel, AggregationRequest, AnalyticsModuleConfig, BusinessMetricsService,
    DataSource, DateRange, ErrorKind, MetricCategory, MetricObservation, MetricSelector,
    MetricUnit, TrendDirection,
};

// Mock store: records every query and can be switched into an outage.
struct RecordingStore {
    inner: InMemoryMetricStore,
    queries: Mutex<Vec<MetricQuery>>,
    down: AtomicBool,
}

impl RecordingStore {
    fn new(observations: Vec<MetricObservation>) -> Self {
        Self {
            inner: InMemoryMetricStore::with_observations(observations),
            queries: Mutex::new(Vec::new()),
            down: AtomicBool::new(false),
        }
    }

    fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn recorded(&self) -> Vec<MetricQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricStoreReader for RecordingStore {
    async fn query(&self, query: &MetricQuery) -> StoreResult<Vec<MetricObservation>> {
        self.queries.lock().unwrap().push(query.clone());
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store offline".to_string()));
        }
        self.inner.query(query).await
    }

    async fn update(&self, id: &str, update: &ObservationUpdate) -> StoreResult<MetricObservation> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store offline".to_string()));
        }
        self.inner.update(id, update).await
    }
}

// Helper functions for testing

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset)
}

fn observations(
    category: MetricCategory,
    name: &str,
    unit: MetricUnit,
    values: &[f64],
) -> Vec<MetricObservation> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            MetricObservation::new(day(i as i64), category, name, *v, unit, AggregationLevel::Daily)
        })
        .collect()
}

fn fixture() -> Vec<MetricObservation> {
    let mut all = observations(
        MetricCategory::Sales,
        "total_revenue",
        MetricUnit::Currency,
        &[100.0, 110.0, 125.0, 130.0, 150.0, 160.0, 175.0, 190.0],
    );
    all.extend(observations(
        MetricCategory::Marketing,
        "marketing_spend",
        MetricUnit::Currency,
        &[1000.0, 1100.0, 1200.0, 1400.0, 1500.0, 1600.0, 1800.0, 1900.0],
    ));
    all.extend(observations(
        MetricCategory::Sales,
        "total_orders",
        MetricUnit::Count,
        &[10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0],
    ));
    all
}

fn permissions() -> Arc<RoleBasedPermissionChecker> {
    Arc::new(
        RoleBasedPermissionChecker::new()
            .with_role("dana", "analyst")
            .with_role("vic", "viewer"),
    )
}

fn service(store: Arc<RecordingStore>) -> BusinessMetricsService {
    BusinessMetricsService::new(store, permissions(), AnalyticsModuleConfig::default()).unwrap()
}

fn january() -> DateRange {
    DateRange::new(day(0), day(30))
}

fn sales_request(range: DateRange) -> AggregationRequest {
    AggregationRequest::new(vec![MetricCategory::Sales], AggregationLevel::Daily, range)
}

fn revenue() -> MetricSelector {
    MetricSelector::new(MetricCategory::Sales, "total_revenue")
}

fn spend() -> MetricSelector {
    MetricSelector::new(MetricCategory::Marketing, "marketing_spend")
}

#[tokio::test]
async fn test_business_metrics_widens_and_queries_without_date_filter() {
    let store = Arc::new(RecordingStore::new(fixture()));
    let service = service(store.clone());
    let request = AggregationRequest::new(
        vec![MetricCategory::Sales],
        AggregationLevel::Daily,
        DateRange::new(day(60), day(90)),
    );

    let outcome = service.business_metrics("dana", &request).await.unwrap();

    assert_eq!(outcome.source, DataSource::Widened);
    assert_eq!(outcome.revenue.total, 1140.0);
    // 190 vs 175
    assert_eq!(outcome.revenue.growth, 8.6);
    assert_eq!(outcome.revenue.trend, TrendDirection::Increasing);
    assert_eq!(outcome.orders.total, 80.0);
    assert_eq!(outcome.orders.trend, TrendDirection::Stable);

    // window first, then the unfiltered fallback
    let queries = store.recorded();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0].date_range, Some(DateRange::new(day(60), day(90))));
    assert!(queries[1].date_range.is_none());
    assert!(queries.iter().all(|q| q.limit == 365));
}

#[tokio::test]
async fn test_old_window_survives_store_history_beyond_page_size() {
    let history: Vec<f64> = vec![100.0; 730];
    let store = Arc::new(RecordingStore::new(observations(
        MetricCategory::Sales,
        "total_revenue",
        MetricUnit::Currency,
        &history,
    )));
    let service = service(store.clone());

    let outcome = service
        .business_metrics("dana", &sales_request(DateRange::new(day(0), day(30))))
        .await
        .unwrap();

    assert_eq!(outcome.source, DataSource::InRange);
    assert_eq!(outcome.revenue.total, 3100.0);
    assert_eq!(outcome.observations_used, 31);
    let queries = store.recorded();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].date_range, Some(DateRange::new(day(0), day(30))));
}

#[tokio::test]
async fn test_correlate_metrics_fetches_both_categories() {
    let store = Arc::new(RecordingStore::new(fixture()));
    let service = service(store.clone());

    let result = service
        .correlate_metrics("dana", &revenue(), &spend(), AggregationLevel::Daily, january())
        .await
        .unwrap();

    assert!(result.coefficient > 0.98);
    assert!(result.significance < 0.01);
    assert_eq!(result.sample_size, 8);

    let queries = store.recorded();
    assert_eq!(queries.len(), 2);
    assert!(queries.iter().all(|q| q.date_range == Some(january())));
    assert!(queries.iter().any(|q| q.categories == vec![MetricCategory::Marketing]));
}

#[tokio::test]
async fn test_zero_variance_metric_uses_fallback() {
    let store = Arc::new(RecordingStore::new(fixture()));
    let service = service(store);

    let result = service
        .correlate_metrics(
            "dana",
            &revenue(),
            &MetricSelector::new(MetricCategory::Sales, "total_orders"),
            AggregationLevel::Daily,
            january(),
        )
        .await
        .unwrap();

    assert_eq!(result.coefficient, 0.0);
    assert_eq!(result.significance, 1.0);
    assert!(result.degenerate);
}

#[tokio::test]
async fn test_correlation_during_outage_is_insufficient_data() {
    let store = Arc::new(RecordingStore::new(fixture()));
    store.set_down(true);
    let service = service(store);

    let err = service
        .correlate_metrics("dana", &revenue(), &spend(), AggregationLevel::Daily, january())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InsufficientData);
}

#[tokio::test]
async fn test_correlation_matrix_keeps_failed_pairs() {
    let store = Arc::new(RecordingStore::new(fixture()));
    let service = service(store.clone());
    let unknown = MetricSelector::new(MetricCategory::Inventory, "stock_turns");

    let matrix = service
        .correlation_matrix(
            "dana",
            &[revenue(), spend(), unknown.clone()],
            AggregationLevel::Daily,
            january(),
        )
        .await
        .unwrap();

    assert_eq!(matrix.entries.len(), 3);
    let computed = matrix.get(&revenue().key(), &spend().key()).unwrap();
    assert!(computed.result.is_some());
    let failed = matrix.get(&unknown.key(), &revenue().key()).unwrap();
    assert_eq!(failed.error, Some(ErrorKind::InsufficientData));

    // one query per distinct category
    assert_eq!(store.recorded().len(), 3);
}

#[tokio::test]
async fn test_trend_report_returns_series_and_direction() {
    let store = Arc::new(RecordingStore::new(fixture()));
    let service = service(store);

    let analysis = service
        .trend_report("dana", &revenue(), AggregationLevel::Daily, january())
        .await
        .unwrap();

    assert_eq!(analysis.metric, "sales.total_revenue");
    assert_eq!(analysis.series.len(), 8);
    assert_eq!(analysis.report.direction, TrendDirection::Increasing);
    assert!(analysis.report.strength > 0.9);
}

#[tokio::test]
async fn test_permissions_are_checked_before_fetching() {
    let store = Arc::new(RecordingStore::new(fixture()));
    let service = service(store.clone());
    let request = sales_request(january());

    let err = service.business_metrics("vic", &request).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AuthorizationError);
    let err = service
        .trend_report("mallory", &revenue(), AggregationLevel::Daily, january())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AuthorizationError);
    assert!(store.recorded().is_empty());

    // viewers may still see the dashboard cards
    let cards = service.dashboard_kpis("vic", &request).await.unwrap();
    assert_eq!(cards[0].formatted_value, "$1,140.00");
}

#[tokio::test]
async fn test_inverted_range_is_rejected() {
    let store = Arc::new(RecordingStore::new(fixture()));
    let service = service(store);

    let err = service
        .trend_report(
            "dana",
            &revenue(),
            AggregationLevel::Daily,
            DateRange::new(day(10), day(1)),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ValidationError);
}

#[tokio::test]
async fn test_circuit_opens_and_recovers_through_half_open() {
    let store = Arc::new(RecordingStore::new(fixture()));
    let service = service(store.clone());
    let request = sales_request(january());

    store.set_down(true);
    for _ in 0..3 {
        let outcome = service.business_metrics("dana", &request).await.unwrap();
        assert!(outcome.needs_alternative_source());
    }
    assert_eq!(service.circuit_state().state, CircuitState::Open);

    store.set_down(false);
    let outcome = service.business_metrics("dana", &request).await.unwrap();
    assert_eq!(outcome.source, DataSource::Unavailable);
    assert_eq!(store.recorded().len(), 3);

    service.force_circuit_state(CircuitState::HalfOpen);
    let outcome = service.business_metrics("dana", &request).await.unwrap();
    assert_eq!(outcome.source, DataSource::InRange);
    assert_eq!(service.circuit_state().state, CircuitState::Closed);
}
