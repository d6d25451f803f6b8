//! End-to-end: store -> service -> executive report -> export.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc, Weekday};
use std::sync::Arc;

use exec_analytics::middleware::rbac::RoleBasedPermissionChecker;
use exec_analytics::services::core::analytics::report_generator::{
    AlertSeverity, ReportFormat, ReportFrequency, ReportSchedule,
};
use exec_analytics::services::core::infrastructure::{
    InMemoryMetricStore, MetricQuery, MetricStoreReader, ObservationUpdate, StoreError,
    StoreResult,
};
use exec_analytics::utils::time::parse_date;
use exec_analytics::{
    AggregationLevel, AnalyticsModuleConfig, BusinessMetricsService, DataSource, DateRange,
    ErrorKind, ExecutiveReport, ExecutiveReportRequest, MetricCategory, MetricObservation,
    MetricSelector, MetricUnit, TrendDirection,
};

struct OfflineStore;

#[async_trait]
impl MetricStoreReader for OfflineStore {
    async fn query(&self, _query: &MetricQuery) -> StoreResult<Vec<MetricObservation>> {
        Err(StoreError::Unavailable("maintenance window".to_string()))
    }

    async fn update(
        &self,
        id: &str,
        _update: &ObservationUpdate,
    ) -> StoreResult<MetricObservation> {
        Err(StoreError::NotFound(id.to_string()))
    }
}

fn start() -> NaiveDate {
    parse_date("2024-01-01").unwrap()
}

fn series(
    category: MetricCategory,
    name: &str,
    unit: MetricUnit,
    values: &[f64],
) -> Vec<MetricObservation> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            MetricObservation::new(
                start() + Duration::days(i as i64),
                category,
                name,
                *v,
                unit,
                AggregationLevel::Daily,
            )
        })
        .collect()
}

/// Twelve days of sales and marketing data. Revenue spikes on day 10,
/// customers drop 10% on the last day.
fn seeded_store() -> InMemoryMetricStore {
    let mut all = series(
        MetricCategory::Sales,
        "total_revenue",
        MetricUnit::Currency,
        &[
            1000.0, 1010.0, 990.0, 1005.0, 995.0, 1002.0, 998.0, 1003.0, 997.0, 3000.0, 1001.0,
            999.0,
        ],
    );
    all.extend(series(
        MetricCategory::Sales,
        "total_orders",
        MetricUnit::Count,
        &(50..62).map(|v| v as f64).collect::<Vec<_>>(),
    ));
    let mut customers = vec![100.0; 11];
    customers.push(90.0);
    all.extend(series(
        MetricCategory::Customers,
        "total_customers",
        MetricUnit::Count,
        &customers,
    ));
    all.extend(series(
        MetricCategory::Marketing,
        "marketing_spend",
        MetricUnit::Currency,
        &(0..12).map(|i| 200.0 + 5.0 * i as f64).collect::<Vec<_>>(),
    ));
    InMemoryMetricStore::with_observations(all)
}

fn permissions() -> Arc<RoleBasedPermissionChecker> {
    Arc::new(
        RoleBasedPermissionChecker::new()
            .with_role("cfo", "executive")
            .with_role("dana", "analyst"),
    )
}

fn request() -> ExecutiveReportRequest {
    ExecutiveReportRequest::new(
        vec![MetricCategory::Sales, MetricCategory::Customers],
        AggregationLevel::Daily,
        DateRange::new(start(), parse_date("2024-01-12").unwrap()),
    )
    .with_trend(MetricSelector::new(MetricCategory::Sales, "total_revenue"))
    .with_trend(MetricSelector::new(MetricCategory::Sales, "total_orders"))
    .with_correlation(MetricSelector::new(MetricCategory::Sales, "total_revenue"))
    .with_correlation(MetricSelector::new(MetricCategory::Sales, "total_orders"))
    .with_correlation(MetricSelector::new(MetricCategory::Marketing, "marketing_spend"))
}

#[tokio::test]
async fn test_executive_report_end_to_end() {
    let service = BusinessMetricsService::new(
        Arc::new(seeded_store()),
        permissions(),
        AnalyticsModuleConfig::default(),
    )
    .unwrap();

    let report = service.executive_report("cfo", &request()).await.unwrap();

    assert_eq!(report.data_source, DataSource::InRange);
    assert_eq!(report.kpis.len(), 3);

    let revenue = &report.kpis[0];
    assert_eq!(revenue.value, 14000.0);
    assert_eq!(revenue.growth, -0.2);
    assert_eq!(revenue.trend, TrendDirection::Stable);

    let customers = &report.kpis[2];
    assert_eq!(customers.growth, -10.0);
    assert_eq!(customers.trend, TrendDirection::Decreasing);

    assert_eq!(report.trends.len(), 2);
    let revenue_trend = &report.trends[0];
    assert_eq!(revenue_trend.metric, "sales.total_revenue");
    assert_eq!(revenue_trend.report.anomalies.len(), 1);
    assert_eq!(revenue_trend.report.anomalies[0].index, 9);
    assert!(report.trends[1].report.anomalies.is_empty());

    assert_eq!(report.alerts.len(), 2);
    assert_eq!(report.alerts[0].severity, AlertSeverity::Critical);
    assert_eq!(report.alerts[0].date, Some(parse_date("2024-01-10").unwrap()));
    assert_eq!(report.alerts[1].severity, AlertSeverity::Warning);
    assert_eq!(report.alerts[1].metric, "total_customers");
    assert_eq!(report.critical_alerts().count(), 1);

    assert_eq!(report.correlations.len(), 3);
    assert!(report.correlations.iter().all(|e| e.result.is_some()));
    let perfect = report
        .correlations
        .iter()
        .find(|e| e.left == "sales.total_orders" && e.right == "marketing.marketing_spend")
        .and_then(|e| e.result)
        .unwrap();
    assert!((perfect.coefficient - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_report_exports() {
    let service = BusinessMetricsService::new(
        Arc::new(seeded_store()),
        permissions(),
        AnalyticsModuleConfig::default(),
    )
    .unwrap();
    let report = service.executive_report("cfo", &request()).await.unwrap();

    let csv = report.export(ReportFormat::Csv).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("metric,label,value"));
    assert!(lines[1].contains("\"$14,000.00\""));
    assert!(lines[3].ends_with("decreasing"));

    let json = report.export(ReportFormat::Json).unwrap();
    let restored: ExecutiveReport = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.report_id, report.report_id);
    assert_eq!(restored.period, report.period);
    assert_eq!(restored.kpis, report.kpis);
    assert_eq!(restored.alerts.len(), 2);

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["data_source"], "in_range");
    assert_eq!(value["trends"][0]["report"]["direction"], "increasing");
}

#[tokio::test]
async fn test_report_requires_export_permission() {
    let service = BusinessMetricsService::new(
        Arc::new(seeded_store()),
        permissions(),
        AnalyticsModuleConfig::default(),
    )
    .unwrap();

    let err = service.executive_report("dana", &request()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AuthorizationError);
}

#[tokio::test]
async fn test_report_generation_can_be_disabled() {
    let config = AnalyticsModuleConfig {
        enable_report_generation: false,
        ..Default::default()
    };
    let service =
        BusinessMetricsService::new(Arc::new(seeded_store()), permissions(), config).unwrap();

    let err = service.executive_report("cfo", &request()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ServiceUnavailable);
}

#[tokio::test]
async fn test_report_during_outage_degrades() {
    let service = BusinessMetricsService::new(
        Arc::new(OfflineStore),
        permissions(),
        AnalyticsModuleConfig::default(),
    )
    .unwrap();

    let report = service.executive_report("cfo", &request()).await.unwrap();

    assert_eq!(report.data_source, DataSource::Unavailable);
    assert!(report.kpis.iter().all(|k| k.value == 0.0 && k.trend == TrendDirection::Stable));
    assert!(report.trends.is_empty());
    assert!(report.alerts.is_empty());
    assert!(report
        .correlations
        .iter()
        .all(|e| e.error == Some(ErrorKind::InsufficientData)));
}

#[test]
fn test_weekly_schedule_is_always_in_the_future() {
    let schedule = ReportSchedule::new(ReportFrequency::Weekly(Weekday::Fri), 7).unwrap();
    let now = Utc::now();
    let next = schedule.next_run_after(now).unwrap();

    assert!(next > now);
    assert!(next - now <= Duration::days(7));
    assert_eq!(next.format("%a %H:%M").to_string(), "Fri 07:00");
}
