// src/services/core/analytics/report_generator.rs

//! Report Generator - shapes aggregation, trend and correlation results into
//! executive view-models (KPI cards, alerts) and exportable reports, and
//! computes when scheduled reports are due.

use super::correlation_analyzer::CorrelationEntry;
use super::metrics_aggregator::{
    AggregationOutcome, DataSource, MetricsAggregatorConfig,
};
use crate::types::{
    AggregatedMetricSummary, Anomaly, DateRange, MetricSeries, MetricUnit, TrendDirection,
    TrendReport,
};
use crate::utils::formatter::{
    escape_csv_field, format_growth, format_metric_value, trend_indicator,
};
use crate::utils::{logger::Logger, time::now_utc, AnalyticsError, AnalyticsResult};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

const CSV_HEADER: &str = "metric,label,value,formatted_value,growth,growth_label,trend";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Json,
    Csv,
}

/// Report Generator Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportGeneratorConfig {
    /// Anomalies scoring above this are critical rather than warnings.
    pub critical_deviation_score: f64,
}

impl Default for ReportGeneratorConfig {
    fn default() -> Self {
        Self {
            critical_deviation_score: 3.0,
        }
    }
}

impl ReportGeneratorConfig {
    pub fn validate(&self) -> AnalyticsResult<()> {
        if self.critical_deviation_score.is_nan() || self.critical_deviation_score <= 0.0 {
            return Err(AnalyticsError::configuration_error(
                "critical_deviation_score must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Dashboard card for one headline metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiCard {
    pub metric: String,
    pub label: String,
    pub value: f64,
    pub formatted_value: String,
    pub growth: f64,
    pub growth_label: String,
    pub trend: TrendDirection,
    pub trend_indicator: String,
}

impl KpiCard {
    pub fn from_summary(
        metric: impl Into<String>,
        label: impl Into<String>,
        summary: &AggregatedMetricSummary,
        unit: MetricUnit,
    ) -> Self {
        Self {
            metric: metric.into(),
            label: label.into(),
            value: summary.total,
            formatted_value: format_metric_value(summary.total, unit),
            growth: summary.growth,
            growth_label: format_growth(summary.growth),
            trend: summary.trend,
            trend_indicator: trend_indicator(summary.trend).to_string(),
        }
    }

    fn csv_row(&self) -> String {
        [
            escape_csv_field(&self.metric),
            escape_csv_field(&self.label),
            self.value.to_string(),
            escape_csv_field(&self.formatted_value),
            self.growth.to_string(),
            escape_csv_field(&self.growth_label),
            self.trend.as_str().to_string(),
        ]
        .join(",")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsAlert {
    pub id: String,
    pub severity: AlertSeverity,
    pub metric: String,
    pub message: String,
    pub date: Option<NaiveDate>,
    pub value: f64,
}

/// A trend computed for one metric, with the series it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub metric: String,
    pub series: MetricSeries,
    pub report: TrendReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveReport {
    pub report_id: String,
    pub generated_at: DateTime<Utc>,
    pub period: DateRange,
    pub data_source: DataSource,
    pub kpis: Vec<KpiCard>,
    pub trends: Vec<TrendAnalysis>,
    pub correlations: Vec<CorrelationEntry>,
    pub alerts: Vec<AnalyticsAlert>,
}

impl ExecutiveReport {
    pub fn to_json(&self) -> AnalyticsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// One KPI per line, header first.
    pub fn to_csv(&self) -> String {
        let mut lines = Vec::with_capacity(self.kpis.len() + 1);
        lines.push(CSV_HEADER.to_string());
        lines.extend(self.kpis.iter().map(KpiCard::csv_row));
        lines.join("\n")
    }

    pub fn export(&self, format: ReportFormat) -> AnalyticsResult<String> {
        match format {
            ReportFormat::Json => self.to_json(),
            ReportFormat::Csv => Ok(self.to_csv()),
        }
    }

    pub fn critical_alerts(&self) -> impl Iterator<Item = &AnalyticsAlert> {
        self.alerts
            .iter()
            .filter(|a| a.severity == AlertSeverity::Critical)
    }
}

#[derive(Debug, Clone)]
pub struct ReportGenerator {
    config: ReportGeneratorConfig,
    metrics: MetricsAggregatorConfig,
    logger: Logger,
}

impl ReportGenerator {
    pub fn new(
        config: ReportGeneratorConfig,
        metrics: MetricsAggregatorConfig,
    ) -> AnalyticsResult<Self> {
        config.validate()?;
        metrics.validate()?;

        let logger = crate::utils::logger::logger().for_component("report_generator");

        Ok(Self {
            config,
            metrics,
            logger,
        })
    }

    pub fn config(&self) -> &ReportGeneratorConfig {
        &self.config
    }

    /// Revenue, orders and customers cards, in that order.
    pub fn kpi_cards(&self, outcome: &AggregationOutcome) -> Vec<KpiCard> {
        vec![
            KpiCard::from_summary(
                &self.metrics.revenue_metric,
                "Revenue",
                &outcome.revenue,
                MetricUnit::Currency,
            ),
            KpiCard::from_summary(
                &self.metrics.orders_metric,
                "Orders",
                &outcome.orders,
                MetricUnit::Count,
            ),
            KpiCard::from_summary(
                &self.metrics.customers_metric,
                "Customers",
                &outcome.customers,
                MetricUnit::Count,
            ),
        ]
    }

    pub fn anomaly_alert(
        &self,
        metric: &str,
        series: &MetricSeries,
        anomaly: &Anomaly,
    ) -> AnalyticsAlert {
        let severity = if anomaly.deviation_score > self.config.critical_deviation_score {
            AlertSeverity::Critical
        } else {
            AlertSeverity::Warning
        };
        let date = series.points.get(anomaly.index).map(|p| p.date);

        AnalyticsAlert {
            id: uuid::Uuid::new_v4().to_string(),
            severity,
            metric: metric.to_string(),
            message: format!(
                "{} was {:.2} against an expected {:.2} ({:.1} standard deviations)",
                metric, anomaly.actual, anomaly.expected, anomaly.deviation_score
            ),
            date,
            value: anomaly.actual,
        }
    }

    /// A warning for a KPI classified as decreasing, otherwise nothing.
    pub fn kpi_alert(&self, card: &KpiCard) -> Option<AnalyticsAlert> {
        (card.trend == TrendDirection::Decreasing).then(|| AnalyticsAlert {
            id: uuid::Uuid::new_v4().to_string(),
            severity: AlertSeverity::Warning,
            metric: card.metric.clone(),
            message: format!("{} is down {}", card.label, card.growth_label),
            date: None,
            value: card.growth,
        })
    }

    /// Alerts sorted critical first.
    pub fn alerts(&self, kpis: &[KpiCard], trends: &[TrendAnalysis]) -> Vec<AnalyticsAlert> {
        let mut alerts: Vec<AnalyticsAlert> =
            kpis.iter().filter_map(|k| self.kpi_alert(k)).collect();
        for trend in trends {
            alerts.extend(
                trend
                    .report
                    .anomalies
                    .iter()
                    .map(|a| self.anomaly_alert(&trend.metric, &trend.series, a)),
            );
        }
        alerts.sort_by(|a, b| b.severity.cmp(&a.severity));
        alerts
    }

    pub fn build_report(
        &self,
        period: DateRange,
        outcome: &AggregationOutcome,
        trends: Vec<TrendAnalysis>,
        correlations: Vec<CorrelationEntry>,
    ) -> ExecutiveReport {
        let kpis = self.kpi_cards(outcome);
        let alerts = self.alerts(&kpis, &trends);

        let report = ExecutiveReport {
            report_id: uuid::Uuid::new_v4().to_string(),
            generated_at: now_utc(),
            period,
            data_source: outcome.source,
            kpis,
            trends,
            correlations,
            alerts,
        };

        self.logger.info_with_meta(
            "Generated executive report",
            Some(&serde_json::json!({
                "report_id": report.report_id,
                "data_source": report.data_source,
                "alerts": report.alerts.len(),
                "trends": report.trends.len(),
            })),
        );

        report
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFrequency {
    Daily,
    Weekly(Weekday),
    /// Day of month, 1 through 28 so every month has it.
    Monthly(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSchedule {
    pub frequency: ReportFrequency,
    pub hour_utc: u32,
}

impl ReportSchedule {
    pub fn new(frequency: ReportFrequency, hour_utc: u32) -> AnalyticsResult<Self> {
        let schedule = Self {
            frequency,
            hour_utc,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn validate(&self) -> AnalyticsResult<()> {
        if self.hour_utc > 23 {
            return Err(AnalyticsError::validation_error(format!(
                "hour_utc must be between 0 and 23, got {}",
                self.hour_utc
            )));
        }
        if let ReportFrequency::Monthly(day) = self.frequency {
            if !(1..=28).contains(&day) {
                return Err(AnalyticsError::validation_error(format!(
                    "Monthly reports must run on day 1 through 28, got {}",
                    day
                )));
            }
        }
        Ok(())
    }

    /// First run strictly after `now`.
    pub fn next_run_after(&self, now: DateTime<Utc>) -> AnalyticsResult<DateTime<Utc>> {
        self.validate()?;
        let today = now.date_naive();

        match self.frequency {
            ReportFrequency::Daily => {
                let candidate = self.at_hour(today)?;
                if candidate > now {
                    Ok(candidate)
                } else {
                    self.at_hour(today + Duration::days(1))
                }
            }
            ReportFrequency::Weekly(weekday) => {
                let days_ahead = (7 + weekday.num_days_from_monday()
                    - today.weekday().num_days_from_monday())
                    % 7;
                let candidate = self.at_hour(today + Duration::days(days_ahead as i64))?;
                if candidate > now {
                    Ok(candidate)
                } else {
                    self.at_hour(today + Duration::days(days_ahead as i64 + 7))
                }
            }
            ReportFrequency::Monthly(day) => {
                let this_month = NaiveDate::from_ymd_opt(today.year(), today.month(), day)
                    .ok_or_else(|| AnalyticsError::internal_error("Invalid schedule date"))?;
                let candidate = self.at_hour(this_month)?;
                if candidate > now {
                    return Ok(candidate);
                }
                let (year, month) = if today.month() == 12 {
                    (today.year() + 1, 1)
                } else {
                    (today.year(), today.month() + 1)
                };
                let next_month = NaiveDate::from_ymd_opt(year, month, day)
                    .ok_or_else(|| AnalyticsError::internal_error("Invalid schedule date"))?;
                self.at_hour(next_month)
            }
        }
    }

    fn at_hour(&self, date: NaiveDate) -> AnalyticsResult<DateTime<Utc>> {
        let naive = date
            .and_hms_opt(self.hour_utc, 0, 0)
            .ok_or_else(|| AnalyticsError::validation_error("Invalid schedule hour"))?;
        Ok(Utc.from_utc_datetime(&naive))
    }
}
