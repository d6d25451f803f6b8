// src/types.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Business area a metric belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricCategory {
    Sales,
    Inventory,
    Marketing,
    Customers,
    Operations,
    Financial,
}

impl MetricCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricCategory::Sales => "sales",
            MetricCategory::Inventory => "inventory",
            MetricCategory::Marketing => "marketing",
            MetricCategory::Customers => "customers",
            MetricCategory::Operations => "operations",
            MetricCategory::Financial => "financial",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sales" => Some(MetricCategory::Sales),
            "inventory" => Some(MetricCategory::Inventory),
            "marketing" => Some(MetricCategory::Marketing),
            "customers" => Some(MetricCategory::Customers),
            "operations" => Some(MetricCategory::Operations),
            "financial" => Some(MetricCategory::Financial),
            _ => None,
        }
    }
}

impl std::fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MetricUnit {
    Currency,
    #[default]
    Count,
    Percentage,
    Ratio,
}

/// Granularity at which a value was pre-aggregated upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AggregationLevel {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Quarterly,
}

impl AggregationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationLevel::Daily => "daily",
            AggregationLevel::Weekly => "weekly",
            AggregationLevel::Monthly => "monthly",
            AggregationLevel::Quarterly => "quarterly",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "daily" => Some(AggregationLevel::Daily),
            "weekly" => Some(AggregationLevel::Weekly),
            "monthly" => Some(AggregationLevel::Monthly),
            "quarterly" => Some(AggregationLevel::Quarterly),
            _ => None,
        }
    }
}

impl std::fmt::Display for AggregationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single recorded measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricObservation {
    pub id: String,
    pub date: NaiveDate,
    pub category: MetricCategory,
    pub name: String,
    pub value: f64,
    pub unit: MetricUnit,
    pub aggregation_level: AggregationLevel,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub correlation_factors: HashMap<String, f64>,
}

impl MetricObservation {
    pub fn new(
        date: NaiveDate,
        category: MetricCategory,
        name: impl Into<String>,
        value: f64,
        unit: MetricUnit,
        aggregation_level: AggregationLevel,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            date,
            category,
            name: name.into(),
            value,
            unit,
            aggregation_level,
            correlation_factors: HashMap::new(),
        }
    }

    pub fn with_factor(mut self, key: impl Into<String>, value: f64) -> Self {
        self.correlation_factors.insert(key.into(), value);
        self
    }
}

/// Inclusive calendar window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
            TrendDirection::Stable => "stable",
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived per-request summary of one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMetricSummary {
    pub total: f64,
    pub growth: f64,
    pub trend: TrendDirection,
}

impl AggregatedMetricSummary {
    pub fn zeroed() -> Self {
        Self {
            total: 0.0,
            growth: 0.0,
            trend: TrendDirection::Stable,
        }
    }
}

impl Default for AggregatedMetricSummary {
    fn default() -> Self {
        Self::zeroed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Date-ordered values for one metric. Same-date values are summed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub name: String,
    pub points: Vec<SeriesPoint>,
}

impl MetricSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: Vec::new(),
        }
    }

    /// Builds a series from arbitrary points, summing duplicates and
    /// sorting ascending by date.
    pub fn from_points(
        name: impl Into<String>,
        points: impl IntoIterator<Item = SeriesPoint>,
    ) -> Self {
        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for point in points {
            *by_date.entry(point.date).or_insert(0.0) += point.value;
        }
        Self {
            name: name.into(),
            points: by_date
                .into_iter()
                .map(|(date, value)| SeriesPoint { date, value })
                .collect(),
        }
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Identifies one logical metric series in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricSelector {
    pub category: MetricCategory,
    pub name: String,
}

impl MetricSelector {
    pub fn new(category: MetricCategory, name: impl Into<String>) -> Self {
        Self {
            category,
            name: name.into(),
        }
    }

    pub fn key(&self) -> String {
        format!("{}.{}", self.category.as_str(), self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    /// Pearson r in [-1, 1]
    pub coefficient: f64,
    /// Two-tailed p-value
    pub significance: f64,
    pub sample_size: usize,
    /// Set when either series had zero variance and the fallback was used.
    pub degenerate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    /// Position in the analyzed series.
    pub index: usize,
    /// Baseline the point was scored against: the series mean by default,
    /// the fitted regression value only under `AnomalyBaseline::RegressionFit`.
    pub expected: f64,
    pub actual: f64,
    pub deviation_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub direction: TrendDirection,
    /// R² of the fit, in [0, 1]
    pub strength: f64,
    pub slope: f64,
    pub intercept: f64,
    pub anomalies: Vec<Anomaly>,
}
