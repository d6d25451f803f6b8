// src/services/core/infrastructure/metric_store.rs

//! Metric Store - read boundary to the hosted relational metrics table.
//!
//! The analytics core only needs two calls: a filtered, date-descending page
//! of observations, and the narrow administrative update path. Any backend
//! (hosted Postgres client, test fixture) plugs in through
//! [`MetricStoreReader`]. [`InMemoryMetricStore`] is the bundled backend.

use crate::types::{AggregationLevel, DateRange, MetricCategory, MetricObservation};
use crate::utils::AnalyticsError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use thiserror::Error;

/// Page size the hosted table is queried with.
pub const DEFAULT_QUERY_LIMIT: usize = 365;

/// Key under `correlation_factors` holding an administratively set threshold.
pub const THRESHOLD_FACTOR: &str = "threshold";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Observation not found: {0}")]
    NotFound(String),
    #[error("Metric store unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid update: {0}")]
    InvalidUpdate(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AnalyticsError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => {
                AnalyticsError::not_found(format!("Observation not found: {}", id))
            }
            StoreError::Unavailable(msg) => AnalyticsError::upstream_unavailable(msg),
            StoreError::InvalidUpdate(msg) => AnalyticsError::validation_error(msg),
            StoreError::Serialization(e) => AnalyticsError::serialization_error(e.to_string()),
        }
    }
}

/// Filter passed to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricQuery {
    pub categories: Vec<MetricCategory>,
    pub aggregation_level: AggregationLevel,
    pub date_range: Option<DateRange>,
    pub limit: usize,
}

impl MetricQuery {
    pub fn new(categories: Vec<MetricCategory>, aggregation_level: AggregationLevel) -> Self {
        Self {
            categories,
            aggregation_level,
            date_range: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn matches(&self, observation: &MetricObservation) -> bool {
        self.categories.contains(&observation.category)
            && observation.aggregation_level == self.aggregation_level
            && self
                .date_range
                .map(|range| range.contains(observation.date))
                .unwrap_or(true)
    }
}

/// Fields the administrative path may change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationUpdate {
    pub value: Option<f64>,
    pub threshold: Option<f64>,
}

impl ObservationUpdate {
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.threshold.is_none()
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.is_empty() {
            return Err(StoreError::InvalidUpdate(
                "update must set value or threshold".to_string(),
            ));
        }
        for (field, v) in [("value", self.value), ("threshold", self.threshold)] {
            if let Some(v) = v {
                if !v.is_finite() {
                    return Err(StoreError::InvalidUpdate(format!(
                        "{} must be a finite number",
                        field
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn apply(&self, observation: &mut MetricObservation) {
        if let Some(value) = self.value {
            observation.value = value;
        }
        if let Some(threshold) = self.threshold {
            observation
                .correlation_factors
                .insert(THRESHOLD_FACTOR.to_string(), threshold);
        }
    }
}

#[async_trait]
pub trait MetricStoreReader: Send + Sync {
    /// Observations matching the query, newest first, at most `query.limit`.
    async fn query(&self, query: &MetricQuery) -> StoreResult<Vec<MetricObservation>>;

    async fn update(&self, id: &str, update: &ObservationUpdate) -> StoreResult<MetricObservation>;
}

/// Process-local store, used for tests, demos and cache-warmed snapshots
#[derive(Debug, Default)]
pub struct InMemoryMetricStore {
    observations: RwLock<Vec<MetricObservation>>,
}

impl InMemoryMetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observations(observations: Vec<MetricObservation>) -> Self {
        Self {
            observations: RwLock::new(observations),
        }
    }

    pub fn insert(&self, observation: MetricObservation) -> StoreResult<()> {
        let mut guard = self
            .observations
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        guard.push(observation);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.observations.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads observations from a JSON array.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        let observations: Vec<MetricObservation> = serde_json::from_str(json)?;
        crate::log_debug!(
            "Seeded in-memory metric store",
            serde_json::json!({ "observations": observations.len() })
        );
        Ok(Self::with_observations(observations))
    }
}

#[async_trait]
impl MetricStoreReader for InMemoryMetricStore {
    async fn query(&self, query: &MetricQuery) -> StoreResult<Vec<MetricObservation>> {
        let guard = self
            .observations
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;

        let mut rows: Vec<MetricObservation> =
            guard.iter().filter(|o| query.matches(o)).cloned().collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        rows.truncate(query.limit);
        Ok(rows)
    }

    async fn update(&self, id: &str, update: &ObservationUpdate) -> StoreResult<MetricObservation> {
        update.validate()?;

        let mut guard = self
            .observations
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;

        let observation = guard
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        update.apply(observation);
        Ok(observation.clone())
    }
}
