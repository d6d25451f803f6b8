//! Business metrics core for executive analytics dashboards.
//!
//! The computation API ([`aggregate`], [`correlate`], [`analyze_trend`]) is
//! synchronous and pure over already-fetched [`types::MetricObservation`]s.
//! [`BusinessMetricsService`] wraps it with permission checks, a circuit
//! breaker and a [`MetricStoreReader`] fetch.

// Module declarations
pub mod middleware;
pub mod services;
pub mod types;
pub mod utils;

pub use middleware::rbac::{AnalyticsAction, PermissionChecker, RoleBasedPermissionChecker};
pub use services::core::analytics::{
    aggregate, analyze_trend, classify, correlate, growth, AggregationOutcome, AggregationRequest,
    AnalyticsModuleConfig, BusinessMetricsService, CorrelationMatrix, DataSource,
    ExecutiveReport, ExecutiveReportRequest, TREND_THRESHOLD_PERCENT,
};
pub use services::core::infrastructure::{InMemoryMetricStore, MetricQuery, MetricStoreReader};
pub use types::*;
pub use utils::{AnalyticsError, AnalyticsResult, ErrorKind};
