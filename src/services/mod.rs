// src/services/mod.rs

// Core services organized by domain
pub mod core;

pub use core::analytics::{AnalyticsModuleConfig, BusinessMetricsService};
pub use core::infrastructure::{InMemoryMetricStore, MetricStoreReader};
