// src/services/core/infrastructure/mod.rs

//! Infrastructure - the metric store boundary and the circuit breaker that guards it.

pub mod circuit_breaker;
pub mod metric_store;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStateInfo, CircuitState,
};
pub use metric_store::{
    InMemoryMetricStore, MetricQuery, MetricStoreReader, ObservationUpdate, StoreError,
    StoreResult, DEFAULT_QUERY_LIMIT,
};
