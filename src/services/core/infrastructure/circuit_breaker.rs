// src/services/core/infrastructure/circuit_breaker.rs

// Circuit breaker guarding metric store calls. Consecutive failures open the
// circuit. Once the timeout has passed the circuit goes half-open and lets
// calls through; `success_threshold` successes close it, any failure reopens it.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::utils::{AnalyticsError, AnalyticsResult};

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Enable circuit breaker functionality
    pub enabled: bool,
    /// Consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Successes in half-open needed to close the circuit
    pub success_threshold: u32,
    /// Seconds to stay open before going half-open
    pub timeout_seconds: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 3,
            success_threshold: 1,
            timeout_seconds: 30,
        }
    }
}

impl CircuitBreakerConfig {
    /// Fail fast, recover fast
    pub fn high_performance() -> Self {
        Self {
            failure_threshold: 2,
            timeout_seconds: 10,
            ..Default::default()
        }
    }

    /// Tolerate flaky upstreams before tripping
    pub fn high_reliability() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout_seconds: 60,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> AnalyticsResult<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.failure_threshold == 0 {
            return Err(AnalyticsError::configuration_error(
                "Failure threshold must be greater than 0",
            ));
        }

        if self.success_threshold == 0 {
            return Err(AnalyticsError::configuration_error(
                "Success threshold must be greater than 0",
            ));
        }

        if self.timeout_seconds == 0 {
            return Err(AnalyticsError::configuration_error(
                "Timeout must be greater than 0",
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }

    pub fn is_operational(&self) -> bool {
        matches!(self, CircuitState::Closed | CircuitState::HalfOpen)
    }
}

#[derive(Debug)]
pub struct CircuitBreaker {
    id: String,
    config: CircuitBreakerConfig,
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    opened_at: Option<Instant>,
    last_state_change: Instant,
    total_requests: u64,
    total_failures: u64,
    total_successes: u64,
}

impl CircuitBreaker {
    pub fn new(id: impl Into<String>, config: CircuitBreakerConfig) -> AnalyticsResult<Self> {
        config.validate()?;

        Ok(Self {
            id: id.into(),
            config,
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            opened_at: None,
            last_state_change: Instant::now(),
            total_requests: 0,
            total_failures: 0,
            total_successes: 0,
        })
    }

    /// Whether a call may go through. An open circuit whose timeout has
    /// elapsed moves to half-open and admits the call.
    pub fn can_execute(&mut self) -> bool {
        if !self.config.enabled {
            return true;
        }

        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let timeout = Duration::from_secs(self.config.timeout_seconds);
                match self.opened_at {
                    Some(opened_at) if opened_at.elapsed() >= timeout => {
                        self.transition_to(CircuitState::HalfOpen);
                        true
                    }
                    _ => false,
                }
            }
        }
    }

    pub fn record_success(&mut self) {
        self.total_requests += 1;
        self.total_successes += 1;

        match self.state {
            CircuitState::HalfOpen => {
                self.success_count += 1;
                if self.success_count >= self.config.success_threshold {
                    self.transition_to(CircuitState::Closed);
                }
            }
            CircuitState::Closed | CircuitState::Open => {
                self.failure_count = 0;
            }
        }
    }

    pub fn record_failure(&mut self) {
        self.total_requests += 1;
        self.total_failures += 1;
        self.failure_count += 1;

        match self.state {
            CircuitState::Closed => {
                if self.failure_count >= self.config.failure_threshold {
                    self.transition_to(CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                self.transition_to(CircuitState::Open);
            }
            CircuitState::Open => {}
        }
    }

    pub fn force_state(&mut self, state: CircuitState) {
        self.transition_to(state);
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    pub fn success_rate(&self) -> f32 {
        if self.total_requests == 0 {
            return 1.0;
        }
        self.total_successes as f32 / self.total_requests as f32
    }

    pub fn state_info(&self) -> CircuitBreakerStateInfo {
        CircuitBreakerStateInfo {
            id: self.id.clone(),
            state: self.state,
            failure_count: self.failure_count,
            success_count: self.success_count,
            success_rate: self.success_rate(),
            total_requests: self.total_requests,
            total_failures: self.total_failures,
            seconds_in_current_state: self.last_state_change.elapsed().as_secs(),
        }
    }

    fn transition_to(&mut self, state: CircuitState) {
        self.state = state;
        self.last_state_change = Instant::now();
        self.failure_count = 0;
        self.success_count = 0;
        self.opened_at = match state {
            CircuitState::Open => Some(Instant::now()),
            _ => None,
        };
    }
}

/// Circuit breaker state information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerStateInfo {
    pub id: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub success_rate: f32,
    pub total_requests: u64,
    pub total_failures: u64,
    pub seconds_in_current_state: u64,
}
