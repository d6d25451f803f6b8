// src/services/core/mod.rs

pub mod analytics;
pub mod infrastructure;

// Re-export all services for convenience
pub use analytics::*;
pub use infrastructure::*;
