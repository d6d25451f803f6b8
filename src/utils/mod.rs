// src/utils/mod.rs

pub mod error;
pub mod formatter;
pub mod helpers;
pub mod logger;
pub mod time;

// Re-export commonly used items
pub use error::{AnalyticsError, AnalyticsResult, ErrorDetails, ErrorKind};
pub use formatter::*;
pub use helpers::*;
pub use logger::*;
