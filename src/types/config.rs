//! Configuration structures.
//!
//! Configuration is loaded from environment variables and config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Global server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Discovery-protocol rate limits.
    #[serde(default)]
    pub limits: ProtocolLimits,
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Rate-limit windows for the three-stage discovery protocol.
///
/// The details stage and the execute stage count against independent
/// windows; unlocking a tool 50 times must not consume execute budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolLimits {
    /// Maximum `get_details` calls per tool within the window.
    pub details_per_window: u32,

    /// Maximum `execute` calls per tool within the window.
    pub execute_per_window: u32,

    /// Sliding window length for both counters.
    #[serde(with = "humantime_serde")]
    pub window: Duration,
}

impl Default for ProtocolLimits {
    fn default() -> Self {
        Self {
            details_per_window: 50,
            execute_per_window: 20,
            window: Duration::from_secs(60),
        }
    }
}
