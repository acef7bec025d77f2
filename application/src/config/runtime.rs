//! Hardware monitoring and tool execution parameters.

use std::time::Duration;

/// Periodic hardware scanning.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

/// Tool execution defaults.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Acquire `requires_device` automatically around dispatch
    pub auto_acquire: bool,
    /// Maximum tools returned by `suggest_tools`
    pub suggestion_limit: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            auto_acquire: true,
            suggestion_limit: 5,
        }
    }
}

impl ExecutorConfig {
    pub fn with_auto_acquire(mut self, enabled: bool) -> Self {
        self.auto_acquire = enabled;
        self
    }

    pub fn with_suggestion_limit(mut self, limit: usize) -> Self {
        self.suggestion_limit = limit;
        self
    }
}
