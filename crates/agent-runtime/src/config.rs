//! Configuration for the agent iteration loop.

use action_executor::ExecutorConfig;
use serde::{Deserialize, Serialize};

/// Tunables for one agent's iteration loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Iterations before the loop fails with "maximum iterations reached".
    /// Default: 50
    pub max_iterations: u32,

    /// Fixed delay between iterations to let the page settle.
    /// Default: 1000
    pub inter_action_delay_ms: u64,

    /// Longer cooldown after an uncaught pass-level error.
    /// Default: 5000
    pub error_cooldown_ms: u64,

    /// Give up when this many consecutive results all failed.
    /// Default: 5
    pub failure_window: usize,

    /// Give up when this many consecutive actions were identical.
    /// Default: 3
    pub repeat_window: usize,

    /// Capture a screenshot into each context snapshot for the oracle.
    /// Default: true
    pub capture_context_screenshots: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            inter_action_delay_ms: 1_000,
            error_cooldown_ms: 5_000,
            failure_window: 5,
            repeat_window: 3,
            capture_context_screenshots: true,
        }
    }
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay-free preset for tests.
    pub fn minimal() -> Self {
        Self {
            max_iterations: 10,
            inter_action_delay_ms: 0,
            error_cooldown_ms: 0,
            failure_window: 5,
            repeat_window: 3,
            capture_context_screenshots: false,
        }
    }

    /// Builder: set the iteration budget.
    pub fn max_iterations(mut self, count: u32) -> Self {
        self.max_iterations = count;
        self
    }

    /// Builder: set the inter-action delay.
    pub fn inter_action_delay(mut self, ms: u64) -> Self {
        self.inter_action_delay_ms = ms;
        self
    }

    /// Builder: set the consecutive-failure give-up window.
    pub fn failure_window(mut self, window: usize) -> Self {
        self.failure_window = window;
        self
    }

    /// Builder: set the identical-action give-up window.
    pub fn repeat_window(mut self, window: usize) -> Self {
        self.repeat_window = window;
        self
    }

    /// Executor settings matching this loop config's latency profile.
    pub fn executor_config(&self) -> ExecutorConfig {
        if self.inter_action_delay_ms == 0 {
            ExecutorConfig::minimal()
        } else {
            ExecutorConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_contract() {
        let config = AgentConfig::default();
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.inter_action_delay_ms, 1_000);
        assert_eq!(config.failure_window, 5);
        assert_eq!(config.repeat_window, 3);
    }

    #[test]
    fn test_builder_chains() {
        let config = AgentConfig::new()
            .max_iterations(5)
            .inter_action_delay(0)
            .failure_window(2)
            .repeat_window(2);
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.failure_window, 2);
        assert_eq!(config.repeat_window, 2);
    }
}
