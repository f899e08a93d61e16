//! CLI configuration, loaded from YAML.

use action_executor::ExecutorConfig;
use agent_runtime::AgentConfig;
use serde::{Deserialize, Serialize};

/// Top-level config file shape.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PagePilotConfig {
    pub log_level: String,
    pub agent: AgentSettings,
    pub executor: ExecutorSettings,
    pub replay: ReplaySettings,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub max_iterations: u32,
    pub inter_action_delay_ms: u64,
    pub capture_screenshots: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub page_load_timeout_ms: u64,
    pub element_wait_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplaySettings {
    pub continue_on_error: bool,
    pub inter_action_delay_ms: u64,
}

impl Default for PagePilotConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            agent: AgentSettings::default(),
            executor: ExecutorSettings::default(),
            replay: ReplaySettings::default(),
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        let defaults = AgentConfig::new();
        Self {
            max_iterations: defaults.max_iterations,
            inter_action_delay_ms: defaults.inter_action_delay_ms,
            capture_screenshots: defaults.capture_context_screenshots,
        }
    }
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        let defaults = ExecutorConfig::default();
        Self {
            max_retries: defaults.max_retries,
            retry_delay_ms: defaults.retry_delay_ms,
            page_load_timeout_ms: defaults.page_load_timeout_ms,
            element_wait_ms: defaults.element_wait_ms,
        }
    }
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            continue_on_error: false,
            inter_action_delay_ms: 1_000,
        }
    }
}

impl PagePilotConfig {
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig::new()
            .max_iterations(self.agent.max_iterations)
            .inter_action_delay(self.agent.inter_action_delay_ms)
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::default().retries(self.executor.max_retries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_yields_defaults() {
        let config: PagePilotConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.executor.max_retries, 3);
        assert!(!config.replay.continue_on_error);
    }

    #[test]
    fn test_partial_yaml_overrides_one_section() {
        let raw = "agent:\n  max_iterations: 5\n";
        let config: PagePilotConfig = serde_yaml::from_str(raw).unwrap();
        assert_eq!(config.agent.max_iterations, 5);
        assert_eq!(config.agent.inter_action_delay_ms, 1000);
    }
}
