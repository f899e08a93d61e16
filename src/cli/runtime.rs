//! Process bootstrap: logging and config discovery.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::fs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::PagePilotConfig;

pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

pub struct LoadedConfig {
    pub config: PagePilotConfig,
    pub path: Option<PathBuf>,
}

/// Resolve and load the config file. Priority:
/// explicit `--config` > ./config/pagepilot.yaml > ~/.config/pagepilot/config.yaml.
/// A missing file is not an error; defaults apply.
pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let candidate = match config_path {
        Some(path) => path.clone(),
        None => {
            let local = PathBuf::from("config/pagepilot.yaml");
            if local.exists() {
                local
            } else {
                let mut path = dirs::config_dir().context("Failed to get config directory")?;
                path.push("pagepilot");
                path.push("config.yaml");
                path
            }
        }
    };

    if candidate.exists() {
        let content = fs::read_to_string(&candidate)
            .await
            .context("Failed to read config file")?;
        let config: PagePilotConfig =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(LoadedConfig {
            config,
            path: Some(candidate),
        })
    } else if config_path.is_some() {
        anyhow::bail!("config file not found: {}", candidate.display());
    } else {
        Ok(LoadedConfig {
            config: PagePilotConfig::default(),
            path: None,
        })
    }
}
