//! Subcommand implementations.

use std::path::PathBuf;
use std::sync::Arc;

use action_executor::{validate, ActionExecutor};
use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use page_host::MockPageHost;
use pagepilot_core_types::TabId;
use replay::{ReplayEngine, ReplayOptions};
use tracing::info;

use crate::cli::skill_file;
use crate::config::PagePilotConfig;

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Check every action in a skill file without touching a page
    Validate(ValidateArgs),
    /// Print a skill's summary
    Info(InfoArgs),
    /// Dry-run a skill against the in-memory page host
    Replay(ReplayArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    /// Skill file (JSON or YAML), or a bare action array
    pub file: PathBuf,
}

#[derive(Args, Clone, Debug)]
pub struct InfoArgs {
    /// Skill file (JSON or YAML)
    pub file: PathBuf,
}

#[derive(Args, Clone, Debug)]
pub struct ReplayArgs {
    /// Skill file (JSON or YAML), or a bare action array
    pub file: PathBuf,
    /// Keep replaying after a failed action
    #[arg(long)]
    pub continue_on_error: bool,
    /// Navigate here before the first action, overriding the skill's
    /// declared start URL
    #[arg(long)]
    pub start_url: Option<String>,
}

pub async fn validate_cmd(args: &ValidateArgs) -> Result<()> {
    let skill = skill_file::load(&args.file).await?;
    let mut invalid = 0usize;

    for (index, action) in skill.actions.iter().enumerate() {
        match validate::validate(&action.kind) {
            Ok(()) => println!("  [{}] {} ok", index, action.kind.name()),
            Err(err) => {
                invalid += 1;
                println!("  [{}] {} INVALID: {}", index, action.kind.name(), err);
            }
        }
    }

    if invalid > 0 {
        bail!("{} of {} actions invalid", invalid, skill.actions.len());
    }
    println!("{} actions, all valid", skill.actions.len());
    Ok(())
}

pub async fn info_cmd(args: &InfoArgs) -> Result<()> {
    let skill = skill_file::load(&args.file).await?;

    println!("name:        {}", skill.name);
    println!("id:          {}", skill.id);
    if !skill.description.is_empty() {
        println!("description: {}", skill.description);
    }
    if !skill.metadata.tags.is_empty() {
        println!("tags:        {}", skill.metadata.tags.join(", "));
    }
    if let Some(url) = &skill.context.start_url {
        println!("start url:   {}", url);
    }
    println!("created:     {}", skill.metadata.created_at.to_rfc3339());
    println!("used:        {} times", skill.metadata.use_count);
    println!("actions:     {}", skill.actions.len());
    for (index, action) in skill.actions.iter().enumerate() {
        println!("  [{}] {}", index, action.kind.name());
    }
    Ok(())
}

pub async fn replay_cmd(args: &ReplayArgs, config: &PagePilotConfig) -> Result<()> {
    let skill = skill_file::load(&args.file).await?;
    info!(name = %skill.name, actions = skill.actions.len(), "dry-running skill");

    let host = Arc::new(MockPageHost::new());
    let engine = ReplayEngine::new(Arc::new(ActionExecutor::new(
        host,
        config.executor_config(),
    )));
    let tab = TabId::new();

    let mut options = ReplayOptions::minimal()
        .continue_on_error(args.continue_on_error || config.replay.continue_on_error);
    options.start_url = args.start_url.clone();

    let outcome = engine.replay_skill(&skill, &tab, &options).await;

    for (index, result) in outcome.executed.iter().enumerate() {
        let status = if result.success { "ok" } else { "FAILED" };
        match &result.error {
            Some(error) => println!(
                "  [{}] {} {} ({})",
                index,
                result.action.kind.name(),
                status,
                error
            ),
            None => println!("  [{}] {} {}", index, result.action.kind.name(), status),
        }
    }
    println!(
        "replayed {} of {} actions in {}ms",
        outcome.executed.len(),
        skill.actions.len(),
        outcome.duration_ms
    );

    if !outcome.success {
        bail!(
            "replay failed: {}",
            outcome.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
