//! Skill data model.

use action_executor::Action;
use chrono::{DateTime, Utc};
use pagepilot_core_types::SkillId;
use serde::{Deserialize, Serialize};

/// Usage bookkeeping, mutated on every replay.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SkillMetadata {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub use_count: u64,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    1
}

/// Where a skill expects to run. All fields advisory; `start_url`
/// additionally drives the pre-replay navigation when set.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SkillContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_elements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_domain: Option<String>,
}

/// A persisted, named, ordered action list usable for deterministic
/// replay.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub actions: Vec<Action>,
    #[serde(default)]
    pub metadata: SkillMetadata,
    #[serde(default)]
    pub context: SkillContext,
}

impl Skill {
    pub fn new(name: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            id: SkillId::new(),
            name: name.into(),
            description: String::new(),
            actions,
            metadata: SkillMetadata {
                created_at: Utc::now(),
                version: 1,
                ..SkillMetadata::default()
            },
            context: SkillContext::default(),
        }
    }

    /// Distill a skill from a finished agent's successful-action
    /// subsequence. The caller passes the output of
    /// `AgentRuntime::successful_actions`.
    pub fn from_successful_actions(
        name: impl Into<String>,
        description: impl Into<String>,
        actions: Vec<Action>,
        start_url: Option<String>,
    ) -> Self {
        let mut skill = Self::new(name, actions);
        skill.description = description.into();
        skill.context.start_url = start_url;
        skill
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.metadata.tags = tags;
        self
    }

    pub fn with_start_url(mut self, url: impl Into<String>) -> Self {
        self.context.start_url = Some(url.into());
        self
    }

    /// Bump usage counters after a replay. Persistence of the updated
    /// record is the store's concern.
    pub fn record_use(&mut self) {
        self.metadata.use_count += 1;
        self.metadata.last_used_at = Some(Utc::now());
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.metadata.tags.iter().any(|t| t == tag)
    }
}
