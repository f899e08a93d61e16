//! In-memory skill store.
//!
//! The durable storage collaborator lives outside the core; this store
//! is the in-process registry it syncs against, and what tests and the
//! CLI run on directly.

use std::collections::HashMap;

use pagepilot_core_types::SkillId;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

use crate::model::Skill;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("skill not found: {0}")]
    NotFound(SkillId),
    #[error("skill name already in use: {0}")]
    DuplicateName(String),
}

#[derive(Default)]
pub struct SkillStore {
    skills: RwLock<HashMap<SkillId, Skill>>,
}

impl SkillStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new skill. Names are unique so callers can address
    /// skills by name from the CLI.
    pub fn save(&self, skill: Skill) -> Result<SkillId, StoreError> {
        let mut skills = self.skills.write();
        if skills
            .values()
            .any(|existing| existing.name == skill.name && existing.id != skill.id)
        {
            return Err(StoreError::DuplicateName(skill.name));
        }
        let id = skill.id.clone();
        debug!(skill = %id, name = %skill.name, "skill saved");
        skills.insert(id.clone(), skill);
        Ok(id)
    }

    pub fn get(&self, id: &SkillId) -> Result<Skill, StoreError> {
        self.skills
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    pub fn get_by_name(&self, name: &str) -> Option<Skill> {
        self.skills
            .read()
            .values()
            .find(|skill| skill.name == name)
            .cloned()
    }

    pub fn remove(&self, id: &SkillId) -> Result<Skill, StoreError> {
        self.skills
            .write()
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    /// All skills, newest first.
    pub fn list(&self) -> Vec<Skill> {
        let mut skills: Vec<Skill> = self.skills.read().values().cloned().collect();
        skills.sort_by(|a, b| b.metadata.created_at.cmp(&a.metadata.created_at));
        skills
    }

    pub fn find_by_tag(&self, tag: &str) -> Vec<Skill> {
        self.skills
            .read()
            .values()
            .filter(|skill| skill.has_tag(tag))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.skills.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.read().is_empty()
    }

    /// Bump the usage counters of a stored skill after a replay.
    pub fn mark_used(&self, id: &SkillId) -> Result<(), StoreError> {
        let mut skills = self.skills.write();
        let skill = skills
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        skill.record_use();
        Ok(())
    }
}
