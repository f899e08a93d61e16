//! Skill storage and deterministic replay.
//!
//! A skill is a named, ordered action list, typically distilled from a
//! completed agent's successful actions. The replay engine drives the
//! action executor over such a list without any planning involved.

pub mod engine;
pub mod model;
pub mod store;

pub use engine::{ReplayEngine, ReplayOptions, ReplayOutcome};
pub use model::{Skill, SkillContext, SkillMetadata};
pub use store::{SkillStore, StoreError};
