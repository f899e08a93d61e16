//! Loading skills and bare action lists from disk.
//!
//! Two accepted shapes: a full skill object, or a bare JSON array of
//! actions (handy when hand-authoring). YAML works for both when the
//! file extension says so.

use std::path::Path;

use action_executor::Action;
use anyhow::{Context, Result};
use replay::Skill;
use tokio::fs;

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Load a skill, accepting a bare action array as an anonymous skill
/// named after the file.
pub async fn load(path: &Path) -> Result<Skill> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let skill = if is_yaml(path) {
        match serde_yaml::from_str::<Skill>(&content) {
            Ok(skill) => skill,
            Err(skill_err) => serde_yaml::from_str::<Vec<Action>>(&content)
                .map(|actions| anonymous(path, actions))
                .map_err(|_| skill_err)
                .context("Failed to parse skill file")?,
        }
    } else {
        match serde_json::from_str::<Skill>(&content) {
            Ok(skill) => skill,
            Err(skill_err) => serde_json::from_str::<Vec<Action>>(&content)
                .map(|actions| anonymous(path, actions))
                .map_err(|_| skill_err)
                .context("Failed to parse skill file")?,
        }
    };
    Ok(skill)
}

fn anonymous(path: &Path, actions: Vec<Action>) -> Skill {
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("unnamed")
        .to_string();
    Skill::new(name, actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_loads_bare_action_array() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[{{ "kind": "navigate", "url": "https://example.com" }}]"#
        )
        .unwrap();

        let skill = load(file.path()).await.unwrap();
        assert_eq!(skill.actions.len(), 1);
    }

    #[tokio::test]
    async fn test_loads_full_skill_object() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{
                "id": "skill-test",
                "name": "open example",
                "actions": [{{ "kind": "navigate", "url": "https://example.com" }}]
            }}"#
        )
        .unwrap();

        let skill = load(file.path()).await.unwrap();
        assert_eq!(skill.name, "open example");
    }

    #[tokio::test]
    async fn test_rejects_garbage() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "not json").unwrap();
        assert!(load(file.path()).await.is_err());
    }
}
