//! Structured descriptions of generated output.
//!
//! An artifact is an ordered sequence of scenes with durations. Versions
//! increase monotonically per content item; every superseded version is
//! retained for audit.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::ContentId;
use crate::error::{ReelsmithError, ReelsmithResult};

/// One scene in a rendered artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDescriptor {
    /// Reference to the source asset this scene renders
    pub asset: String,
    /// How long the scene plays, in seconds
    pub duration_secs: f64,
}

impl SceneDescriptor {
    pub fn new(asset: impl Into<String>, duration_secs: f64) -> Self {
        Self {
            asset: asset.into(),
            duration_secs,
        }
    }
}

/// Structured description of one generated artifact version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactDescription {
    pub content_id: ContentId,
    /// Monotonically increasing per content item, starting at 1
    pub version: u64,
    /// Ordered scene list
    pub scenes: Vec<SceneDescriptor>,
    /// Always the sum of scene durations
    pub total_duration_secs: f64,
    pub created_at: DateTime<Utc>,
}

impl ArtifactDescription {
    /// Create the initial (version 1) artifact for a content item.
    pub fn new(content_id: ContentId, scenes: Vec<SceneDescriptor>) -> ReelsmithResult<Self> {
        validate_scenes(&scenes)?;
        let total_duration_secs = total_duration(&scenes);
        Ok(Self {
            content_id,
            version: 1,
            scenes,
            total_duration_secs,
            created_at: Utc::now(),
        })
    }

    /// Build the successor version from a revised scene list. The caller is
    /// responsible for having validated the scenes.
    pub fn next_version(&self, scenes: Vec<SceneDescriptor>) -> ArtifactDescription {
        let total_duration_secs = total_duration(&scenes);
        ArtifactDescription {
            content_id: self.content_id,
            version: self.version + 1,
            scenes,
            total_duration_secs,
            created_at: Utc::now(),
        }
    }

    /// Check the structural invariants of this artifact.
    pub fn validate(&self) -> ReelsmithResult<()> {
        validate_scenes(&self.scenes)?;
        let expected = total_duration(&self.scenes);
        if (self.total_duration_secs - expected).abs() > 1e-6 {
            return Err(ReelsmithError::malformed_artifact(format!(
                "total duration {} does not match scene sum {}",
                self.total_duration_secs, expected
            )));
        }
        Ok(())
    }
}

/// Reject empty scene lists and non-positive or non-finite durations.
pub fn validate_scenes(scenes: &[SceneDescriptor]) -> ReelsmithResult<()> {
    if scenes.is_empty() {
        return Err(ReelsmithError::malformed_artifact("empty scene list"));
    }
    for (index, scene) in scenes.iter().enumerate() {
        if !scene.duration_secs.is_finite() || scene.duration_secs <= 0.0 {
            return Err(ReelsmithError::malformed_artifact(format!(
                "scene {} has invalid duration {}",
                index, scene.duration_secs
            )));
        }
    }
    Ok(())
}

fn total_duration(scenes: &[SceneDescriptor]) -> f64 {
    scenes.iter().map(|scene| scene.duration_secs).sum()
}

/// Per-content artifact version history.
///
/// Refinement never overwrites in place: each new version is appended and
/// every prior version stays readable for audit. Mutations for one content
/// item are serialized by the dispatcher; the map itself is safe for
/// concurrent access across items.
#[derive(Debug, Default)]
pub struct ArtifactVault {
    inner: DashMap<ContentId, Vec<ArtifactDescription>>,
}

impl ArtifactVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the initial artifact for a content item.
    pub fn seed(&self, artifact: ArtifactDescription) -> ReelsmithResult<()> {
        artifact.validate()?;
        let content_id = artifact.content_id;
        if self.inner.contains_key(&content_id) {
            return Err(ReelsmithError::AlreadyRegistered { content_id });
        }
        self.inner.insert(content_id, vec![artifact]);
        Ok(())
    }

    /// Append a refined version. The version number must be exactly one past
    /// the latest retained version.
    pub fn push(&self, artifact: ArtifactDescription) -> ReelsmithResult<()> {
        let mut history = self
            .inner
            .get_mut(&artifact.content_id)
            .ok_or(ReelsmithError::ArtifactNotFound {
                content_id: artifact.content_id,
                version: None,
            })?;

        let latest = history.last().map(|a| a.version).unwrap_or(0);
        if artifact.version != latest + 1 {
            return Err(ReelsmithError::malformed_artifact(format!(
                "version {} does not follow latest {}",
                artifact.version, latest
            )));
        }
        history.push(artifact);
        Ok(())
    }

    /// Latest artifact version for a content item
    pub fn latest(&self, content_id: ContentId) -> Option<ArtifactDescription> {
        self.inner
            .get(&content_id)
            .and_then(|history| history.last().cloned())
    }

    /// A specific retained version
    pub fn get(&self, content_id: ContentId, version: u64) -> Option<ArtifactDescription> {
        self.inner.get(&content_id).and_then(|history| {
            history
                .iter()
                .find(|artifact| artifact.version == version)
                .cloned()
        })
    }

    /// Number of retained versions for a content item
    pub fn history_len(&self, content_id: ContentId) -> usize {
        self.inner
            .get(&content_id)
            .map(|history| history.len())
            .unwrap_or(0)
    }

    pub fn contains(&self, content_id: ContentId) -> bool {
        self.inner.contains_key(&content_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn scenes() -> Vec<SceneDescriptor> {
        vec![
            SceneDescriptor::new("intro.png", 5.0),
            SceneDescriptor::new("main.mp4", 10.0),
        ]
    }

    #[test]
    fn test_total_duration_is_scene_sum() {
        let artifact = ArtifactDescription::new(Uuid::new_v4(), scenes()).unwrap();
        assert_eq!(artifact.version, 1);
        assert!((artifact.total_duration_secs - 15.0).abs() < 1e-9);
        artifact.validate().unwrap();
    }

    #[test]
    fn test_rejects_invalid_scenes() {
        assert!(ArtifactDescription::new(Uuid::new_v4(), vec![]).is_err());
        assert!(ArtifactDescription::new(
            Uuid::new_v4(),
            vec![SceneDescriptor::new("a", 0.0)]
        )
        .is_err());
        assert!(ArtifactDescription::new(
            Uuid::new_v4(),
            vec![SceneDescriptor::new("a", f64::NAN)]
        )
        .is_err());
    }

    #[test]
    fn test_vault_retains_history() {
        let vault = ArtifactVault::new();
        let v1 = ArtifactDescription::new(Uuid::new_v4(), scenes()).unwrap();
        let content_id = v1.content_id;
        vault.seed(v1.clone()).unwrap();

        let v2 = v1.next_version(vec![SceneDescriptor::new("main.mp4", 8.0)]);
        vault.push(v2).unwrap();

        assert_eq!(vault.latest(content_id).unwrap().version, 2);
        assert_eq!(vault.get(content_id, 1).unwrap().version, 1);
        assert_eq!(vault.history_len(content_id), 2);
    }

    #[test]
    fn test_vault_rejects_duplicate_seed_and_version_gaps() {
        let vault = ArtifactVault::new();
        let v1 = ArtifactDescription::new(Uuid::new_v4(), scenes()).unwrap();
        vault.seed(v1.clone()).unwrap();
        assert!(vault.seed(v1.clone()).is_err());

        let mut skipped = v1.next_version(scenes());
        skipped.version = 5;
        assert!(vault.push(skipped).is_err());
    }

    #[test]
    fn test_vault_push_unknown_content_fails() {
        let vault = ArtifactVault::new();
        let artifact = ArtifactDescription::new(Uuid::new_v4(), scenes()).unwrap();
        assert!(matches!(
            vault.push(artifact),
            Err(ReelsmithError::ArtifactNotFound { .. })
        ));
    }
}
