// Deterministic local refinement heuristic.
// Always available, no external dependencies: low ratings stretch every
// scene, high ratings tighten them down to a floor, middling ratings leave
// the structure alone.

use crate::core::config::RefineConfig;
use crate::core::types::FeedbackEvent;
use crate::refine::artifact::{ArtifactDescription, SceneDescriptor};

/// Produce the next artifact version from a feedback event.
///
/// The version increments even when no scene changes, so the history records
/// that the feedback was processed.
pub fn refine(
    config: &RefineConfig,
    artifact: &ArtifactDescription,
    event: &FeedbackEvent,
) -> ArtifactDescription {
    let scenes: Vec<SceneDescriptor> = if event.rating <= config.low_threshold {
        artifact
            .scenes
            .iter()
            .map(|scene| SceneDescriptor {
                asset: scene.asset.clone(),
                duration_secs: scene.duration_secs * (1.0 + config.lengthen_factor),
            })
            .collect()
    } else if event.rating >= config.high_threshold {
        artifact
            .scenes
            .iter()
            .map(|scene| SceneDescriptor {
                asset: scene.asset.clone(),
                duration_secs: (scene.duration_secs * (1.0 - config.shorten_factor))
                    .max(config.min_scene_duration_secs),
            })
            .collect()
    } else {
        artifact.scenes.clone()
    };

    artifact.next_version(scenes)
}
