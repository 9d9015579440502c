// Refinement engine: remote-first with a deterministic local fallback.
// A remote failure of any class (timeout, transport, malformed response)
// never propagates to the caller.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::config::RefineConfig;
use crate::core::types::FeedbackEvent;
use crate::error::ReelsmithResult;
use crate::refine::artifact::{validate_scenes, ArtifactDescription};
use crate::refine::local;
use crate::refine::remote::Enhancer;

/// Produces the next artifact version for a feedback event.
///
/// When a remote enhancer is configured it is tried first under a timeout;
/// its result is validated before being accepted, and partial or malformed
/// results are discarded in favor of the local heuristic. Without an
/// enhancer, refinement is purely local.
pub struct RefinementEngine {
    config: RefineConfig,
    enhancer: Option<Arc<dyn Enhancer>>,
    timeout: Duration,
}

impl RefinementEngine {
    pub fn new(
        config: RefineConfig,
        enhancer: Option<Arc<dyn Enhancer>>,
        timeout: Duration,
    ) -> Self {
        Self {
            config,
            enhancer,
            timeout,
        }
    }

    /// Refine an artifact in response to feedback. Always succeeds: the
    /// local strategy is total. The returned artifact carries the next
    /// version number and a recomputed total duration.
    pub async fn refine(
        &self,
        artifact: &ArtifactDescription,
        event: &FeedbackEvent,
    ) -> ArtifactDescription {
        if let Some(enhancer) = &self.enhancer {
            match tokio::time::timeout(self.timeout, enhancer.enhance(artifact, event)).await {
                Ok(Ok(candidate)) => match self.accept_remote(artifact, candidate) {
                    Ok(accepted) => {
                        debug!(
                            content_id = %artifact.content_id,
                            version = accepted.version,
                            "remote enhancement accepted"
                        );
                        return accepted;
                    }
                    Err(error) => {
                        warn!(
                            content_id = %artifact.content_id,
                            %error,
                            "remote enhancement returned malformed artifact, using local refinement"
                        );
                    }
                },
                Ok(Err(error)) => {
                    warn!(
                        content_id = %artifact.content_id,
                        %error,
                        "remote enhancement failed, using local refinement"
                    );
                }
                Err(_) => {
                    warn!(
                        content_id = %artifact.content_id,
                        timeout_secs = self.timeout.as_secs(),
                        "remote enhancement timed out, using local refinement"
                    );
                }
            }
        }

        local::refine(&self.config, artifact, event)
    }

    /// Validate a remote candidate and rebase it onto the current version
    /// chain. Only the scene structure is taken from the remote result;
    /// identity, version and total duration are recomputed locally so a
    /// confused remote cannot corrupt the history.
    fn accept_remote(
        &self,
        current: &ArtifactDescription,
        candidate: ArtifactDescription,
    ) -> ReelsmithResult<ArtifactDescription> {
        validate_scenes(&candidate.scenes)?;
        Ok(current.next_version(candidate.scenes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::error::ReelsmithError;
    use crate::refine::artifact::SceneDescriptor;
    use async_trait::async_trait;
    use tokio::runtime::Runtime;
    use uuid::Uuid;

    struct FailingEnhancer;

    #[async_trait]
    impl Enhancer for FailingEnhancer {
        async fn enhance(
            &self,
            _artifact: &ArtifactDescription,
            _feedback: &FeedbackEvent,
        ) -> ReelsmithResult<ArtifactDescription> {
            Err(ReelsmithError::enhancement("service unavailable"))
        }
    }

    struct HangingEnhancer;

    #[async_trait]
    impl Enhancer for HangingEnhancer {
        async fn enhance(
            &self,
            _artifact: &ArtifactDescription,
            _feedback: &FeedbackEvent,
        ) -> ReelsmithResult<ArtifactDescription> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!("the engine times out first")
        }
    }

    struct MalformedEnhancer;

    #[async_trait]
    impl Enhancer for MalformedEnhancer {
        async fn enhance(
            &self,
            artifact: &ArtifactDescription,
            _feedback: &FeedbackEvent,
        ) -> ReelsmithResult<ArtifactDescription> {
            let mut broken = artifact.clone();
            broken.scenes.clear();
            Ok(broken)
        }
    }

    struct RewritingEnhancer;

    #[async_trait]
    impl Enhancer for RewritingEnhancer {
        async fn enhance(
            &self,
            artifact: &ArtifactDescription,
            _feedback: &FeedbackEvent,
        ) -> ReelsmithResult<ArtifactDescription> {
            let mut revised = artifact.clone();
            revised.scenes = vec![SceneDescriptor::new("remixed.mp4", 7.5)];
            // A remote service reporting nonsense metadata must not matter
            revised.version = 99;
            revised.total_duration_secs = -1.0;
            Ok(revised)
        }
    }

    fn artifact() -> ArtifactDescription {
        ArtifactDescription::new(
            Uuid::new_v4(),
            vec![
                SceneDescriptor::new("a.png", 5.0),
                SceneDescriptor::new("b.png", 10.0),
            ],
        )
        .unwrap()
    }

    fn engine(enhancer: Option<Arc<dyn Enhancer>>) -> RefinementEngine {
        RefinementEngine::new(
            EngineConfig::default().refine,
            enhancer,
            Duration::from_millis(50),
        )
    }

    #[test]
    fn test_failing_remote_falls_back_to_local() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let engine = engine(Some(Arc::new(FailingEnhancer)));
            let source = artifact();
            let refined = engine
                .refine(&source, &FeedbackEvent::new(source.content_id, 1))
                .await;

            // Local low-rating heuristic applied, version still advanced
            assert_eq!(refined.version, 2);
            assert!((refined.scenes[0].duration_secs - 6.0).abs() < 1e-9);
            assert!((refined.scenes[1].duration_secs - 12.0).abs() < 1e-9);
        });
    }

    #[test]
    fn test_hanging_remote_times_out_and_falls_back() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let engine = engine(Some(Arc::new(HangingEnhancer)));
            let source = artifact();
            let refined = engine
                .refine(&source, &FeedbackEvent::new(source.content_id, 5))
                .await;

            assert_eq!(refined.version, 2);
            assert!((refined.scenes[0].duration_secs - 4.5).abs() < 1e-9);
        });
    }

    #[test]
    fn test_malformed_remote_result_is_discarded() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let engine = engine(Some(Arc::new(MalformedEnhancer)));
            let source = artifact();
            let refined = engine
                .refine(&source, &FeedbackEvent::new(source.content_id, 3))
                .await;

            assert_eq!(refined.version, 2);
            assert_eq!(refined.scenes, source.scenes);
        });
    }

    #[test]
    fn test_accepted_remote_is_rebased_onto_version_chain() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let engine = engine(Some(Arc::new(RewritingEnhancer)));
            let source = artifact();
            let refined = engine
                .refine(&source, &FeedbackEvent::new(source.content_id, 3))
                .await;

            assert_eq!(refined.version, source.version + 1);
            assert_eq!(refined.scenes.len(), 1);
            assert!((refined.total_duration_secs - 7.5).abs() < 1e-9);
        });
    }

    #[test]
    fn test_no_enhancer_refines_locally() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let engine = engine(None);
            let source = artifact();
            let refined = engine
                .refine(&source, &FeedbackEvent::new(source.content_id, 3))
                .await;

            assert_eq!(refined.version, 2);
            assert_eq!(refined.scenes, source.scenes);
        });
    }
}
