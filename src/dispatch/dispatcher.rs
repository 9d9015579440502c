// Feedback dispatcher: the single entry point invoked when a rating
// arrives. Serializes handling per content identifier and fans out to the
// learning agent and the refinement engine.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::core::config::{EngineConfig, RewardConfig};
use crate::core::types::{ContentId, ContentItem, FeedbackEvent};
use crate::dispatch::providers::{ContentIngest, ContentRegistry, SignalProvider, TagMutator};
use crate::error::{ReelsmithError, ReelsmithResult};
use crate::learning::action::TagAction;
use crate::learning::agent::QLearningAgent;
use crate::learning::replay::Transition;
use crate::learning::reward::compute_reward;
use crate::learning::state::encode;
use crate::refine::artifact::{ArtifactDescription, ArtifactVault, SceneDescriptor};
use crate::refine::engine::RefinementEngine;
use crate::refine::remote::{Enhancer, HttpEnhancer};
use crate::store::Store;

/// What one successfully dispatched feedback event produced.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackOutcome {
    /// Version of the artifact created by this dispatch
    pub artifact_version: u64,
    /// Tagging action the agent chose and applied
    pub action_taken: TagAction,
    /// Reward fed into the learning update
    pub reward: f64,
}

/// Orchestrates feedback handling across the learning and refinement sides.
///
/// Events for different content items are processed in parallel; events for
/// the same item queue on a per-item lock held for the whole of
/// [`FeedbackDispatcher::handle_feedback`], so no feedback is ever dropped
/// and no two dispatches race on one item's artifact chain.
pub struct FeedbackDispatcher {
    reward_config: RewardConfig,
    agent: Arc<QLearningAgent>,
    refiner: RefinementEngine,
    signals: Arc<dyn SignalProvider>,
    tags: Arc<dyn TagMutator>,
    ingest: Arc<dyn ContentIngest>,
    vault: ArtifactVault,
    locks: DashMap<ContentId, Arc<Mutex<()>>>,
    store: Option<Arc<Store>>,
}

impl FeedbackDispatcher {
    /// Build a dispatcher around an in-memory content registry, wiring the
    /// remote enhancer from configuration when an endpoint is set.
    pub fn new(
        config: &EngineConfig,
        registry: Arc<ContentRegistry>,
        store: Option<Arc<Store>>,
    ) -> ReelsmithResult<Self> {
        let enhancer: Option<Arc<dyn Enhancer>> = match &config.enhancer.endpoint {
            Some(endpoint) => Some(Arc::new(HttpEnhancer::new(
                endpoint.clone(),
                Duration::from_secs(config.enhancer.timeout_seconds),
            )?)),
            None => None,
        };
        Self::with_providers(
            config,
            registry.clone(),
            registry.clone(),
            registry,
            enhancer,
            store,
        )
    }

    /// Full constructor over explicit collaborator implementations.
    ///
    /// Validates the configuration up front: a dispatcher for an invalid
    /// configuration is never constructed.
    pub fn with_providers(
        config: &EngineConfig,
        signals: Arc<dyn SignalProvider>,
        tags: Arc<dyn TagMutator>,
        ingest: Arc<dyn ContentIngest>,
        enhancer: Option<Arc<dyn Enhancer>>,
        store: Option<Arc<Store>>,
    ) -> ReelsmithResult<Self> {
        config.validate()?;

        let agent = QLearningAgent::new(&config.learning, &config.replay, &config.reward)?;
        let refiner = RefinementEngine::new(
            config.refine.clone(),
            enhancer,
            Duration::from_secs(config.enhancer.timeout_seconds),
        );
        let vault = ArtifactVault::new();

        if let Some(store) = &store {
            let cells = store.load_q_values()?;
            if !cells.is_empty() {
                info!(cells = cells.len(), "restored learned values from store");
                agent.load_q_values(cells);
            }
            for artifact in store.load_artifacts()? {
                let content_id = artifact.content_id;
                if let Err(error) = restore_version(&vault, artifact) {
                    warn!(%content_id, %error, "skipping persisted artifact version");
                }
            }
        }

        Ok(Self {
            reward_config: config.reward.clone(),
            agent: Arc::new(agent),
            refiner,
            signals,
            tags,
            ingest,
            vault,
            locks: DashMap::new(),
            store,
        })
    }

    /// Hand a new content item and its initial scene list to the core.
    /// Produces and retains the version-1 artifact.
    pub fn register_content(
        &self,
        item: ContentItem,
        scenes: Vec<SceneDescriptor>,
    ) -> ReelsmithResult<ArtifactDescription> {
        let artifact = ArtifactDescription::new(item.id, scenes)?;
        self.ingest.ingest(item)?;
        self.vault.seed(artifact.clone())?;
        self.persist_artifact(&artifact);
        Ok(artifact)
    }

    /// Process one rating. The only state-mutating entry point.
    ///
    /// Once this event's per-content turn is taken, both sub-updates run to
    /// completion independently: a refinement fallback never blocks the
    /// learning update and vice versa.
    #[instrument(skip(self, event), fields(content_id = %event.content_id, rating = event.rating))]
    pub async fn handle_feedback(&self, event: FeedbackEvent) -> ReelsmithResult<FeedbackOutcome> {
        if event.rating < self.reward_config.rating_min
            || event.rating > self.reward_config.rating_max
        {
            return Err(ReelsmithError::RatingOutOfRange {
                rating: event.rating,
                min: self.reward_config.rating_min,
                max: self.reward_config.rating_max,
            });
        }

        let lock = self
            .locks
            .entry(event.content_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _turn = lock.lock().await;

        // Resolve the pre-feedback state and the artifact being rated
        let before = self.signals.signals(event.content_id).await?;
        let previous_state = encode(&before)?;
        let current_artifact =
            self.vault
                .latest(event.content_id)
                .ok_or(ReelsmithError::ArtifactNotFound {
                    content_id: event.content_id,
                    version: None,
                })?;

        // Decide and apply the tagging action, then observe its effect
        let action = self.agent.select_action(previous_state)?;
        self.tags.apply(event.content_id, action).await?;
        let after = self.signals.signals(event.content_id).await?;
        let resulting_state = encode(&after)?;

        let reward = compute_reward(
            &self.reward_config,
            &previous_state,
            action,
            &event,
            &resulting_state,
            Some(current_artifact.total_duration_secs),
        );

        // The learning update and the artifact refinement are independent:
        // the refinement runs regardless of the learning result, and the
        // refinement engine recovers internally from every remote failure.
        let learned = self.agent.update(Transition {
            state: previous_state,
            action,
            reward,
            next_state: resulting_state,
        });

        let refined = self.refiner.refine(&current_artifact, &event).await;
        let artifact_version = refined.version;
        self.vault.push(refined.clone())?;

        self.persist_artifact(&refined);
        self.persist_q_values();

        learned?;

        debug!(
            action = %action,
            reward,
            artifact_version,
            "feedback dispatched"
        );

        Ok(FeedbackOutcome {
            artifact_version,
            action_taken: action,
            reward,
        })
    }

    /// Read-only decision query: which action would the agent take for this
    /// content right now. Usable at generation time, independent of
    /// feedback; never mutates the table or the exploration schedule.
    pub async fn select_action(&self, content_id: ContentId) -> ReelsmithResult<TagAction> {
        let signals = self.signals.signals(content_id).await?;
        let state = encode(&signals)?;
        self.agent.select_action(state)
    }

    /// Fetch an artifact description; omitted version returns the latest.
    pub fn get_artifact(
        &self,
        content_id: ContentId,
        version: Option<u64>,
    ) -> ReelsmithResult<ArtifactDescription> {
        match version {
            Some(v) => self.vault.get(content_id, v),
            None => self.vault.latest(content_id),
        }
        .ok_or(ReelsmithError::ArtifactNotFound {
            content_id,
            version,
        })
    }

    /// Number of retained artifact versions for a content item
    pub fn artifact_history_len(&self, content_id: ContentId) -> usize {
        self.vault.history_len(content_id)
    }

    /// The learning agent, for inspection
    pub fn agent(&self) -> &QLearningAgent {
        &self.agent
    }

    fn persist_artifact(&self, artifact: &ArtifactDescription) {
        if let Some(store) = &self.store {
            if let Err(error) = store.save_artifact(artifact) {
                warn!(%error, "failed to persist artifact version");
            }
        }
    }

    fn persist_q_values(&self) {
        if let Some(store) = &self.store {
            if let Err(error) = store.save_q_values(&self.agent.snapshot()) {
                warn!(%error, "failed to persist learned values");
            }
        }
    }
}

/// Restore one persisted artifact version into the vault, seeding the
/// history on its first version.
fn restore_version(vault: &ArtifactVault, artifact: ArtifactDescription) -> ReelsmithResult<()> {
    if vault.contains(artifact.content_id) {
        vault.push(artifact)
    } else {
        vault.seed(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use tokio::runtime::Runtime;
    use uuid::Uuid;

    fn config() -> EngineConfig {
        let mut config = EngineConfig::default();
        // Deterministic greedy policy for tests
        config.learning.epsilon = 0.0;
        config.learning.epsilon_min = 0.0;
        config
    }

    fn scenes() -> Vec<SceneDescriptor> {
        vec![
            SceneDescriptor::new("a.png", 5.0),
            SceneDescriptor::new("b.png", 10.0),
        ]
    }

    fn dispatcher_with_items(count: usize) -> (FeedbackDispatcher, Vec<ContentId>) {
        let registry = Arc::new(ContentRegistry::new());
        let dispatcher = FeedbackDispatcher::new(&config(), registry, None).unwrap();

        let mut ids = Vec::new();
        for i in 0..count {
            let item = ContentItem::new(
                0.1 + 0.15 * i as f64,
                vec![format!("tag-{}", i)],
            )
            .unwrap();
            ids.push(item.id);
            dispatcher.register_content(item, scenes()).unwrap();
        }
        (dispatcher, ids)
    }

    #[test]
    fn test_dispatch_returns_complete_outcome() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let (dispatcher, ids) = dispatcher_with_items(1);
            let outcome = dispatcher
                .handle_feedback(FeedbackEvent::new(ids[0], 5))
                .await
                .unwrap();

            assert_eq!(outcome.artifact_version, 2);
            assert!(TagAction::ALL.contains(&outcome.action_taken));
            assert!((-1.0..=1.0).contains(&outcome.reward));
        });
    }

    #[test]
    fn test_versions_count_dispatched_events() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let (dispatcher, ids) = dispatcher_with_items(1);

            for i in 0..7 {
                let outcome = dispatcher
                    .handle_feedback(FeedbackEvent::new(ids[0], 1 + (i % 5) as u8))
                    .await
                    .unwrap();
                // Strictly increasing: version 1 is the registration
                assert_eq!(outcome.artifact_version, (i + 2) as u64);
            }
            assert_eq!(dispatcher.artifact_history_len(ids[0]), 8);
        });
    }

    #[test]
    fn test_out_of_range_rating_is_rejected_without_side_effects() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let (dispatcher, ids) = dispatcher_with_items(1);
            let result = dispatcher.handle_feedback(FeedbackEvent::new(ids[0], 9)).await;

            assert!(matches!(
                result,
                Err(ReelsmithError::RatingOutOfRange { .. })
            ));
            assert_eq!(dispatcher.get_artifact(ids[0], None).unwrap().version, 1);
        });
    }

    #[test]
    fn test_unknown_content_is_reported() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let (dispatcher, _) = dispatcher_with_items(1);
            let result = dispatcher
                .handle_feedback(FeedbackEvent::new(Uuid::new_v4(), 3))
                .await;
            assert!(matches!(
                result,
                Err(ReelsmithError::ContentNotFound { .. })
            ));
        });
    }

    #[test]
    fn test_out_of_order_timestamps_are_tolerated() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let (dispatcher, ids) = dispatcher_with_items(1);

            let late = FeedbackEvent::new(ids[0], 4)
                .with_timestamp(Utc::now() - ChronoDuration::hours(2));
            let early = FeedbackEvent::new(ids[0], 2);

            dispatcher.handle_feedback(early).await.unwrap();
            let outcome = dispatcher.handle_feedback(late).await.unwrap();
            assert_eq!(outcome.artifact_version, 3);
        });
    }

    #[test]
    fn test_concurrent_feedback_on_distinct_content_does_not_interfere() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let (dispatcher, ids) = dispatcher_with_items(4);
            let dispatcher = Arc::new(dispatcher);

            let mut handles = Vec::new();
            for (index, &id) in ids.iter().enumerate() {
                let dispatcher = Arc::clone(&dispatcher);
                // Item i receives i+1 events with a rating unique to it
                let rating = (index + 1) as u8;
                handles.push(tokio::spawn(async move {
                    for _ in 0..=index {
                        dispatcher
                            .handle_feedback(FeedbackEvent::new(id, rating))
                            .await
                            .unwrap();
                    }
                }));
            }
            for handle in handles {
                handle.await.unwrap();
            }

            for (index, &id) in ids.iter().enumerate() {
                let latest = dispatcher.get_artifact(id, None).unwrap();
                // Each artifact reflects exactly its own event count
                assert_eq!(latest.version, (index + 2) as u64);

                // And its own ratings: items rated 1 were lengthened, items
                // rated 4+ were shortened
                let rating = (index + 1) as u8;
                if rating <= 2 {
                    assert!(latest.scenes[0].duration_secs > 5.0);
                } else if rating >= 4 {
                    assert!(latest.scenes[0].duration_secs < 5.0);
                } else {
                    assert!((latest.scenes[0].duration_secs - 5.0).abs() < 1e-9);
                }
            }
        });
    }

    #[test]
    fn test_same_content_dispatches_are_serialized_not_dropped() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let (dispatcher, ids) = dispatcher_with_items(1);
            let dispatcher = Arc::new(dispatcher);
            let id = ids[0];

            let mut handles = Vec::new();
            for _ in 0..10 {
                let dispatcher = Arc::clone(&dispatcher);
                handles.push(tokio::spawn(async move {
                    dispatcher
                        .handle_feedback(FeedbackEvent::new(id, 3))
                        .await
                        .unwrap()
                        .artifact_version
                }));
            }

            let mut versions = Vec::new();
            for handle in handles {
                versions.push(handle.await.unwrap());
            }
            versions.sort_unstable();

            // Every event produced its own distinct version, 2 through 11
            assert_eq!(versions, (2..=11).collect::<Vec<u64>>());
            assert_eq!(dispatcher.artifact_history_len(id), 11);
        });
    }

    #[test]
    fn test_select_action_is_read_only() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let (dispatcher, ids) = dispatcher_with_items(1);

            let first = dispatcher.select_action(ids[0]).await.unwrap();
            for _ in 0..5 {
                assert_eq!(dispatcher.select_action(ids[0]).await.unwrap(), first);
            }
            assert_eq!(dispatcher.agent().iterations(), 0);
        });
    }

    #[test]
    fn test_state_survives_restart_through_store() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("reelsmith.db");

            let registry = Arc::new(ContentRegistry::new());
            let item = ContentItem::new(0.8, vec!["music".to_string()]).unwrap();
            let id = item.id;

            {
                let store = Arc::new(Store::open(&path).unwrap());
                let dispatcher =
                    FeedbackDispatcher::new(&config(), registry.clone(), Some(store)).unwrap();
                dispatcher.register_content(item, scenes()).unwrap();
                dispatcher
                    .handle_feedback(FeedbackEvent::new(id, 5))
                    .await
                    .unwrap();
                dispatcher
                    .handle_feedback(FeedbackEvent::new(id, 5))
                    .await
                    .unwrap();
            }

            // A fresh dispatcher over the same database remembers both the
            // artifact chain and the learned values
            let store = Arc::new(Store::open(&path).unwrap());
            let restored = FeedbackDispatcher::new(&config(), registry, Some(store)).unwrap();

            assert_eq!(restored.get_artifact(id, None).unwrap().version, 3);
            assert_eq!(restored.artifact_history_len(id), 3);
            assert!(!restored.agent().snapshot().is_empty());
        });
    }
}
