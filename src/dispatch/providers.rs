// Collaborator seams consumed by the dispatcher, plus an in-memory content
// registry implementing all of them for simulation and tests.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::core::types::{ContentId, ContentItem};
use crate::error::{ReelsmithError, ReelsmithResult};
use crate::learning::action::TagAction;
use crate::learning::state::ContentSignals;

/// Supplies the raw signals the state encoder discretizes.
#[async_trait]
pub trait SignalProvider: Send + Sync {
    async fn signals(&self, content_id: ContentId) -> ReelsmithResult<ContentSignals>;
}

/// Applies a chosen action to a content item's tag set.
#[async_trait]
pub trait TagMutator: Send + Sync {
    /// Returns the tag the action touched, if it touched one.
    async fn apply(
        &self,
        content_id: ContentId,
        action: TagAction,
    ) -> ReelsmithResult<Option<String>>;
}

/// Receives newly ingested content items.
pub trait ContentIngest: Send + Sync {
    fn ingest(&self, item: ContentItem) -> ReelsmithResult<()>;
}

/// Default suggestions offered by [`ContentRegistry`] when the agent picks
/// [`TagAction::SuggestTag`].
const DEFAULT_SUGGESTIONS: [&str; 5] = [
    "featured",
    "trending",
    "community-pick",
    "editors-choice",
    "rewatch",
];

/// In-memory content directory implementing every collaborator seam.
///
/// Item mutations for one content id are serialized by the dispatcher's
/// per-content lock; the map itself is safe for concurrent access across
/// items.
#[derive(Debug)]
pub struct ContentRegistry {
    items: DashMap<ContentId, ContentItem>,
    suggestion_pool: Vec<String>,
}

impl ContentRegistry {
    pub fn new() -> Self {
        Self::with_suggestions(DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect())
    }

    /// Registry drawing suggested tags from the given pool, in order.
    pub fn with_suggestions(suggestion_pool: Vec<String>) -> Self {
        Self {
            items: DashMap::new(),
            suggestion_pool,
        }
    }

    pub fn get(&self, content_id: ContentId) -> Option<ContentItem> {
        self.items.get(&content_id).map(|item| item.clone())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for ContentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentIngest for ContentRegistry {
    fn ingest(&self, item: ContentItem) -> ReelsmithResult<()> {
        if self.items.contains_key(&item.id) {
            return Err(ReelsmithError::AlreadyRegistered { content_id: item.id });
        }
        self.items.insert(item.id, item);
        Ok(())
    }
}

#[async_trait]
impl SignalProvider for ContentRegistry {
    async fn signals(&self, content_id: ContentId) -> ReelsmithResult<ContentSignals> {
        let item = self
            .items
            .get(&content_id)
            .ok_or(ReelsmithError::ContentNotFound { content_id })?;
        Ok(ContentSignals {
            authenticity: item.authenticity,
            tag_count: item.tags.len() as i64,
        })
    }
}

#[async_trait]
impl TagMutator for ContentRegistry {
    async fn apply(
        &self,
        content_id: ContentId,
        action: TagAction,
    ) -> ReelsmithResult<Option<String>> {
        let mut item = self
            .items
            .get_mut(&content_id)
            .ok_or(ReelsmithError::ContentNotFound { content_id })?;

        match action {
            TagAction::NoOp => Ok(None),
            TagAction::BoostTag => {
                // Promote the least prominent tag to the front of the set
                match item.tags.pop() {
                    Some(tag) => {
                        item.tags.insert(0, tag.clone());
                        Ok(Some(tag))
                    }
                    None => Ok(None),
                }
            }
            TagAction::SuggestTag => {
                let suggestion = self
                    .suggestion_pool
                    .iter()
                    .find(|candidate| !item.tags.contains(candidate))
                    .cloned();
                if let Some(tag) = &suggestion {
                    item.tags.push(tag.clone());
                }
                Ok(suggestion)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::runtime::Runtime;
    use uuid::Uuid;

    fn item(tags: &[&str]) -> ContentItem {
        ContentItem::new(0.6, tags.iter().map(|t| t.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_signals_reflect_item() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let registry = ContentRegistry::new();
            let item = item(&["music", "live"]);
            let id = item.id;
            registry.ingest(item).unwrap();

            let signals = registry.signals(id).await.unwrap();
            assert_eq!(signals.authenticity, 0.6);
            assert_eq!(signals.tag_count, 2);
        });
    }

    #[test]
    fn test_unknown_content_is_reported() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let registry = ContentRegistry::new();
            let result = registry.signals(Uuid::new_v4()).await;
            assert!(matches!(
                result,
                Err(ReelsmithError::ContentNotFound { .. })
            ));
        });
    }

    #[test]
    fn test_suggest_tag_adds_without_duplicates() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let registry = ContentRegistry::with_suggestions(vec![
                "featured".to_string(),
                "trending".to_string(),
            ]);
            let item = item(&["featured"]);
            let id = item.id;
            registry.ingest(item).unwrap();

            let added = registry.apply(id, TagAction::SuggestTag).await.unwrap();
            assert_eq!(added.as_deref(), Some("trending"));

            // Pool exhausted: no duplicates are ever introduced
            let none = registry.apply(id, TagAction::SuggestTag).await.unwrap();
            assert_eq!(none, None);
            assert_eq!(registry.get(id).unwrap().tags.len(), 2);
        });
    }

    #[test]
    fn test_boost_promotes_last_tag() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let registry = ContentRegistry::new();
            let item = item(&["music", "live", "acoustic"]);
            let id = item.id;
            registry.ingest(item).unwrap();

            let boosted = registry.apply(id, TagAction::BoostTag).await.unwrap();
            assert_eq!(boosted.as_deref(), Some("acoustic"));
            assert_eq!(registry.get(id).unwrap().tags[0], "acoustic");
        });
    }

    #[test]
    fn test_duplicate_ingest_is_rejected() {
        let registry = ContentRegistry::new();
        let item = item(&[]);
        registry.ingest(item.clone()).unwrap();
        assert!(matches!(
            registry.ingest(item),
            Err(ReelsmithError::AlreadyRegistered { .. })
        ));
    }
}
