use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ReelsmithError, ReelsmithResult};

/// Identifier for a piece of managed content
pub type ContentId = Uuid;

/// A piece of user content under management.
///
/// The identifier is assigned once at ingestion and never changes. The tag
/// set carries no duplicate entries; tagging actions mutate it through the
/// tag-mutation service, never directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    /// Immutable content identifier
    pub id: ContentId,
    /// Authenticity score in [0, 1]
    pub authenticity: f64,
    /// Current tag set, duplicate-free
    pub tags: Vec<String>,
    /// Reference to the rendered artifact in external storage, if any
    pub artifact_ref: Option<String>,
    /// When the content was ingested
    pub created_at: DateTime<Utc>,
}

impl ContentItem {
    /// Create a new content item with a fresh identifier.
    ///
    /// Duplicate tags are collapsed, preserving first occurrence order.
    pub fn new(authenticity: f64, tags: Vec<String>) -> ReelsmithResult<Self> {
        if !authenticity.is_finite() || !(0.0..=1.0).contains(&authenticity) {
            return Err(ReelsmithError::invalid_signal(format!(
                "authenticity score {} outside [0, 1]",
                authenticity
            )));
        }

        let mut deduped: Vec<String> = Vec::with_capacity(tags.len());
        for tag in tags {
            if !deduped.contains(&tag) {
                deduped.push(tag);
            }
        }

        Ok(Self {
            id: Uuid::new_v4(),
            authenticity,
            tags: deduped,
            artifact_ref: None,
            created_at: Utc::now(),
        })
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }
}

/// One user rating for a piece of content.
///
/// Consumed exactly once by the feedback dispatcher. Timestamps are not
/// required to be monotonic per content; late and out-of-order feedback is
/// accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEvent {
    pub content_id: ContentId,
    /// Rating on the configured integer scale
    pub rating: u8,
    /// Optional free-text comment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// How long the user engaged with the artifact, in seconds, if the
    /// playback collaborator reported it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement_secs: Option<f64>,
}

impl FeedbackEvent {
    pub fn new(content_id: ContentId, rating: u8) -> Self {
        Self {
            content_id,
            rating,
            comment: None,
            timestamp: Utc::now(),
            engagement_secs: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_engagement(mut self, secs: f64) -> Self {
        self.engagement_secs = Some(secs);
        self
    }
}
