// Remote enhancement transport.
// The enhancement service receives the full artifact and feedback payload
// and returns a revised artifact in the same structural shape.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::core::types::FeedbackEvent;
use crate::error::ReelsmithResult;
use crate::refine::artifact::ArtifactDescription;

/// A remote enhancement strategy.
///
/// Implementations may block on external I/O; callers are expected to wrap
/// calls in a timeout and fall back locally on any failure.
#[async_trait]
pub trait Enhancer: Send + Sync {
    async fn enhance(
        &self,
        artifact: &ArtifactDescription,
        feedback: &FeedbackEvent,
    ) -> ReelsmithResult<ArtifactDescription>;
}

/// Wire request sent to the enhancement service
#[derive(Debug, Serialize)]
struct EnhanceRequest<'a> {
    artifact: &'a ArtifactDescription,
    feedback: &'a FeedbackEvent,
    timestamp: DateTime<Utc>,
}

/// Wire response from the enhancement service
#[derive(Debug, Deserialize)]
struct EnhanceResponse {
    artifact: ArtifactDescription,
}

/// HTTP/JSON enhancement client
pub struct HttpEnhancer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpEnhancer {
    /// Build a client for the given endpoint. The timeout applies at the
    /// transport level as well as in the refinement engine, so a stalled
    /// connection cannot outlive the engine's own deadline.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> ReelsmithResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Enhancer for HttpEnhancer {
    async fn enhance(
        &self,
        artifact: &ArtifactDescription,
        feedback: &FeedbackEvent,
    ) -> ReelsmithResult<ArtifactDescription> {
        debug!(
            content_id = %artifact.content_id,
            version = artifact.version,
            "requesting remote enhancement"
        );

        let request = EnhanceRequest {
            artifact,
            feedback,
            timestamp: Utc::now(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<EnhanceResponse>()
            .await?;

        Ok(response.artifact)
    }
}
