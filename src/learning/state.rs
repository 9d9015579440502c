// State representation for the learning agent.
// Content signals are discretized into a small fixed state space so the
// Q-table stays bounded regardless of catalog size.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ReelsmithError, ReelsmithResult};

/// Number of authenticity bins. Bin i covers [i * 0.2, (i + 1) * 0.2),
/// except the top bin which also includes 1.0.
pub const AUTHENTICITY_BUCKETS: u8 = 5;

/// Number of tag-count bins: 0, 1-3, 4-7, 8+.
pub const TAG_COUNT_BUCKETS: u8 = 4;

/// Raw signals describing a content item at decision time, as reported by
/// the content-signal provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContentSignals {
    /// Authenticity score in [0, 1]
    pub authenticity: f64,
    /// Number of tags currently on the item
    pub tag_count: i64,
}

/// Discretized state key the agent learns over.
///
/// The bucket boundaries are fixed: persisted Q-values are keyed by them, so
/// changing the boundaries is a breaking schema change that invalidates any
/// previously learned table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateKey {
    /// Authenticity bin, 0..AUTHENTICITY_BUCKETS
    pub authenticity_bucket: u8,
    /// Tag-count bin, 0..TAG_COUNT_BUCKETS
    pub tag_count_bucket: u8,
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}t{}", self.authenticity_bucket, self.tag_count_bucket)
    }
}

/// Encode raw content signals into a state key.
///
/// Pure and deterministic: the same signals always produce the same key,
/// across calls and across process restarts. Fails only on invalid input.
pub fn encode(signals: &ContentSignals) -> ReelsmithResult<StateKey> {
    if !signals.authenticity.is_finite() || !(0.0..=1.0).contains(&signals.authenticity) {
        return Err(ReelsmithError::invalid_signal(format!(
            "authenticity score {} outside [0, 1]",
            signals.authenticity
        )));
    }
    if signals.tag_count < 0 {
        return Err(ReelsmithError::invalid_signal(format!(
            "negative tag count {}",
            signals.tag_count
        )));
    }

    let authenticity_bucket = ((signals.authenticity * AUTHENTICITY_BUCKETS as f64) as u8)
        .min(AUTHENTICITY_BUCKETS - 1);

    let tag_count_bucket = match signals.tag_count {
        0 => 0,
        1..=3 => 1,
        4..=7 => 2,
        _ => 3,
    };

    Ok(StateKey {
        authenticity_bucket,
        tag_count_bucket,
    })
}
