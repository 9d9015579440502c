// Reward computation for the learning agent.
// Combines the explicit rating with an optional implicit engagement signal
// and clamps the result so the TD update stays numerically stable.

use crate::core::config::RewardConfig;
use crate::core::types::FeedbackEvent;
use crate::learning::action::TagAction;
use crate::learning::state::StateKey;

/// Compute the reward for a completed transition.
///
/// The explicit rating maps piecewise-linearly around the scale midpoint:
/// the minimum rating scores the clamp floor, the midpoint scores zero, the
/// maximum scores the clamp ceiling. When the playback collaborator reported
/// an engagement duration, the completion ratio against the artifact length
/// contributes a weighted implicit term; when it did not, scoring degrades
/// to explicit-only without failing.
pub fn compute_reward(
    config: &RewardConfig,
    _previous_state: &StateKey,
    action: TagAction,
    event: &FeedbackEvent,
    _resulting_state: &StateKey,
    artifact_duration_secs: Option<f64>,
) -> f64 {
    let midpoint = config.rating_midpoint();
    let rating = event.rating as f64;

    let explicit = if rating >= midpoint {
        let span = config.rating_max as f64 - midpoint;
        if span > 0.0 {
            (rating - midpoint) / span
        } else {
            0.0
        }
    } else {
        let span = midpoint - config.rating_min as f64;
        if span > 0.0 {
            (rating - midpoint) / span
        } else {
            0.0
        }
    };

    let mut reward = match implicit_score(event, artifact_duration_secs) {
        Some(implicit) => {
            (1.0 - config.implicit_weight) * explicit + config.implicit_weight * implicit
        }
        None => explicit,
    };

    // Small cost for doing nothing, so ties do not freeze the policy on NoOp
    if action == TagAction::NoOp {
        reward -= 0.05;
    }

    reward.clamp(config.clamp_min, config.clamp_max)
}

/// Engagement completion ratio mapped to [-1, 1], when both the engagement
/// duration and the artifact length are known and usable.
fn implicit_score(event: &FeedbackEvent, artifact_duration_secs: Option<f64>) -> Option<f64> {
    let engagement = event.engagement_secs?;
    let total = artifact_duration_secs?;
    if !engagement.is_finite() || engagement < 0.0 || !(total > 0.0) {
        return None;
    }
    let ratio = (engagement / total).clamp(0.0, 1.0);
    Some(2.0 * ratio - 1.0)
}
