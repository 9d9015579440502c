// Recommender actions available to the learning agent.
// The action set is closed; exactly one action is chosen per decision and
// applied by the external tag-mutation service.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ReelsmithError;

/// One of the closed set of tagging actions the agent may choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagAction {
    /// Leave the tag set unchanged
    NoOp,
    /// Promote an existing tag
    BoostTag,
    /// Add a suggested tag not yet on the item
    SuggestTag,
}

impl TagAction {
    /// Every action, in fixed priority order. Ties in the greedy policy are
    /// broken by taking the earliest entry here, which keeps action
    /// selection reproducible for equal Q-values.
    pub const ALL: [TagAction; 3] = [TagAction::NoOp, TagAction::BoostTag, TagAction::SuggestTag];

    /// Stable label used for persistence and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            TagAction::NoOp => "no_op",
            TagAction::BoostTag => "boost_tag",
            TagAction::SuggestTag => "suggest_tag",
        }
    }
}

impl fmt::Display for TagAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagAction {
    type Err = ReelsmithError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no_op" => Ok(TagAction::NoOp),
            "boost_tag" => Ok(TagAction::BoostTag),
            "suggest_tag" => Ok(TagAction::SuggestTag),
            other => Err(ReelsmithError::parse_error(format!(
                "unknown tag action '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip() {
        for action in TagAction::ALL {
            assert_eq!(action.as_str().parse::<TagAction>().unwrap(), action);
        }
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        assert!("drop_tag".parse::<TagAction>().is_err());
    }
}
