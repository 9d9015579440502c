// The agent's learned value function.
// A concurrent map from (state, action) to a running value estimate.
// DashMap's sharded locking gives per-cell write exclusion while reads and
// writes to unrelated cells proceed independently.

use dashmap::DashMap;

use crate::learning::action::TagAction;
use crate::learning::state::StateKey;

/// Q-table mapping state-action pairs to expected future rewards.
///
/// Cells never observed default to the configured initial value. Values are
/// only ever changed through the TD rule in [`QTable::apply_td`]; a reader
/// either sees the value before an update or after it, never a partial
/// write.
#[derive(Debug)]
pub struct QTable {
    cells: DashMap<(StateKey, TagAction), f64>,
    initial: f64,
}

impl QTable {
    pub fn new(initial: f64) -> Self {
        Self {
            cells: DashMap::new(),
            initial,
        }
    }

    /// Current estimate for a state-action pair
    pub fn value(&self, state: StateKey, action: TagAction) -> f64 {
        self.cells
            .get(&(state, action))
            .map(|cell| *cell)
            .unwrap_or(self.initial)
    }

    /// Maximum estimate over the given actions for a state
    pub fn max_value(&self, state: StateKey, actions: &[TagAction]) -> f64 {
        let mut max: Option<f64> = None;
        for &action in actions {
            let value = self.value(state, action);
            max = Some(match max {
                Some(current) => current.max(value),
                None => value,
            });
        }
        max.unwrap_or(self.initial)
    }

    /// Best action for a state, scanning `actions` in order and keeping the
    /// first maximum, so equal values resolve to the earlier action.
    pub fn best_action(&self, state: StateKey, actions: &[TagAction]) -> Option<TagAction> {
        let mut best: Option<(TagAction, f64)> = None;
        for &action in actions {
            let value = self.value(state, action);
            match best {
                Some((_, best_value)) if value <= best_value => {}
                _ => best = Some((action, value)),
            }
        }
        best.map(|(action, _)| action)
    }

    /// Apply the temporal-difference rule to one cell:
    ///
    /// Q(s,a) ← Q(s,a) + α[r + γ·max_a' Q(s',a') - Q(s,a)]
    ///
    /// `max_next` must be computed before calling; no other table access may
    /// happen while the cell's entry lock is held. Returns the new value.
    pub fn apply_td(
        &self,
        state: StateKey,
        action: TagAction,
        alpha: f64,
        gamma: f64,
        reward: f64,
        max_next: f64,
    ) -> f64 {
        let mut cell = self.cells.entry((state, action)).or_insert(self.initial);
        let current = *cell;
        let temporal_difference = reward + gamma * max_next - current;
        let updated = current + alpha * temporal_difference;
        *cell = updated;
        updated
    }

    /// Copy of every stored cell, for persistence write-through
    pub fn snapshot(&self) -> Vec<(StateKey, TagAction, f64)> {
        self.cells
            .iter()
            .map(|entry| {
                let (state, action) = *entry.key();
                (state, action, *entry.value())
            })
            .collect()
    }

    /// Seed the table from persisted values, replacing any current contents
    /// for the loaded keys
    pub fn load(&self, entries: impl IntoIterator<Item = (StateKey, TagAction, f64)>) {
        for (state, action, value) in entries {
            self.cells.insert((state, action), value);
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
