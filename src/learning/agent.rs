// Q-learning agent: epsilon-greedy action selection and temporal-difference
// value updates, with experience replay for stabilization.

use rand::Rng;
use std::sync::Mutex;
use tracing::{debug, trace};

use crate::core::config::{LearningConfig, ReplayConfig, RewardConfig};
use crate::error::{ReelsmithError, ReelsmithResult};
use crate::learning::action::TagAction;
use crate::learning::replay::{ExperienceBuffer, Transition};
use crate::learning::state::StateKey;
use crate::learning::table::QTable;

/// Mutable exploration schedule, serialized behind one lock since it is a
/// single scalar updated once per learning step.
#[derive(Debug)]
struct Exploration {
    epsilon: f64,
    iterations: u64,
}

/// Q-learning agent owning the value table, the action-selection policy and
/// the update rule.
///
/// The agent is shared across concurrent dispatches: the table handles
/// per-cell exclusion itself, the experience buffer is internally locked,
/// and the exploration schedule sits behind its own mutex.
#[derive(Debug)]
pub struct QLearningAgent {
    table: QTable,
    replay: ExperienceBuffer,
    actions: Vec<TagAction>,
    alpha: f64,
    gamma: f64,
    epsilon_decay: f64,
    epsilon_min: f64,
    batch_size: usize,
    clamp_min: f64,
    clamp_max: f64,
    exploration: Mutex<Exploration>,
}

impl QLearningAgent {
    /// Create an agent over the full action set.
    pub fn new(
        learning: &LearningConfig,
        replay: &ReplayConfig,
        reward: &RewardConfig,
    ) -> ReelsmithResult<Self> {
        Self::with_actions(learning, replay, reward, TagAction::ALL.to_vec())
    }

    /// Create an agent over an explicit action set. An empty set is a
    /// configuration error, rejected here so it can never surface mid-run.
    pub fn with_actions(
        learning: &LearningConfig,
        replay: &ReplayConfig,
        reward: &RewardConfig,
        actions: Vec<TagAction>,
    ) -> ReelsmithResult<Self> {
        if actions.is_empty() {
            return Err(ReelsmithError::EmptyActionSpace);
        }

        Ok(Self {
            table: QTable::new(learning.initial_q),
            replay: ExperienceBuffer::new(replay.capacity),
            actions,
            alpha: learning.alpha,
            gamma: learning.gamma,
            epsilon_decay: learning.epsilon_decay,
            epsilon_min: learning.epsilon_min,
            batch_size: replay.batch_size,
            clamp_min: reward.clamp_min,
            clamp_max: reward.clamp_max,
            exploration: Mutex::new(Exploration {
                epsilon: learning.epsilon,
                iterations: 0,
            }),
        })
    }

    /// Select an action for a state with the epsilon-greedy policy.
    ///
    /// With probability ε the action is drawn uniformly; otherwise the
    /// highest-valued action wins, ties broken by the fixed priority order.
    /// Read-only: neither the table nor the exploration schedule changes.
    pub fn select_action(&self, state: StateKey) -> ReelsmithResult<TagAction> {
        if self.actions.is_empty() {
            return Err(ReelsmithError::EmptyActionSpace);
        }

        let epsilon = self.exploration.lock().unwrap().epsilon;
        let mut rng = rand::rng();

        if rng.random::<f64>() < epsilon {
            let index = rng.random_range(0..self.actions.len());
            trace!(state = %state, action = %self.actions[index], "exploring");
            return Ok(self.actions[index]);
        }

        self.greedy_action(state)
    }

    /// The deterministic greedy choice for a state.
    pub fn greedy_action(&self, state: StateKey) -> ReelsmithResult<TagAction> {
        self.table
            .best_action(state, &self.actions)
            .ok_or(ReelsmithError::EmptyActionSpace)
    }

    /// Apply the TD update for an observed transition, record it for
    /// replay, decay ε, and replay a batch once enough experience exists.
    ///
    /// Rejects rewards outside the configured clamp range: the reward
    /// function guarantees the bound, so a violation means a caller bypassed
    /// it.
    pub fn update(&self, transition: Transition) -> ReelsmithResult<()> {
        if !transition.reward.is_finite()
            || transition.reward < self.clamp_min
            || transition.reward > self.clamp_max
        {
            return Err(ReelsmithError::RewardOutOfRange {
                reward: transition.reward,
                min: self.clamp_min,
                max: self.clamp_max,
            });
        }

        self.apply(&transition);
        self.replay.append(transition);

        let epsilon = {
            let mut exploration = self.exploration.lock().unwrap();
            exploration.iterations += 1;
            exploration.epsilon = (exploration.epsilon * self.epsilon_decay).max(self.epsilon_min);
            exploration.epsilon
        };

        if self.replay.len() >= self.batch_size {
            for sampled in self.replay.sample(self.batch_size) {
                self.apply(&sampled);
            }
        }

        debug!(
            state = %transition.state,
            action = %transition.action,
            reward = transition.reward,
            epsilon,
            "q-value updated"
        );
        Ok(())
    }

    /// One TD application. The max over the next state is read before the
    /// target cell's lock is taken.
    fn apply(&self, transition: &Transition) {
        let max_next = self.table.max_value(transition.next_state, &self.actions);
        self.table.apply_td(
            transition.state,
            transition.action,
            self.alpha,
            self.gamma,
            transition.reward,
            max_next,
        );
    }

    /// Current estimate for a state-action pair
    pub fn q_value(&self, state: StateKey, action: TagAction) -> f64 {
        self.table.value(state, action)
    }

    /// Current exploration rate
    pub fn epsilon(&self) -> f64 {
        self.exploration.lock().unwrap().epsilon
    }

    /// Number of learning updates applied so far
    pub fn iterations(&self) -> u64 {
        self.exploration.lock().unwrap().iterations
    }

    /// The actions this agent selects among, in priority order
    pub fn actions(&self) -> &[TagAction] {
        &self.actions
    }

    /// Copy of every learned cell, for persistence write-through
    pub fn snapshot(&self) -> Vec<(StateKey, TagAction, f64)> {
        self.table.snapshot()
    }

    /// Seed the table from persisted values at startup
    pub fn load_q_values(
        &self,
        entries: impl IntoIterator<Item = (StateKey, TagAction, f64)>,
    ) {
        self.table.load(entries);
    }
}
