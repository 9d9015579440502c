// Experience store for replay-based stabilization.
// A fixed-capacity FIFO buffer of past transitions; appends never fail and
// sampling is uniform without replacement within a single call.

use rand::seq::index;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::learning::action::TagAction;
use crate::learning::state::StateKey;

/// One learning sample: (s, a, r, s')
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub state: StateKey,
    pub action: TagAction,
    pub reward: f64,
    pub next_state: StateKey,
}

/// Bounded circular buffer of transitions.
///
/// Append and sample each take the interior lock, so neither ever observes
/// a half-applied state.
#[derive(Debug)]
pub struct ExperienceBuffer {
    inner: Mutex<VecDeque<Transition>>,
    capacity: usize,
}

impl ExperienceBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append a transition, silently dropping the oldest entry when the
    /// buffer is at capacity.
    pub fn append(&self, transition: Transition) {
        let mut buffer = self.inner.lock().unwrap();
        if buffer.len() == self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(transition);
    }

    /// Sample up to `batch_size` transitions uniformly at random without
    /// replacement. Returns fewer when the buffer holds fewer entries, and
    /// an empty vector when it is empty.
    pub fn sample(&self, batch_size: usize) -> Vec<Transition> {
        let buffer = self.inner.lock().unwrap();
        let amount = batch_size.min(buffer.len());
        if amount == 0 {
            return Vec::new();
        }

        let mut rng = rand::rng();
        index::sample(&mut rng, buffer.len(), amount)
            .into_iter()
            .map(|i| buffer[i])
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
