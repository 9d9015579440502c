use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{ReelsmithError, ReelsmithResult};

/// Global configuration for the adaptive decision core.
///
/// Every tunable the core recognizes lives here. `validate` runs at startup
/// and rejects inconsistent values outright; a misconfigured core never
/// starts, so configuration errors cannot surface mid-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Q-learning configuration
    pub learning: LearningConfig,
    /// Reward function configuration
    pub reward: RewardConfig,
    /// Experience replay configuration
    pub replay: ReplayConfig,
    /// Artifact refinement configuration
    pub refine: RefineConfig,
    /// Remote enhancement configuration
    pub enhancer: EnhancerConfig,
    /// Persistence configuration
    pub persistence: PersistenceConfig,
}

/// Q-learning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Learning rate (α), in (0, 1]
    pub alpha: f64,
    /// Discount factor (γ), in [0, 1)
    pub gamma: f64,
    /// Initial exploration rate (ε)
    pub epsilon: f64,
    /// Multiplicative ε decay applied per learning update
    pub epsilon_decay: f64,
    /// Floor below which ε never decays
    pub epsilon_min: f64,
    /// Value assumed for state-action cells never updated
    pub initial_q: f64,
}

/// Reward function configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Lower clamp bound for rewards
    pub clamp_min: f64,
    /// Upper clamp bound for rewards
    pub clamp_max: f64,
    /// Smallest valid rating
    pub rating_min: u8,
    /// Largest valid rating
    pub rating_max: u8,
    /// Weight of the implicit engagement term when present, in [0, 1]
    pub implicit_weight: f64,
}

impl RewardConfig {
    /// Midpoint of the rating scale
    pub fn rating_midpoint(&self) -> f64 {
        (self.rating_min as f64 + self.rating_max as f64) / 2.0
    }
}

/// Experience replay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Maximum number of retained transitions
    pub capacity: usize,
    /// Transitions resampled per replay pass
    pub batch_size: usize,
}

/// Artifact refinement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineConfig {
    /// Ratings at or below this lengthen every scene
    pub low_threshold: u8,
    /// Ratings at or above this shorten every scene
    pub high_threshold: u8,
    /// Proportional duration increase for low ratings (0.2 = +20%)
    pub lengthen_factor: f64,
    /// Proportional duration decrease for high ratings (0.1 = -10%)
    pub shorten_factor: f64,
    /// No scene is ever shortened below this many seconds
    pub min_scene_duration_secs: f64,
}

/// Remote enhancement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancerConfig {
    /// Remote enhancement endpoint; absent means local-only refinement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Timeout for remote enhancement calls in seconds
    pub timeout_seconds: u64,
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// SQLite database path; absent disables durability
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            learning: LearningConfig {
                alpha: 0.1,
                gamma: 0.9,
                epsilon: 0.2,
                epsilon_decay: 0.995,
                epsilon_min: 0.05,
                initial_q: 0.0,
            },
            reward: RewardConfig {
                clamp_min: -1.0,
                clamp_max: 1.0,
                rating_min: 1,
                rating_max: 5,
                implicit_weight: 0.2,
            },
            replay: ReplayConfig {
                capacity: 1000,
                batch_size: 10,
            },
            refine: RefineConfig {
                low_threshold: 2,
                high_threshold: 4,
                lengthen_factor: 0.2,
                shorten_factor: 0.1,
                min_scene_duration_secs: 1.0,
            },
            enhancer: EnhancerConfig {
                endpoint: None,
                timeout_seconds: 30,
            },
            persistence: PersistenceConfig { db_path: None },
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file, creating it with defaults when
    /// it does not exist yet. The loaded configuration is validated before
    /// being returned.
    pub fn load_or_create(path: impl AsRef<Path>) -> ReelsmithResult<Self> {
        let path = path.as_ref();

        let config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            let raw = fs::read_to_string(path)
                .map_err(|e| ReelsmithError::io_error(e, Some(path)))?;
            toml::from_str(&raw)?
        } else {
            info!("Writing default configuration to {}", path.display());
            let config = Self::default();
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| ReelsmithError::io_error(e, Some(parent)))?;
            }
            fs::write(path, toml::to_string_pretty(&config)?)
                .map_err(|e| ReelsmithError::io_error(e, Some(path)))?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    /// Default on-disk location for the configuration file
    pub fn default_path() -> ReelsmithResult<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| ReelsmithError::config("could not determine config directory"))?
            .join("reelsmith");
        Ok(dir.join("config.toml"))
    }

    /// Check every configured value against its allowed range.
    ///
    /// Errors here are configuration errors: the caller is expected to abort
    /// startup rather than continue with a partially valid configuration.
    pub fn validate(&self) -> ReelsmithResult<()> {
        let l = &self.learning;
        if !(l.alpha > 0.0 && l.alpha <= 1.0) {
            return Err(ReelsmithError::config(format!(
                "learning rate alpha must be in (0, 1], got {}",
                l.alpha
            )));
        }
        if !(0.0..1.0).contains(&l.gamma) {
            return Err(ReelsmithError::config(format!(
                "discount factor gamma must be in [0, 1), got {}",
                l.gamma
            )));
        }
        if !(0.0..=1.0).contains(&l.epsilon) {
            return Err(ReelsmithError::config(format!(
                "epsilon must be in [0, 1], got {}",
                l.epsilon
            )));
        }
        if !(0.0..=1.0).contains(&l.epsilon_decay) || l.epsilon_decay == 0.0 {
            return Err(ReelsmithError::config(format!(
                "epsilon decay must be in (0, 1], got {}",
                l.epsilon_decay
            )));
        }
        if l.epsilon_min < 0.0 || l.epsilon_min > l.epsilon {
            return Err(ReelsmithError::config(format!(
                "epsilon floor {} must be in [0, epsilon={}]",
                l.epsilon_min, l.epsilon
            )));
        }

        let r = &self.reward;
        if r.clamp_min >= r.clamp_max {
            return Err(ReelsmithError::config(format!(
                "reward clamp range [{}, {}] is empty",
                r.clamp_min, r.clamp_max
            )));
        }
        if r.rating_min >= r.rating_max {
            return Err(ReelsmithError::config(format!(
                "rating scale {}..={} is empty",
                r.rating_min, r.rating_max
            )));
        }
        if !(0.0..=1.0).contains(&r.implicit_weight) {
            return Err(ReelsmithError::config(format!(
                "implicit weight must be in [0, 1], got {}",
                r.implicit_weight
            )));
        }

        if self.replay.capacity == 0 {
            return Err(ReelsmithError::config("replay capacity must be non-zero"));
        }
        if self.replay.batch_size == 0 {
            return Err(ReelsmithError::config("replay batch size must be non-zero"));
        }

        let f = &self.refine;
        if f.low_threshold >= f.high_threshold {
            return Err(ReelsmithError::config(format!(
                "refinement thresholds inverted: low {} >= high {}",
                f.low_threshold, f.high_threshold
            )));
        }
        if f.lengthen_factor <= 0.0 || !f.lengthen_factor.is_finite() {
            return Err(ReelsmithError::config(format!(
                "lengthen factor must be positive, got {}",
                f.lengthen_factor
            )));
        }
        if !(0.0..1.0).contains(&f.shorten_factor) || f.shorten_factor == 0.0 {
            return Err(ReelsmithError::config(format!(
                "shorten factor must be in (0, 1), got {}",
                f.shorten_factor
            )));
        }
        if f.min_scene_duration_secs <= 0.0 {
            return Err(ReelsmithError::config(format!(
                "minimum scene duration must be positive, got {}",
                f.min_scene_duration_secs
            )));
        }

        if self.enhancer.timeout_seconds == 0 {
            return Err(ReelsmithError::config(
                "enhancer timeout must be non-zero",
            ));
        }

        Ok(())
    }
}
