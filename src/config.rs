//! Training configuration.

use serde::{Deserialize, Serialize};

use crate::algorithm::Algorithm;
use crate::error::ConfigError;
use crate::eval::RewardAggregation;

/// Configuration for a training run.
///
/// Intervals are measured in update cycles (one cycle = one filled horizon
/// followed by one policy update).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Algorithm identifier, resolved through the algorithm registry.
    pub algorithm: String,
    /// Steps collected per environment before each policy update (H).
    pub horizon: usize,
    /// Number of parallel training environments (E).
    pub num_envs: usize,
    /// Number of parallel evaluation environments.
    pub num_eval_envs: usize,
    /// Number of agents per environment (A).
    pub num_agents: usize,
    /// Total environment-step budget across the whole run.
    pub total_env_steps: u64,
    /// Cycles between checkpoint saves.
    pub save_interval: u64,
    /// Cycles between metric emissions.
    pub log_interval: u64,
    /// Cycles between evaluation runs.
    pub eval_interval: u64,
    /// Whether periodic evaluation runs at all.
    pub use_eval: bool,
    /// Complete episodes to collect per evaluation run.
    pub eval_episodes: usize,
    /// How per-agent episode rewards reduce to one scalar in evaluation.
    pub eval_reward_aggregation: RewardAggregation,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            algorithm: "ppo".to_string(),
            horizon: 128,
            num_envs: 8,
            num_eval_envs: 4,
            num_agents: 2,
            total_env_steps: 1_000_000,
            save_interval: 10,
            log_interval: 5,
            eval_interval: 25,
            use_eval: false,
            eval_episodes: 32,
            eval_reward_aggregation: RewardAggregation::MeanAcrossAgents,
        }
    }
}

impl TrainingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of update cycles the step budget affords:
    /// `total_env_steps / (horizon * num_envs)`.
    pub fn update_cycles(&self) -> u64 {
        self.total_env_steps / (self.horizon as u64 * self.num_envs as u64)
    }

    /// Environment steps consumed by one update cycle.
    pub fn steps_per_cycle(&self) -> u64 {
        self.horizon as u64 * self.num_envs as u64
    }

    /// Check every field for usable values. Runs before any simulation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn nonzero(field: &'static str, value: u64) -> Result<(), ConfigError> {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    message: "must be nonzero".to_string(),
                });
            }
            Ok(())
        }

        Algorithm::parse(&self.algorithm)?;

        nonzero("horizon", self.horizon as u64)?;
        nonzero("num_envs", self.num_envs as u64)?;
        nonzero("num_agents", self.num_agents as u64)?;
        nonzero("save_interval", self.save_interval)?;
        nonzero("log_interval", self.log_interval)?;
        nonzero("eval_interval", self.eval_interval)?;

        if self.update_cycles() == 0 {
            return Err(ConfigError::InvalidValue {
                field: "total_env_steps",
                message: format!(
                    "budget {} affords no complete cycle of {} steps",
                    self.total_env_steps,
                    self.steps_per_cycle()
                ),
            });
        }

        if self.use_eval {
            nonzero("num_eval_envs", self.num_eval_envs as u64)?;
            nonzero("eval_episodes", self.eval_episodes as u64)?;
        }

        if let RewardAggregation::Agent(idx) = self.eval_reward_aggregation {
            if idx >= self.num_agents {
                return Err(ConfigError::InvalidValue {
                    field: "eval_reward_aggregation",
                    message: format!("agent index {} out of range for {} agents", idx, self.num_agents),
                });
            }
        }

        Ok(())
    }

    pub fn with_algorithm(mut self, name: impl Into<String>) -> Self {
        self.algorithm = name.into();
        self
    }

    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_num_envs(mut self, num_envs: usize) -> Self {
        self.num_envs = num_envs;
        self
    }

    pub fn with_num_eval_envs(mut self, num_eval_envs: usize) -> Self {
        self.num_eval_envs = num_eval_envs;
        self
    }

    pub fn with_num_agents(mut self, num_agents: usize) -> Self {
        self.num_agents = num_agents;
        self
    }

    pub fn with_total_env_steps(mut self, steps: u64) -> Self {
        self.total_env_steps = steps;
        self
    }

    pub fn with_save_interval(mut self, interval: u64) -> Self {
        self.save_interval = interval;
        self
    }

    pub fn with_log_interval(mut self, interval: u64) -> Self {
        self.log_interval = interval;
        self
    }

    pub fn with_eval_interval(mut self, interval: u64) -> Self {
        self.eval_interval = interval;
        self
    }

    pub fn with_eval(mut self, use_eval: bool) -> Self {
        self.use_eval = use_eval;
        self
    }

    pub fn with_eval_episodes(mut self, episodes: usize) -> Self {
        self.eval_episodes = episodes;
        self
    }

    pub fn with_eval_reward_aggregation(mut self, aggregation: RewardAggregation) -> Self {
        self.eval_reward_aggregation = aggregation;
        self
    }
}
