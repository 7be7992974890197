//! Vectorized multi-agent environment abstraction.
//!
//! A [`MultiAgentVecEnv`] steps `E` independent environment instances, each
//! hosting `A` agents, in a single blocking batched call. Apparent
//! parallelism across instances is entirely the implementation's concern;
//! the training core treats `reset` and `step` as atomic.
//!
//! Implementations are expected to auto-reset an instance whose episode
//! finished: the observations returned by the `step` call that reports done
//! are the first observations of the instance's next episode. The core
//! never calls `reset` mid-run.

use std::collections::HashMap;
use std::fmt;

use ndarray::{Array1, Array2, Array3, ArrayView3};

/// Propagated environment failure.
///
/// Environment steps are assumed deterministic-on-success in this domain,
/// so failures are not retried; they terminate the run.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvError {
    message: String,
}

impl EnvError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EnvError {}

/// Done flags reported by an environment step.
///
/// Environments may report termination per agent or per instance; per-env
/// flags broadcast across the agent axis on demand.
#[derive(Debug, Clone, PartialEq)]
pub enum DoneFlags {
    /// One flag per `(env, agent)` pair, shape `(E, A)`.
    PerAgent(Array2<bool>),
    /// One flag per environment instance, shape `(E,)`.
    PerEnv(Array1<bool>),
}

impl DoneFlags {
    /// Number of environment instances covered by these flags.
    pub fn num_envs(&self) -> usize {
        match self {
            DoneFlags::PerAgent(flags) => flags.nrows(),
            DoneFlags::PerEnv(flags) => flags.len(),
        }
    }

    /// Expand to a per-agent `(E, A)` mask.
    pub fn per_agent(&self, num_agents: usize) -> Array2<bool> {
        match self {
            DoneFlags::PerAgent(flags) => flags.clone(),
            DoneFlags::PerEnv(flags) => {
                Array2::from_shape_fn((flags.len(), num_agents), |(e, _)| flags[e])
            }
        }
    }

    /// Reduce to per-env flags: an instance is done only when every one of
    /// its agents is done (logical AND across the agent axis).
    pub fn env_done(&self) -> Array1<bool> {
        match self {
            DoneFlags::PerAgent(flags) => Array1::from_iter(
                flags.outer_iter().map(|agents| agents.iter().all(|&d| d)),
            ),
            DoneFlags::PerEnv(flags) => flags.clone(),
        }
    }
}

/// Auxiliary per-instance diagnostics, opaque to the core.
pub type InfoBatch = Vec<HashMap<String, String>>;

/// Result of one batched environment step.
#[derive(Debug, Clone)]
pub struct EnvStepOutcome {
    /// Next observations, shape `(E, A, obs_dim)`.
    pub obs: Array3<f32>,
    /// Rewards for the applied actions, shape `(E, A, reward_dim)`.
    pub rewards: Array3<f32>,
    /// Termination flags.
    pub dones: DoneFlags,
    /// Per-instance info, unused by the core loop.
    pub infos: InfoBatch,
}

/// Vectorized multi-agent environment pool.
pub trait MultiAgentVecEnv {
    /// Number of parallel environment instances.
    fn num_envs(&self) -> usize;

    /// Number of agents per instance.
    fn num_agents(&self) -> usize;

    /// Per-agent observation width.
    fn obs_dim(&self) -> usize;

    /// Per-agent action width.
    fn act_dim(&self) -> usize;

    /// Per-agent reward width.
    fn reward_dim(&self) -> usize {
        1
    }

    /// Reset every instance, returning observations shaped `(E, A, obs_dim)`.
    fn reset(&mut self) -> Result<Array3<f32>, EnvError>;

    /// Step every instance with actions shaped `(E, A, act_dim)`.
    fn step(&mut self, actions: ArrayView3<'_, f32>) -> Result<EnvStepOutcome, EnvError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_per_env_flags_broadcast() {
        let flags = DoneFlags::PerEnv(array![true, false]);
        let per_agent = flags.per_agent(3);
        assert_eq!(per_agent, array![[true, true, true], [false, false, false]]);
    }

    #[test]
    fn test_per_agent_flags_env_done_requires_all_agents() {
        let flags = DoneFlags::PerAgent(array![[true, true], [true, false], [false, false]]);
        assert_eq!(flags.env_done(), array![true, false, false]);
    }

    #[test]
    fn test_done_flags_num_envs() {
        assert_eq!(DoneFlags::PerEnv(array![false, false, true]).num_envs(), 3);
        assert_eq!(DoneFlags::PerAgent(array![[false], [true]]).num_envs(), 2);
    }
}
