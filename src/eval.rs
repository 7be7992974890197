//! Deterministic policy evaluation over a dedicated environment pool.
//!
//! Evaluation runs episodes to completion with sampling disabled and its own
//! recurrent state, never touching the rollout buffer. An episode counts as
//! complete only when every agent in an environment reports done on the same
//! step; environments finishing simultaneously each contribute one episode.

use ndarray::{s, Array2, Array3, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::collector::{merge_agents, reset_where, split_agents};
use crate::env::MultiAgentVecEnv;
use crate::error::{ConfigError, HarnessError, ShapeMismatch};
use crate::policy::RolloutPolicy;

/// How the per-agent cumulative rewards of a finished episode reduce to the
/// single scalar recorded for that episode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RewardAggregation {
    /// Mean over the agent axis.
    MeanAcrossAgents,
    /// Sum over the agent axis.
    SumAcrossAgents,
    /// A single agent's reward, by index.
    Agent(usize),
}

impl Default for RewardAggregation {
    fn default() -> Self {
        RewardAggregation::MeanAcrossAgents
    }
}

impl RewardAggregation {
    /// Reduce one environment's `(A,)` cumulative reward row.
    pub fn aggregate(&self, per_agent: ArrayView1<'_, f32>) -> f32 {
        match self {
            RewardAggregation::MeanAcrossAgents => {
                per_agent.mean().unwrap_or(0.0)
            }
            RewardAggregation::SumAcrossAgents => per_agent.sum(),
            RewardAggregation::Agent(idx) => per_agent[*idx],
        }
    }
}

/// Outcome of one evaluation run.
#[derive(Debug, Clone)]
pub struct EvalReport {
    /// Mean of the recorded episode rewards.
    pub mean_episode_reward: f32,
    /// One aggregated reward per completed episode, in completion order.
    pub episode_rewards: Vec<f32>,
    /// Number of episodes recorded.
    pub episodes: usize,
}

/// Run the policy deterministically until at least `target_episodes`
/// episodes have completed, and report per-episode rewards.
///
/// Every environment that finishes on the final step is recorded, so the
/// report may hold more than `target_episodes` entries when completions
/// land simultaneously. Reward channels are summed per agent before
/// accumulation. On episode completion the environment's reward
/// accumulator and recurrent state rows are zeroed so the auto-reset
/// episode starts fresh.
pub fn run_evaluation<E, P>(
    envs: &mut E,
    policy: &P,
    target_episodes: usize,
    aggregation: RewardAggregation,
) -> Result<EvalReport, HarnessError>
where
    E: MultiAgentVecEnv,
    P: RolloutPolicy,
{
    let num_envs = envs.num_envs();
    let num_agents = envs.num_agents();
    let batch_rows = num_envs * num_agents;

    if let RewardAggregation::Agent(idx) = aggregation {
        if idx >= num_agents {
            return Err(ConfigError::InvalidValue {
                field: "eval_reward_aggregation",
                message: format!("agent index {} out of range for {} agents", idx, num_agents),
            }
            .into());
        }
    }

    let mut obs = envs.reset()?;
    let mut rnn = Array3::<f32>::zeros((num_envs, num_agents, policy.actor_state_dim()));
    let mut cumulative = Array2::<f32>::zeros((num_envs, num_agents));
    let mut episode_rewards = Vec::with_capacity(target_episodes);

    while episode_rewards.len() < target_episodes {
        let merged_obs = merge_agents(obs.view());
        let merged_rnn = merge_agents(rnn.view());
        let (actions, next_rnn) = policy.act(merged_obs.view(), merged_rnn.view(), true);

        if actions.nrows() != batch_rows {
            return Err(ShapeMismatch::new(
                "eval policy actions",
                vec![batch_rows, actions.ncols()],
                vec![actions.nrows(), actions.ncols()],
            )
            .into());
        }
        if next_rnn.nrows() != batch_rows {
            return Err(ShapeMismatch::new(
                "eval policy rnn states",
                vec![batch_rows, next_rnn.ncols()],
                vec![next_rnn.nrows(), next_rnn.ncols()],
            )
            .into());
        }

        let actions = split_agents(actions, num_envs)?;
        rnn = split_agents(next_rnn, num_envs)?;

        let outcome = envs.step(actions.view())?;

        // Reward channels collapse per agent before accumulation.
        let step_rewards = outcome.rewards.sum_axis(Axis(2));
        cumulative += &step_rewards;

        let per_agent_dones = outcome.dones.per_agent(num_agents);
        rnn = reset_where(rnn, &per_agent_dones.view());

        let env_done = outcome.dones.env_done();
        for env_idx in 0..num_envs {
            if env_done[env_idx] {
                episode_rewards.push(aggregation.aggregate(cumulative.row(env_idx)));
                cumulative.slice_mut(s![env_idx, ..]).fill(0.0);
            }
        }

        obs = outcome.obs;
    }

    let episodes = episode_rewards.len();
    let mean_episode_reward = if episodes == 0 {
        0.0
    } else {
        episode_rewards.iter().sum::<f32>() / episodes as f32
    };

    Ok(EvalReport {
        mean_episode_reward,
        episode_rewards,
        episodes,
    })
}
