//! Training orchestration.
//!
//! [`TrainingRunner`] owns the full loop: warmup, per-step collection and
//! insertion, return computation and policy update once per horizon, and the
//! periodic checkpoint, logging, and evaluation duties between cycles. All
//! collaborators arrive through trait seams so the loop stays independent of
//! the network library and the simulated domain.

use std::time::{Duration, Instant};

use crate::buffer::{FeatureDims, RolloutBuffer, Transition};
use crate::checkpoint::CheckpointStore;
use crate::collector::{collect_step, reset_where};
use crate::config::TrainingConfig;
use crate::env::MultiAgentVecEnv;
use crate::error::{ConfigError, HarnessError};
use crate::eval::run_evaluation;
use crate::metrics::{MetricsSink, TrainMetrics};
use crate::policy::{PolicySnapshot, RolloutPolicy, Trainer};

/// Summary of a completed training run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Update cycles executed.
    pub cycles: u64,
    /// Total environment steps consumed (vector steps times `num_envs`).
    pub env_steps: u64,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

/// The on-policy training loop.
///
/// One cycle collects `horizon` vector steps into the rollout buffer,
/// computes returns, runs one policy update, and carries the final slot
/// over as the next cycle's starting state. The step budget fixes the
/// cycle count up front; no early-stopping logic exists here.
pub struct TrainingRunner<E, P, T, C, M> {
    config: TrainingConfig,
    envs: E,
    eval_envs: Option<E>,
    policy: P,
    trainer: T,
    checkpoints: C,
    metrics: M,
    buffer: RolloutBuffer,
}

impl<E, P, T, C, M> TrainingRunner<E, P, T, C, M>
where
    E: MultiAgentVecEnv,
    P: RolloutPolicy + PolicySnapshot,
    T: Trainer,
    C: CheckpointStore,
    M: MetricsSink,
{
    /// Validate the configuration against the collaborators and allocate the
    /// rollout buffer. Fails before any simulation on a bad setup.
    pub fn new(
        config: TrainingConfig,
        envs: E,
        eval_envs: Option<E>,
        policy: P,
        trainer: T,
        checkpoints: C,
        metrics: M,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        if envs.num_agents() != config.num_agents {
            return Err(ConfigError::AgentArityMismatch {
                expected: config.num_agents,
                actual: envs.num_agents(),
            });
        }
        if config.use_eval {
            match &eval_envs {
                None => return Err(ConfigError::MissingEvalEnvs),
                Some(pool) if pool.num_agents() != config.num_agents => {
                    return Err(ConfigError::AgentArityMismatch {
                        expected: config.num_agents,
                        actual: pool.num_agents(),
                    });
                }
                Some(_) => {}
            }
        }

        let dims = FeatureDims::new(
            envs.obs_dim(),
            envs.act_dim(),
            envs.reward_dim(),
            policy.actor_state_dim(),
            policy.critic_state_dim(),
        );
        let buffer = RolloutBuffer::new(config.horizon, config.num_envs, config.num_agents, dims);

        Ok(Self {
            config,
            envs,
            eval_envs,
            policy,
            trainer,
            checkpoints,
            metrics,
            buffer,
        })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn buffer(&self) -> &RolloutBuffer {
        &self.buffer
    }

    /// Restore the policy from the newest checkpoint in the store, if any.
    /// Returns the environment-step count the checkpoint was saved at.
    pub fn restore_latest(&mut self) -> Result<Option<u64>, HarnessError> {
        match self.checkpoints.latest()? {
            Some((snapshot, step)) => {
                self.policy.restore(&snapshot)?;
                Ok(Some(step))
            }
            None => Ok(None),
        }
    }

    /// Run the full training loop to the configured step budget.
    pub fn run(&mut self) -> Result<RunSummary, HarnessError> {
        let cycles = self.config.update_cycles();
        let horizon = self.config.horizon;
        let steps_per_cycle = self.config.steps_per_cycle();

        let obs = self.envs.reset()?;
        self.buffer.warmup(obs)?;

        let start = Instant::now();

        for cycle in 0..cycles {
            for step in 0..horizon {
                self.collect_and_insert(step)?;
            }

            self.trainer.compute_returns(&mut self.buffer);
            let train_metrics = self.trainer.update(&self.buffer);

            let env_steps = (cycle + 1) * steps_per_cycle;

            if cycle % self.config.save_interval == 0 || cycle == cycles - 1 {
                let snapshot = self.policy.snapshot();
                self.checkpoints.save(&snapshot, env_steps)?;
            }

            if cycle % self.config.log_interval == 0 {
                self.log_cycle(train_metrics, env_steps, start.elapsed());
            }

            if self.config.use_eval && cycle % self.config.eval_interval == 0 {
                self.evaluate(env_steps)?;
            }

            self.buffer.advance_horizon();
        }

        self.metrics.flush();

        Ok(RunSummary {
            cycles,
            env_steps: cycles * steps_per_cycle,
            elapsed: start.elapsed(),
        })
    }

    /// One collection step: query the policy at the buffer cursor, advance
    /// the environments, zero recurrent states where episodes ended, and
    /// insert the transition.
    fn collect_and_insert(&mut self, step: usize) -> Result<(), HarnessError> {
        let collected = collect_step(&self.buffer, &self.policy, step)?;

        let outcome = self.envs.step(collected.actions.view())?;
        let per_agent_dones = outcome.dones.per_agent(self.config.num_agents);

        // Episodes that ended restart from a blank recurrent state.
        let rnn_actor = reset_where(collected.rnn_actor, &per_agent_dones.view());
        let rnn_critic = reset_where(collected.rnn_critic, &per_agent_dones.view());

        self.buffer.insert(Transition {
            obs: outcome.obs,
            actions: collected.actions,
            rewards: outcome.rewards,
            dones: per_agent_dones,
            log_probs: collected.log_probs,
            values: collected.values,
            rnn_actor,
            rnn_critic,
        })?;

        Ok(())
    }

    fn log_cycle(&mut self, mut train_metrics: TrainMetrics, env_steps: u64, elapsed: Duration) {
        train_metrics.insert(
            "average_episode_rewards".to_string(),
            self.buffer.mean_reward() * self.config.horizon as f32,
        );
        let secs = elapsed.as_secs_f32();
        if secs > 0.0 {
            train_metrics.insert("steps_per_second".to_string(), env_steps as f32 / secs);
        }
        self.metrics.log_info(&train_metrics, env_steps);
    }

    fn evaluate(&mut self, env_steps: u64) -> Result<(), HarnessError> {
        let eval_envs = match self.eval_envs.as_mut() {
            Some(pool) => pool,
            None => return Err(ConfigError::MissingEvalEnvs.into()),
        };

        let report = run_evaluation(
            eval_envs,
            &self.policy,
            self.config.eval_episodes,
            self.config.eval_reward_aggregation,
        )?;

        let mut eval_metrics = TrainMetrics::new();
        eval_metrics.insert(
            "eval_average_episode_rewards".to_string(),
            report.mean_episode_reward,
        );
        self.metrics.log_info(&eval_metrics, env_steps);

        Ok(())
    }
}
