//! Fixed-horizon trajectory buffer for on-policy collection.
//!
//! Every per-step quantity is stored as one array over four axes:
//! time step `t ∈ [0, H]`, environment `e ∈ [0, E)`, agent `a ∈ [0, A)`,
//! and a trailing feature axis. Slot 0 of the time axis carries the
//! observation (and recurrent state) that continues from the previous
//! horizon, so episodes flow across update cycles without resets.
//!
//! The buffer is allocated once at startup and never resized. It has a
//! single writer: [`RolloutBuffer::insert`] appends one step's transition
//! at the slot after the cursor; readers (return computation, summary
//! statistics) run strictly between horizons, enforced by the orchestrator's
//! phase sequencing rather than by locks.

use ndarray::{s, Array2, Array3, Array4};

use crate::error::ShapeMismatch;

/// Feature widths of every stored quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureDims {
    /// Per-agent observation width.
    pub obs: usize,
    /// Per-agent action width.
    pub act: usize,
    /// Per-agent reward width.
    pub reward: usize,
    /// Log-probability width (one per action dimension).
    pub log_prob: usize,
    /// Value-estimate width.
    pub value: usize,
    /// Actor recurrent-state width.
    pub rnn_actor: usize,
    /// Critic recurrent-state width.
    pub rnn_critic: usize,
}

impl FeatureDims {
    /// Build from environment and policy widths. Log-probabilities follow
    /// the action width; values are scalar.
    pub fn new(obs: usize, act: usize, reward: usize, rnn_actor: usize, rnn_critic: usize) -> Self {
        Self {
            obs,
            act,
            reward,
            log_prob: act,
            value: 1,
            rnn_actor,
            rnn_critic,
        }
    }
}

/// One step's transition across all environments and agents.
#[derive(Debug, Clone)]
pub struct Transition {
    /// Observations after the step, `(E, A, obs_dim)`.
    pub obs: Array3<f32>,
    /// Actions applied, `(E, A, act_dim)`.
    pub actions: Array3<f32>,
    /// Rewards for the applied actions, `(E, A, reward_dim)`.
    pub rewards: Array3<f32>,
    /// Per-agent done flags, `(E, A)`.
    pub dones: Array2<bool>,
    /// Log-probabilities of the applied actions, `(E, A, act_dim)`.
    pub log_probs: Array3<f32>,
    /// Value estimates at the pre-step observation, `(E, A, 1)`.
    pub values: Array3<f32>,
    /// Actor recurrent states for the next query, `(E, A, rnn_actor_dim)`.
    /// Already zeroed where `dones` is set.
    pub rnn_actor: Array3<f32>,
    /// Critic recurrent states for the next query, `(E, A, rnn_critic_dim)`.
    pub rnn_critic: Array3<f32>,
}

/// Fixed-horizon rollout buffer.
///
/// Fields are public so external return computation and metric readers can
/// access the stored arrays directly.
#[derive(Debug, Clone)]
pub struct RolloutBuffer {
    /// Observations, `(H+1, E, A, obs_dim)`. Slot 0 is written at warmup
    /// and by [`RolloutBuffer::advance_horizon`].
    pub obs: Array4<f32>,
    /// Actions, `(H+1, E, A, act_dim)`. Slot 0 is never written.
    pub actions: Array4<f32>,
    /// Action log-probabilities, `(H+1, E, A, act_dim)`. Slot 0 unused.
    pub action_log_probs: Array4<f32>,
    /// Value estimates, `(H+1, E, A, 1)`. Slot 0 unused.
    pub values: Array4<f32>,
    /// Rewards, `(H+1, E, A, reward_dim)`. Slot 0 unused.
    pub rewards: Array4<f32>,
    /// Returns written by external return computation, `(H+1, E, A, 1)`.
    pub returns: Array4<f32>,
    /// Done flags, `(H+1, E, A)`. Slot 0 unused.
    pub dones: Array3<bool>,
    /// Actor recurrent states, `(H+1, E, A, rnn_actor_dim)`.
    pub rnn_states_actor: Array4<f32>,
    /// Critic recurrent states, `(H+1, E, A, rnn_critic_dim)`.
    pub rnn_states_critic: Array4<f32>,

    /// Horizon length H.
    pub horizon: usize,
    /// Number of parallel environments E.
    pub num_envs: usize,
    /// Number of agents A.
    pub num_agents: usize,
    /// Feature widths.
    pub dims: FeatureDims,

    step: usize,
}

impl RolloutBuffer {
    /// Allocate a zeroed buffer for the full run.
    pub fn new(horizon: usize, num_envs: usize, num_agents: usize, dims: FeatureDims) -> Self {
        let (h, e, a) = (horizon, num_envs, num_agents);
        Self {
            obs: Array4::zeros((h + 1, e, a, dims.obs)),
            actions: Array4::zeros((h + 1, e, a, dims.act)),
            action_log_probs: Array4::zeros((h + 1, e, a, dims.log_prob)),
            values: Array4::zeros((h + 1, e, a, dims.value)),
            rewards: Array4::zeros((h + 1, e, a, dims.reward)),
            returns: Array4::zeros((h + 1, e, a, dims.value)),
            dones: Array3::from_elem((h + 1, e, a), false),
            rnn_states_actor: Array4::zeros((h + 1, e, a, dims.rnn_actor)),
            rnn_states_critic: Array4::zeros((h + 1, e, a, dims.rnn_critic)),
            horizon,
            num_envs,
            num_agents,
            dims,
            step: 0,
        }
    }

    /// Current step cursor, in `[0, H)`. The next insert writes slot
    /// `cursor + 1`.
    pub fn step(&self) -> usize {
        self.step
    }

    /// Write the initial observations into slot 0 and zero every recurrent
    /// state. Called once, before the first collection step.
    pub fn warmup(&mut self, obs: Array3<f32>) -> Result<(), ShapeMismatch> {
        expect_feature_shape("warmup obs", &obs, self.num_envs, self.num_agents, self.dims.obs)?;
        self.obs.slice_mut(s![0, .., .., ..]).assign(&obs);
        self.rnn_states_actor.fill(0.0);
        self.rnn_states_critic.fill(0.0);
        self.step = 0;
        Ok(())
    }

    /// Append one step's transition at the slot after the cursor, then
    /// advance the cursor modulo the horizon.
    ///
    /// After `H` inserts following a warmup, slots `1..=H` are fully
    /// populated and slot 0 still holds the continuation observation.
    pub fn insert(&mut self, transition: Transition) -> Result<(), ShapeMismatch> {
        let (e, a) = (self.num_envs, self.num_agents);
        expect_feature_shape("transition obs", &transition.obs, e, a, self.dims.obs)?;
        expect_feature_shape("transition actions", &transition.actions, e, a, self.dims.act)?;
        expect_feature_shape("transition rewards", &transition.rewards, e, a, self.dims.reward)?;
        expect_feature_shape(
            "transition log_probs",
            &transition.log_probs,
            e,
            a,
            self.dims.log_prob,
        )?;
        expect_feature_shape("transition values", &transition.values, e, a, self.dims.value)?;
        expect_feature_shape(
            "transition rnn_actor",
            &transition.rnn_actor,
            e,
            a,
            self.dims.rnn_actor,
        )?;
        expect_feature_shape(
            "transition rnn_critic",
            &transition.rnn_critic,
            e,
            a,
            self.dims.rnn_critic,
        )?;
        if transition.dones.dim() != (e, a) {
            let (de, da) = transition.dones.dim();
            return Err(ShapeMismatch::new("transition dones", vec![e, a], vec![de, da]));
        }

        let slot = self.step + 1;
        self.obs.slice_mut(s![slot, .., .., ..]).assign(&transition.obs);
        self.actions
            .slice_mut(s![slot, .., .., ..])
            .assign(&transition.actions);
        self.action_log_probs
            .slice_mut(s![slot, .., .., ..])
            .assign(&transition.log_probs);
        self.values
            .slice_mut(s![slot, .., .., ..])
            .assign(&transition.values);
        self.rewards
            .slice_mut(s![slot, .., .., ..])
            .assign(&transition.rewards);
        self.dones.slice_mut(s![slot, .., ..]).assign(&transition.dones);
        self.rnn_states_actor
            .slice_mut(s![slot, .., .., ..])
            .assign(&transition.rnn_actor);
        self.rnn_states_critic
            .slice_mut(s![slot, .., .., ..])
            .assign(&transition.rnn_critic);

        self.step = (self.step + 1) % self.horizon;
        Ok(())
    }

    /// Wrap the final slot into slot 0 for the next horizon.
    ///
    /// Invoked by the orchestrator only after return computation and the
    /// policy update have read the filled horizon; the read-then-overwrite
    /// ordering is guaranteed by that sequencing.
    pub fn advance_horizon(&mut self) {
        let h = self.horizon;

        let last_obs = self.obs.slice(s![h, .., .., ..]).to_owned();
        self.obs.slice_mut(s![0, .., .., ..]).assign(&last_obs);

        let last_actor = self.rnn_states_actor.slice(s![h, .., .., ..]).to_owned();
        self.rnn_states_actor
            .slice_mut(s![0, .., .., ..])
            .assign(&last_actor);

        let last_critic = self.rnn_states_critic.slice(s![h, .., .., ..]).to_owned();
        self.rnn_states_critic
            .slice_mut(s![0, .., .., ..])
            .assign(&last_critic);

        let last_dones = self.dones.slice(s![h, .., ..]).to_owned();
        self.dones.slice_mut(s![0, .., ..]).assign(&last_dones);

        self.step = 0;
    }

    /// Mean reward over the collected horizon (slots `1..=H`; slot 0 is
    /// never written by inserts).
    pub fn mean_reward(&self) -> f32 {
        self.rewards.slice(s![1.., .., .., ..]).mean().unwrap_or(0.0)
    }
}

fn expect_feature_shape(
    context: &'static str,
    array: &Array3<f32>,
    num_envs: usize,
    num_agents: usize,
    feature: usize,
) -> Result<(), ShapeMismatch> {
    let actual = array.dim();
    if actual != (num_envs, num_agents, feature) {
        return Err(ShapeMismatch::new(
            context,
            vec![num_envs, num_agents, feature],
            vec![actual.0, actual.1, actual.2],
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dims() -> FeatureDims {
        FeatureDims::new(3, 2, 1, 4, 4)
    }

    fn filled_transition(e: usize, a: usize, dims: &FeatureDims, fill: f32) -> Transition {
        Transition {
            obs: Array3::from_elem((e, a, dims.obs), fill),
            actions: Array3::from_elem((e, a, dims.act), fill),
            rewards: Array3::from_elem((e, a, dims.reward), fill),
            dones: Array2::from_elem((e, a), false),
            log_probs: Array3::from_elem((e, a, dims.log_prob), fill),
            values: Array3::from_elem((e, a, dims.value), fill),
            rnn_actor: Array3::from_elem((e, a, dims.rnn_actor), fill),
            rnn_critic: Array3::from_elem((e, a, dims.rnn_critic), fill),
        }
    }

    #[test]
    fn test_allocation_shapes() {
        let dims = test_dims();
        let buffer = RolloutBuffer::new(5, 4, 2, dims);

        assert_eq!(buffer.obs.dim(), (6, 4, 2, 3));
        assert_eq!(buffer.actions.dim(), (6, 4, 2, 2));
        assert_eq!(buffer.action_log_probs.dim(), (6, 4, 2, 2));
        assert_eq!(buffer.values.dim(), (6, 4, 2, 1));
        assert_eq!(buffer.rewards.dim(), (6, 4, 2, 1));
        assert_eq!(buffer.returns.dim(), (6, 4, 2, 1));
        assert_eq!(buffer.dones.dim(), (6, 4, 2));
        assert_eq!(buffer.rnn_states_actor.dim(), (6, 4, 2, 4));
        assert_eq!(buffer.rnn_states_critic.dim(), (6, 4, 2, 4));
    }

    #[test]
    fn test_insert_advances_cursor_and_writes_next_slot() {
        let dims = test_dims();
        let mut buffer = RolloutBuffer::new(3, 2, 1, dims);

        assert_eq!(buffer.step(), 0);
        buffer.insert(filled_transition(2, 1, &dims, 1.0)).unwrap();
        assert_eq!(buffer.step(), 1);
        assert_eq!(buffer.obs[[1, 0, 0, 0]], 1.0);
        assert_eq!(buffer.obs[[0, 0, 0, 0]], 0.0);

        buffer.insert(filled_transition(2, 1, &dims, 2.0)).unwrap();
        buffer.insert(filled_transition(2, 1, &dims, 3.0)).unwrap();
        // Cursor wraps after H inserts.
        assert_eq!(buffer.step(), 0);
        assert_eq!(buffer.obs[[3, 1, 0, 2]], 3.0);
    }

    #[test]
    fn test_insert_rejects_wrong_shapes() {
        let dims = test_dims();
        let mut buffer = RolloutBuffer::new(3, 2, 1, dims);

        let mut transition = filled_transition(2, 1, &dims, 1.0);
        transition.obs = Array3::zeros((2, 1, 7));
        let err = buffer.insert(transition).unwrap_err();
        assert_eq!(err.context, "transition obs");
        assert_eq!(err.expected, vec![2, 1, 3]);
        assert_eq!(err.actual, vec![2, 1, 7]);
    }

    #[test]
    fn test_warmup_writes_slot_zero_and_zeroes_states() {
        let dims = test_dims();
        let mut buffer = RolloutBuffer::new(3, 2, 1, dims);
        buffer.rnn_states_actor.fill(9.0);
        buffer.rnn_states_critic.fill(9.0);

        let obs = Array3::from_elem((2, 1, 3), 0.5);
        buffer.warmup(obs).unwrap();

        assert_eq!(buffer.obs[[0, 1, 0, 2]], 0.5);
        assert_eq!(buffer.rnn_states_actor.sum(), 0.0);
        assert_eq!(buffer.rnn_states_critic.sum(), 0.0);
        assert_eq!(buffer.step(), 0);
    }

    #[test]
    fn test_advance_horizon_continuity() {
        let dims = test_dims();
        let mut buffer = RolloutBuffer::new(2, 2, 1, dims);

        buffer
            .warmup(Array3::from_elem((2, 1, 3), 0.1))
            .unwrap();
        buffer.insert(filled_transition(2, 1, &dims, 1.5)).unwrap();
        let mut last = filled_transition(2, 1, &dims, 2.5);
        last.obs[[0, 0, 1]] = -7.25;
        buffer.insert(last).unwrap();

        let final_obs = buffer.obs.slice(s![2, .., .., ..]).to_owned();
        buffer.advance_horizon();

        // Bit-for-bit continuity into slot 0.
        assert_eq!(buffer.obs.slice(s![0, .., .., ..]), final_obs);
        assert_eq!(buffer.obs[[0, 0, 0, 1]], -7.25);
        assert_eq!(buffer.step(), 0);
    }

    #[test]
    fn test_mean_reward_ignores_slot_zero() {
        let dims = test_dims();
        let mut buffer = RolloutBuffer::new(2, 1, 1, dims);

        let mut t1 = filled_transition(1, 1, &dims, 0.0);
        t1.rewards.fill(2.0);
        let mut t2 = filled_transition(1, 1, &dims, 0.0);
        t2.rewards.fill(4.0);
        buffer.insert(t1).unwrap();
        buffer.insert(t2).unwrap();

        assert_eq!(buffer.mean_reward(), 3.0);
    }
}
