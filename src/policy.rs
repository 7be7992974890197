//! Policy and trainer collaborator seams.
//!
//! The network architecture, loss computation, and gradient updates all
//! live behind these traits. The core loop only needs batched inference
//! over flattened `(E*A, feature)` arrays during collection, deterministic
//! action selection during evaluation, and an update entry point once a
//! horizon is full.

use ndarray::{Array2, ArrayView2};

use crate::buffer::RolloutBuffer;
use crate::checkpoint::CheckpointError;
use crate::metrics::TrainMetrics;

/// Output of one batched policy query during collection.
///
/// Every array is batch-flattened with `E*A` rows in environment-major,
/// agent-minor order, matching the layout the collector handed in.
#[derive(Debug, Clone)]
pub struct PolicyStep {
    /// Value estimates, `(E*A, 1)`.
    pub values: Array2<f32>,
    /// Sampled actions, `(E*A, act_dim)`.
    pub actions: Array2<f32>,
    /// Log-probabilities of the sampled actions, `(E*A, act_dim)`.
    pub log_probs: Array2<f32>,
    /// Updated actor recurrent states, `(E*A, actor_state_dim)`.
    pub rnn_actor: Array2<f32>,
    /// Updated critic recurrent states, `(E*A, critic_state_dim)`.
    pub rnn_critic: Array2<f32>,
}

/// Recurrent actor-critic policy queried by the rollout collector.
///
/// Implementations must not track gradients inside these calls; both are
/// pure inference.
pub trait RolloutPolicy {
    /// Feature width of the actor's recurrent state.
    fn actor_state_dim(&self) -> usize;

    /// Feature width of the critic's recurrent state.
    fn critic_state_dim(&self) -> usize;

    /// Stochastic batched query used during collection.
    fn get_actions(
        &self,
        obs: ArrayView2<'_, f32>,
        rnn_actor: ArrayView2<'_, f32>,
        rnn_critic: ArrayView2<'_, f32>,
    ) -> PolicyStep;

    /// Action selection for evaluation. With `deterministic` set, no
    /// exploration noise or sampling is applied. Returns the actions and
    /// the updated actor recurrent states.
    fn act(
        &self,
        obs: ArrayView2<'_, f32>,
        rnn: ArrayView2<'_, f32>,
        deterministic: bool,
    ) -> (Array2<f32>, Array2<f32>);
}

/// Opaque policy-state serialization seam for checkpointing.
///
/// The byte format is entirely the policy's business; the harness only
/// moves the bytes between the policy and a [`crate::checkpoint::CheckpointStore`].
pub trait PolicySnapshot {
    /// Serialize the full policy state.
    fn snapshot(&self) -> Vec<u8>;

    /// Restore the policy from a snapshot produced by [`PolicySnapshot::snapshot`].
    fn restore(&mut self, bytes: &[u8]) -> Result<(), CheckpointError>;
}

/// External return computation and policy update.
pub trait Trainer {
    /// Compute returns over the filled buffer, writing them into
    /// `buffer.returns`. Runs once per horizon, after the final insert and
    /// before [`Trainer::update`].
    fn compute_returns(&mut self, buffer: &mut RolloutBuffer);

    /// Run one policy update over the filled buffer and report training
    /// metrics.
    fn update(&mut self, buffer: &RolloutBuffer) -> TrainMetrics;
}
