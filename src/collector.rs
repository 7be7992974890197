//! Rollout collection: batched policy queries and recurrent-state resets.
//!
//! The policy is queried once per time step over all environments and
//! agents at once. The `(E, A)` leading axes are merged into a single
//! batch axis of `E*A` rows for the query and split back afterwards. The
//! merge is environment-major, agent-minor: rows `[e*A, (e+1)*A)` belong
//! to environment `e`. Downstream done-flag masking and buffer indexing
//! assume exactly this layout.

use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3};

use crate::buffer::RolloutBuffer;
use crate::error::ShapeMismatch;
use crate::policy::RolloutPolicy;

/// Merge the `(E, A)` leading axes of a batch into `E*A` rows.
pub fn merge_agents(batch: ArrayView3<'_, f32>) -> Array2<f32> {
    let (e, a, f) = batch.dim();
    // A C-order (E, A, F) array reshapes to (E*A, F) without moving data.
    batch
        .to_owned()
        .into_shape_with_order((e * a, f))
        .expect("reshape (E, A, F) to (E*A, F)")
}

/// Split `E*A` batch rows back into `(E, A, F)`, as `E` contiguous blocks
/// of `A` rows.
pub fn split_agents(flat: Array2<f32>, num_envs: usize) -> Result<Array3<f32>, ShapeMismatch> {
    let (rows, f) = flat.dim();
    if num_envs == 0 || rows % num_envs != 0 {
        return Err(ShapeMismatch::new(
            "split batch rows",
            vec![num_envs, rows / num_envs.max(1)],
            vec![rows],
        ));
    }
    let a = rows / num_envs;
    flat.into_shape_with_order((num_envs, a, f))
        .map_err(|_| ShapeMismatch::new("split batch rows", vec![num_envs, a, f], vec![rows, f]))
}

/// Zero every `(e, a)` row of `states` whose done flag is set, leaving all
/// other rows untouched.
///
/// Takes ownership and returns the masked array so the caller cannot alias
/// the pre-reset states with the ones handed to the next collection query.
pub fn reset_where(mut states: Array3<f32>, dones: &ArrayView2<'_, bool>) -> Array3<f32> {
    debug_assert_eq!(states.dim().0, dones.dim().0);
    debug_assert_eq!(states.dim().1, dones.dim().1);
    for ((env_idx, agent_idx), &done) in dones.indexed_iter() {
        if done {
            states.slice_mut(s![env_idx, agent_idx, ..]).fill(0.0);
        }
    }
    states
}

/// One step's worth of policy output, reshaped back to `(E, A, feature)`.
#[derive(Debug, Clone)]
pub struct CollectedStep {
    pub values: Array3<f32>,
    pub actions: Array3<f32>,
    pub log_probs: Array3<f32>,
    pub rnn_actor: Array3<f32>,
    pub rnn_critic: Array3<f32>,
}

/// Query the policy for step `step` of the buffer.
///
/// Reads `obs[step]` and both recurrent-state slots, flattens them for the
/// batched query, and splits each result back to environment-indexed
/// layout. Does not mutate the buffer; the orchestrator performs the
/// insert.
pub fn collect_step<P: RolloutPolicy>(
    buffer: &RolloutBuffer,
    policy: &P,
    step: usize,
) -> Result<CollectedStep, ShapeMismatch> {
    let e = buffer.num_envs;
    let rows = e * buffer.num_agents;

    let obs = merge_agents(buffer.obs.slice(s![step, .., .., ..]));
    let rnn_actor = merge_agents(buffer.rnn_states_actor.slice(s![step, .., .., ..]));
    let rnn_critic = merge_agents(buffer.rnn_states_critic.slice(s![step, .., .., ..]));

    let output = policy.get_actions(obs.view(), rnn_actor.view(), rnn_critic.view());

    expect_rows("policy values", &output.values, rows)?;
    expect_rows("policy actions", &output.actions, rows)?;
    expect_rows("policy log_probs", &output.log_probs, rows)?;
    expect_rows("policy rnn_actor", &output.rnn_actor, rows)?;
    expect_rows("policy rnn_critic", &output.rnn_critic, rows)?;

    Ok(CollectedStep {
        values: split_agents(output.values, e)?,
        actions: split_agents(output.actions, e)?,
        log_probs: split_agents(output.log_probs, e)?,
        rnn_actor: split_agents(output.rnn_actor, e)?,
        rnn_critic: split_agents(output.rnn_critic, e)?,
    })
}

fn expect_rows(context: &'static str, array: &Array2<f32>, rows: usize) -> Result<(), ShapeMismatch> {
    if array.nrows() != rows {
        return Err(ShapeMismatch::new(
            context,
            vec![rows, array.ncols()],
            vec![array.nrows(), array.ncols()],
        ));
    }
    Ok(())
}
