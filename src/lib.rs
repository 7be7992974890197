//! # On-Policy Multi-Agent Training Harness
//!
//! Orchestration layer for recurrent on-policy multi-agent RL: vectorized
//! rollout collection into a shared buffer, recurrent-state bookkeeping at
//! episode boundaries, fixed-budget update cycles, and periodic
//! checkpointing, logging, and deterministic evaluation.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       TrainingRunner                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  warmup → ┌ collect_step ─ env.step ─ insert ┐ × horizon     │
//! │           └──────────────────────────────────┘               │
//! │                        ▼                                     │
//! │              compute_returns / update                        │
//! │                        ▼                                     │
//! │           checkpoint · log · evaluate (periodic)             │
//! │                        ▼                                     │
//! │              advance_horizon → next cycle                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every batched array follows the `(step, env, agent, feature)` layout;
//! policy queries flatten `(env, agent)` to a single batch axis in
//! environment-major, agent-minor order. The network library, the loss
//! computation, and the simulated domain all live behind the
//! [`RolloutPolicy`], [`Trainer`], and [`MultiAgentVecEnv`] trait seams.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use onpolicy_marl::{TrainingConfig, TrainingRunner, FileCheckpointStore, ConsoleSink};
//!
//! let config = TrainingConfig::new()
//!     .with_horizon(128)
//!     .with_num_envs(8)
//!     .with_num_agents(2)
//!     .with_total_env_steps(1_000_000);
//!
//! let mut runner = TrainingRunner::new(
//!     config,
//!     envs,
//!     None,
//!     policy,
//!     trainer,
//!     FileCheckpointStore::new("checkpoints")?,
//!     ConsoleSink::new(),
//! )?;
//! let summary = runner.run()?;
//! ```

pub mod algorithm;
pub mod buffer;
pub mod checkpoint;
pub mod collector;
pub mod config;
pub mod env;
pub mod error;
pub mod eval;
pub mod metrics;
pub mod policy;
pub mod runner;

// Re-export commonly used types
pub use algorithm::{Algorithm, AlgorithmRegistry};
pub use buffer::{FeatureDims, RolloutBuffer, Transition};
pub use checkpoint::{CheckpointError, CheckpointInfo, CheckpointStore, FileCheckpointStore};
pub use collector::{collect_step, merge_agents, reset_where, split_agents, CollectedStep};
pub use config::TrainingConfig;
pub use env::{DoneFlags, EnvError, EnvStepOutcome, InfoBatch, MultiAgentVecEnv};
pub use error::{ConfigError, HarnessError, ShapeMismatch};
pub use eval::{run_evaluation, EvalReport, RewardAggregation};
pub use metrics::{ConsoleSink, CsvSink, MetricsSink, MultiSink, TrainMetrics};
pub use policy::{PolicySnapshot, PolicyStep, RolloutPolicy, Trainer};
pub use runner::{RunSummary, TrainingRunner};
