//! Error taxonomy for the training harness.
//!
//! Three classes of failure exist: configuration errors (raised before any
//! simulation begins), shape errors (a collaborator violated the `(E, A)`
//! batch layout contract), and propagated collaborator failures. None are
//! retried; all surface to the caller of [`crate::runner::TrainingRunner::run`].

use std::fmt;

use crate::algorithm::Algorithm;
use crate::checkpoint::CheckpointError;
use crate::env::EnvError;

/// Fatal configuration error, raised at initialization.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The algorithm identifier does not name a known algorithm.
    UnknownAlgorithm(String),
    /// The algorithm is known but no factory was registered for it.
    UnregisteredAlgorithm(Algorithm),
    /// Environment agent count does not match the configured agent count.
    AgentArityMismatch { expected: usize, actual: usize },
    /// Evaluation is enabled but no evaluation environment pool was provided.
    MissingEvalEnvs,
    /// A configuration field holds an unusable value.
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownAlgorithm(name) => {
                write!(f, "unknown algorithm identifier: {:?}", name)
            }
            ConfigError::UnregisteredAlgorithm(algo) => {
                write!(f, "no factory registered for algorithm {:?}", algo)
            }
            ConfigError::AgentArityMismatch { expected, actual } => write!(
                f,
                "environment exposes {} agents but config expects {}",
                actual, expected
            ),
            ConfigError::MissingEvalEnvs => {
                write!(f, "evaluation enabled but no evaluation environments provided")
            }
            ConfigError::InvalidValue { field, message } => {
                write!(f, "invalid config value for {}: {}", field, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// A collaborator returned or was handed an array with the wrong shape.
///
/// Indicates a contract violation in the `(E, A)` batch layout, not a
/// recoverable condition.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeMismatch {
    /// The array being checked (e.g. "policy values", "transition obs").
    pub context: &'static str,
    pub expected: Vec<usize>,
    pub actual: Vec<usize>,
}

impl ShapeMismatch {
    pub fn new(context: &'static str, expected: Vec<usize>, actual: Vec<usize>) -> Self {
        Self {
            context,
            expected,
            actual,
        }
    }
}

impl fmt::Display for ShapeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "shape mismatch in {}: expected {:?}, got {:?}",
            self.context, self.expected, self.actual
        )
    }
}

impl std::error::Error for ShapeMismatch {}

/// Top-level harness error.
#[derive(Debug)]
pub enum HarnessError {
    /// Fatal configuration error.
    Config(ConfigError),
    /// Batch layout contract violation.
    Shape(ShapeMismatch),
    /// Propagated environment failure.
    Env(EnvError),
    /// Checkpoint store failure.
    Checkpoint(CheckpointError),
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarnessError::Config(e) => write!(f, "configuration error: {}", e),
            HarnessError::Shape(e) => write!(f, "{}", e),
            HarnessError::Env(e) => write!(f, "environment error: {}", e),
            HarnessError::Checkpoint(e) => write!(f, "checkpoint error: {}", e),
        }
    }
}

impl std::error::Error for HarnessError {}

impl From<ConfigError> for HarnessError {
    fn from(e: ConfigError) -> Self {
        HarnessError::Config(e)
    }
}

impl From<ShapeMismatch> for HarnessError {
    fn from(e: ShapeMismatch) -> Self {
        HarnessError::Shape(e)
    }
}

impl From<EnvError> for HarnessError {
    fn from(e: EnvError) -> Self {
        HarnessError::Env(e)
    }
}

impl From<CheckpointError> for HarnessError {
    fn from(e: CheckpointError) -> Self {
        HarnessError::Checkpoint(e)
    }
}
