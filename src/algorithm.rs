//! Algorithm identifiers and the factory registry that maps them to
//! concrete policy/trainer pairs.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::config::TrainingConfig;
use crate::error::ConfigError;

// ============================================================================
// Algorithm
// ============================================================================

/// Supported on-policy algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Ppo,
}

impl Algorithm {
    /// Parse an identifier as it appears in [`TrainingConfig::algorithm`].
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name {
            "ppo" => Ok(Algorithm::Ppo),
            other => Err(ConfigError::UnknownAlgorithm(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Ppo => "ppo",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::parse(s)
    }
}

// ============================================================================
// AlgorithmRegistry
// ============================================================================

type Factory<P, T> = Box<dyn Fn(&TrainingConfig) -> (P, T)>;

/// Maps an [`Algorithm`] to a factory building its policy and trainer.
///
/// Callers register one factory per algorithm they support, then
/// [`build`](AlgorithmRegistry::build) resolves whatever name the
/// configuration carries.
pub struct AlgorithmRegistry<P, T> {
    factories: HashMap<Algorithm, Factory<P, T>>,
}

impl<P, T> AlgorithmRegistry<P, T> {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, algorithm: Algorithm, factory: F)
    where
        F: Fn(&TrainingConfig) -> (P, T) + 'static,
    {
        self.factories.insert(algorithm, Box::new(factory));
    }

    /// Resolve the configured algorithm name and run its factory.
    pub fn build(&self, config: &TrainingConfig) -> Result<(P, T), ConfigError> {
        let algorithm = Algorithm::parse(&config.algorithm)?;
        let factory = self
            .factories
            .get(&algorithm)
            .ok_or(ConfigError::UnregisteredAlgorithm(algorithm))?;
        Ok(factory(config))
    }
}

impl<P, T> Default for AlgorithmRegistry<P, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_and_unknown() {
        assert_eq!(Algorithm::parse("ppo").unwrap(), Algorithm::Ppo);
        assert!(matches!(
            Algorithm::parse("sac"),
            Err(ConfigError::UnknownAlgorithm(name)) if name == "sac"
        ));
        assert_eq!("ppo".parse::<Algorithm>().unwrap(), Algorithm::Ppo);
    }

    #[test]
    fn test_registry_builds_registered_algorithm() {
        let mut registry: AlgorithmRegistry<String, usize> = AlgorithmRegistry::new();
        registry.register(Algorithm::Ppo, |config| {
            (config.algorithm.clone(), config.horizon)
        });

        let config = TrainingConfig::new().with_horizon(7);
        let (policy, trainer) = registry.build(&config).unwrap();
        assert_eq!(policy, "ppo");
        assert_eq!(trainer, 7);
    }

    #[test]
    fn test_registry_rejects_unregistered_algorithm() {
        let registry: AlgorithmRegistry<(), ()> = AlgorithmRegistry::new();
        let config = TrainingConfig::new();
        assert!(matches!(
            registry.build(&config),
            Err(ConfigError::UnregisteredAlgorithm(Algorithm::Ppo))
        ));
    }
}
