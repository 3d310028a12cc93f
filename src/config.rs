//! Configuration management

use serde::{Deserialize, Serialize};

use crate::error::{OptimizerError, Result};
use crate::optimizer::SwarmCoefficients;

/// Environment variable prefix, e.g. `QSWARM_OPTIMIZER__PARTICLES=50`
pub const ENV_PREFIX: &str = "QSWARM";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load from a TOML file (optional) with environment overrides
    pub fn load(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = shellexpand::tilde(path).into_owned();
        let settings = config::Config::builder()
            .add_source(config::File::new(&path, config::FileFormat::Toml).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.optimizer.validate()?;
        Ok(config)
    }
}

/// What to do when a particle's perturbed position clamps to all zeros
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Keep the particle's previous position for this iteration
    #[default]
    Retain,
    /// Fail the run with a degenerate-state error
    Abort,
}

/// Swarm search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Number of particles
    #[serde(default = "default_particles")]
    pub particles: usize,
    /// Iteration cap
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Stop when the global best moves less than this between iterations.
    /// A non-finite value disables early stopping.
    #[serde(default = "default_convergence_threshold")]
    pub convergence_threshold: f64,
    /// Fixed seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
    /// Run particle phases on the rayon pool
    #[serde(default = "default_true")]
    pub parallel: bool,
    #[serde(default)]
    pub degenerate_policy: DegeneratePolicy,
    #[serde(default)]
    pub coefficients: SwarmCoefficients,
}

fn default_particles() -> usize {
    100
}

fn default_iterations() -> usize {
    1000
}

fn default_convergence_threshold() -> f64 {
    1e-6
}

fn default_true() -> bool {
    true
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            particles: default_particles(),
            iterations: default_iterations(),
            convergence_threshold: default_convergence_threshold(),
            seed: None,
            parallel: true,
            degenerate_policy: DegeneratePolicy::default(),
            coefficients: SwarmCoefficients::default(),
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> std::result::Result<(), OptimizerError> {
        if self.particles < 1 {
            return Err(OptimizerError::InvalidConfig(
                "particle count must be at least 1".to_string(),
            ));
        }
        if self.iterations < 1 {
            return Err(OptimizerError::InvalidConfig(
                "iteration cap must be at least 1".to_string(),
            ));
        }
        if self.convergence_threshold.is_nan() || self.convergence_threshold < 0.0 {
            return Err(OptimizerError::InvalidConfig(format!(
                "convergence threshold must be non-negative, got {}",
                self.convergence_threshold
            )));
        }
        let c = &self.coefficients;
        if !(c.inertia.is_finite() && c.cognitive.is_finite() && c.social.is_finite()) {
            return Err(OptimizerError::InvalidConfig(
                "swarm coefficients must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
