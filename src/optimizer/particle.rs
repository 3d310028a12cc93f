//! Swarm particles and allocation normalization

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::quantum::QuantumState;
use crate::error::OptimizerError;

/// Velocity update weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwarmCoefficients {
    #[serde(default = "default_inertia")]
    pub inertia: f64,
    #[serde(default = "default_cognitive")]
    pub cognitive: f64,
    #[serde(default = "default_social")]
    pub social: f64,
}

impl Default for SwarmCoefficients {
    fn default() -> Self {
        Self {
            inertia: default_inertia(),
            cognitive: default_cognitive(),
            social: default_social(),
        }
    }
}

fn default_inertia() -> f64 {
    0.7
}

fn default_cognitive() -> f64 {
    1.5
}

fn default_social() -> f64 {
    1.5
}

/// Scale a non-negative vector so it sums to 1
pub fn normalize_allocation(weights: &[f64]) -> Result<Vec<f64>, OptimizerError> {
    let sum: f64 = weights.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return Err(OptimizerError::DegenerateState(format!(
            "allocation of {} weights sums to {}, cannot normalize",
            weights.len(),
            sum
        )));
    }
    Ok(weights.iter().map(|w| w / sum).collect())
}

/// Uniform random weights, L1-normalized. Per-asset bounds are not applied.
pub fn random_allocation<R: Rng + ?Sized>(
    dimensions: usize,
    rng: &mut R,
) -> Result<Vec<f64>, OptimizerError> {
    let raw: Vec<f64> = (0..dimensions).map(|_| rng.random::<f64>()).collect();
    normalize_allocation(&raw)
}

/// One candidate allocation with its momentum and best-known history
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleState {
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
    pub best_position: Vec<f64>,
    pub best_fitness: f64,
}

impl ParticleState {
    pub fn new(position: Vec<f64>) -> Self {
        Self {
            velocity: vec![0.0; position.len()],
            best_position: position.clone(),
            position,
            best_fitness: f64::NEG_INFINITY,
        }
    }

    pub fn random<R: Rng + ?Sized>(dimensions: usize, rng: &mut R) -> Result<Self, OptimizerError> {
        Ok(Self::new(random_allocation(dimensions, rng)?))
    }

    /// Move the particle one step
    ///
    /// Without a global best the social pull is zero. The particle is left untouched
    /// when the perturbed position clamps to all zeros.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        quantum: &[QuantumState],
        global_best: Option<&[f64]>,
        coefficients: &SwarmCoefficients,
        rng: &mut R,
    ) -> Result<(), OptimizerError> {
        let dimensions = self.position.len();
        let mut velocity = Vec::with_capacity(dimensions);
        let mut raw = Vec::with_capacity(dimensions);

        for j in 0..dimensions {
            let x = self.position[j];
            let r1 = rng.random::<f64>();
            let r2 = rng.random::<f64>();

            let cognitive = coefficients.cognitive * r1 * (self.best_position[j] - x);
            let social = match global_best {
                Some(best) => coefficients.social * r2 * (best[j] - x),
                None => 0.0,
            };
            let v = coefficients.inertia * self.velocity[j] + cognitive + social;

            velocity.push(v);
            raw.push((x + v + quantum[j].influence()).clamp(0.0, 1.0));
        }

        let position = normalize_allocation(&raw)?;
        self.velocity = velocity;
        self.position = position;
        Ok(())
    }

    /// Record a fitness for the current position; true when it beats the personal best
    pub fn record(&mut self, fitness: f64) -> bool {
        if fitness > self.best_fitness {
            self.best_fitness = fitness;
            self.best_position.clone_from(&self.position);
            true
        } else {
            false
        }
    }
}
