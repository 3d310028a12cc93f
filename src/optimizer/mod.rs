//! # Quantum-Perturbed Swarm Optimizer
//!
//! Particle swarm search over long-only allocations. Every particle dimension
//! carries an amplitude/phase pair that random-walks each iteration and adds
//! `|amplitude| · cos(phase)` to the position update.
//!
//! Each iteration runs in two phases over an immutable snapshot of the global best:
//! 1. evolve quantum states and move particles
//! 2. score every particle
//!
//! Personal and global bests are then folded sequentially in particle order, so
//! parallel and sequential runs agree for the same seed.
//!
//! ```rust,ignore
//! use quantum_swarm::{OptimizerConfig, QuantumSwarmOptimizer};
//!
//! let optimizer = QuantumSwarmOptimizer::new(OptimizerConfig::default())?;
//! let result = optimizer.optimize(&context)?;
//! ```

pub mod fitness;
pub mod particle;
pub mod quantum;
pub mod result;

#[cfg(test)]
mod tests;

pub use fitness::{Evaluation, FitnessEvaluator, RISK_FREE_RATE};
pub use particle::{normalize_allocation, random_allocation, ParticleState, SwarmCoefficients};
pub use quantum::{Amplitude, QuantumGrid, QuantumState};
pub use result::{max_drawdown, portfolio_returns, ResultBuilder, SearchOutcome};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use uuid::Uuid;

use crate::config::{DegeneratePolicy, OptimizerConfig};
use crate::error::OptimizerError;
use crate::types::{OptimizationContext, OptimizationResult};

/// Best allocation seen by any particle
#[derive(Debug, Clone, PartialEq)]
struct GlobalBest {
    position: Vec<f64>,
    fitness: f64,
}

/// Per-run search state
struct Swarm {
    particles: Vec<ParticleState>,
    grid: QuantumGrid,
    best: Option<GlobalBest>,
}

impl Swarm {
    fn initialize<R: Rng + ?Sized>(
        particles: usize,
        dimensions: usize,
        rng: &mut R,
    ) -> Result<Self, OptimizerError> {
        let grid = QuantumGrid::random(particles, dimensions, rng);
        let particles = (0..particles)
            .map(|_| ParticleState::random(dimensions, &mut *rng))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            particles,
            grid,
            best: None,
        })
    }

    fn best_fitness(&self) -> f64 {
        self.best.as_ref().map(|b| b.fitness).unwrap_or(f64::NEG_INFINITY)
    }

    /// Fold this iteration's scores into personal and global bests
    fn absorb(&mut self, scores: &[f64]) {
        for (particle, &fitness) in self.particles.iter_mut().zip(scores) {
            let global = self.best.as_ref().map(|b| b.fitness).unwrap_or(f64::NEG_INFINITY);
            if particle.record(fitness) && fitness > global {
                self.best = Some(GlobalBest {
                    position: particle.position.clone(),
                    fitness,
                });
            }
        }
    }
}

/// Swarm optimizer. Holds configuration only; every call starts from fresh state.
#[derive(Debug, Clone)]
pub struct QuantumSwarmOptimizer {
    config: OptimizerConfig,
}

impl QuantumSwarmOptimizer {
    pub fn new(config: OptimizerConfig) -> Result<Self, OptimizerError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Optimize with the configured seed, or OS entropy when none is set
    pub fn optimize(
        &self,
        context: &OptimizationContext,
    ) -> Result<OptimizationResult, OptimizerError> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.optimize_with_rng(context, &mut rng)
    }

    /// Optimize drawing all randomness from `rng`
    pub fn optimize_with_rng<R: Rng + ?Sized>(
        &self,
        context: &OptimizationContext,
        rng: &mut R,
    ) -> Result<OptimizationResult, OptimizerError> {
        context.validate()?;

        let run_id = Uuid::new_v4();
        let dimensions = context.dimensions();
        let span = tracing::info_span!(
            "optimize",
            %run_id,
            assets = dimensions,
            particles = self.config.particles
        );
        let _guard = span.enter();

        tracing::info!(
            regime = ?context.market_regime,
            periods = context.historical_data.periods(),
            iterations = self.config.iterations,
            "Starting swarm optimization"
        );

        let evaluator = FitnessEvaluator::new(context);
        let mut swarm = Swarm::initialize(self.config.particles, dimensions, rng)?;

        let threshold = self.config.convergence_threshold;
        let mut previous_best = f64::NEG_INFINITY;
        let mut history = Vec::new();
        let mut converged = false;

        for iteration in 1..=self.config.iterations {
            let seeds: Vec<u64> = (0..self.config.particles).map(|_| rng.random()).collect();
            let retained = self.move_particles(&mut swarm, &seeds)?;
            if retained > 0 {
                tracing::warn!(
                    iteration,
                    retained,
                    "Perturbed allocations collapsed to zero, kept previous positions"
                );
            }

            let scores = self.score_particles(&swarm.particles, &evaluator)?;
            swarm.absorb(&scores);

            let best = swarm.best_fitness();
            history.push(best);
            tracing::debug!(iteration, best_fitness = best, "Swarm iteration complete");

            if threshold.is_finite() && (best - previous_best).abs() < threshold {
                tracing::info!("Converged after {} iterations (fitness {:.6})", iteration, best);
                converged = true;
                break;
            }
            previous_best = best;
        }

        if !converged {
            tracing::info!(
                "Iteration cap of {} reached (fitness {:.6})",
                self.config.iterations,
                swarm.best_fitness()
            );
        }

        let best = swarm.best.take().ok_or_else(|| {
            OptimizerError::DegenerateState("no particle was evaluated".to_string())
        })?;

        let outcome = SearchOutcome {
            run_id,
            best_position: best.position,
            best_fitness: best.fitness,
            grid: swarm.grid,
            iterations: history.len(),
            converged,
            fitness_history: history,
        };
        ResultBuilder::new(context, &evaluator).build(outcome)
    }

    /// Evolve quantum states and move every particle against the current global best.
    /// Returns how many particles kept their previous position.
    fn move_particles(&self, swarm: &mut Swarm, seeds: &[u64]) -> Result<usize, OptimizerError> {
        let snapshot = swarm.best.as_ref().map(|b| b.position.as_slice());
        let coefficients = self.config.coefficients;
        let policy = self.config.degenerate_policy;

        let step = |particle: &mut ParticleState, quantum: &mut Vec<QuantumState>, seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            for state in quantum.iter_mut() {
                state.evolve(&mut rng);
            }
            match particle.advance(quantum.as_slice(), snapshot, &coefficients, &mut rng) {
                Ok(()) => Ok(false),
                Err(OptimizerError::DegenerateState(_)) if policy == DegeneratePolicy::Retain => {
                    Ok(true)
                }
                Err(e) => Err(e),
            }
        };

        let outcomes: Vec<Result<bool, OptimizerError>> = if self.config.parallel {
            swarm
                .particles
                .par_iter_mut()
                .zip(swarm.grid.rows.par_iter_mut())
                .zip(seeds.par_iter())
                .map(|((particle, quantum), &seed)| step(particle, quantum, seed))
                .collect()
        } else {
            swarm
                .particles
                .iter_mut()
                .zip(swarm.grid.rows.iter_mut())
                .zip(seeds)
                .map(|((particle, quantum), &seed)| step(particle, quantum, seed))
                .collect()
        };

        let mut retained = 0;
        for outcome in outcomes {
            if outcome? {
                retained += 1;
            }
        }
        Ok(retained)
    }

    fn score_particles(
        &self,
        particles: &[ParticleState],
        evaluator: &FitnessEvaluator<'_>,
    ) -> Result<Vec<f64>, OptimizerError> {
        let scores: Vec<Result<f64, OptimizerError>> = if self.config.parallel {
            particles
                .par_iter()
                .map(|p| evaluator.fitness(&p.position))
                .collect()
        } else {
            particles.iter().map(|p| evaluator.fitness(&p.position)).collect()
        };
        scores.into_iter().collect()
    }
}
